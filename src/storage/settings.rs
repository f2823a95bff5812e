// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Persisted keyword and address settings.
//!
//! The file is re-read whenever the keywords are needed, so a change written
//! by `airunlock set-keywords` takes effect on the next write request.

use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::commands::{CommandKeywords, KeywordSource};

const SETTINGS_FILE: &str = "settings.json";
const SETTINGS_VERSION: u32 = 1;

fn default_version() -> u32 {
    SETTINGS_VERSION
}

/// Settings file format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SettingsFile {
    /// File format version. Hand-written files may leave it out.
    #[serde(default = "default_version")]
    version: u32,
    #[serde(flatten)]
    keywords: CommandKeywords,
    /// Last address advertised, for the provisioning payload.
    #[serde(rename = "ADDRESS", default, skip_serializing_if = "Option::is_none")]
    address: Option<String>,
}

impl Default for SettingsFile {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            keywords: CommandKeywords::default(),
            address: None,
        }
    }
}

/// Store for the persisted settings.
pub struct SettingsStore {
    file_path: PathBuf,
    current: RwLock<SettingsFile>,
}

impl SettingsStore {
    /// Open the store in `dir`, creating the directory if needed.
    ///
    /// An unreadable settings file is not fatal: the store starts from the
    /// defaults and keeps retrying the file on every keyword lookup.
    pub fn new(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create settings directory {:?}", dir))?;

        let file_path = dir.join(SETTINGS_FILE);
        let settings = match Self::load(&file_path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Using default settings: {:#}", e);
                SettingsFile::default()
            }
        };
        if settings.keywords.lock_word == settings.keywords.unlock_word {
            warn!("Lock and unlock keywords are identical; the keyword will toggle the lock");
        }
        info!("Loaded settings from {:?}", file_path);

        Ok(Self {
            file_path,
            current: RwLock::new(settings),
        })
    }

    /// Keywords as currently on disk, or the last good copy if the file
    /// cannot be read.
    pub fn reload_keywords(&self) -> CommandKeywords {
        match Self::load(&self.file_path) {
            Ok(settings) => {
                let keywords = settings.keywords.clone();
                *self.current.write() = settings;
                keywords
            }
            Err(e) => {
                warn!("Keeping previous keywords: {:#}", e);
                self.current.read().keywords.clone()
            }
        }
    }

    pub fn address(&self) -> Option<String> {
        self.current.read().address.clone()
    }

    /// Persist a validated keyword pair.
    pub fn set_keywords(&self, keywords: CommandKeywords) -> Result<()> {
        keywords.validate()?;
        let mut current = self.current.write();
        current.keywords = keywords;
        Self::save(&self.file_path, &current)?;
        info!("Saved new command keywords");
        Ok(())
    }

    /// Remember the advertised address. No write if it is unchanged.
    pub fn set_address(&self, address: &str) -> Result<()> {
        let mut current = self.current.write();
        if current.address.as_deref() == Some(address) {
            return Ok(());
        }
        current.address = Some(address.to_string());
        Self::save(&self.file_path, &current)?;
        debug!("Saved adapter address {}", address);
        Ok(())
    }

    fn load(path: &Path) -> Result<SettingsFile> {
        if !path.exists() {
            debug!("Settings file doesn't exist, using defaults");
            return Ok(SettingsFile::default());
        }

        let content =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;

        serde_json::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))
    }

    fn save(path: &Path, settings: &SettingsFile) -> Result<()> {
        let content = serde_json::to_string_pretty(settings)?;
        std::fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))
    }
}

impl KeywordSource for SettingsStore {
    fn keywords(&self) -> CommandKeywords {
        self.reload_keywords()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let store = SettingsStore::new(temp_dir.path())?;
        assert_eq!(store.keywords(), CommandKeywords::new("lock", "unlock"));
        assert_eq!(store.address(), None);
        Ok(())
    }

    #[test]
    fn test_set_keywords_persists() -> Result<()> {
        let temp_dir = TempDir::new()?;
        {
            let store = SettingsStore::new(temp_dir.path())?;
            store.set_keywords(CommandKeywords::new("lock!", "unlock!"))?;
        }

        let store = SettingsStore::new(temp_dir.path())?;
        assert_eq!(store.keywords(), CommandKeywords::new("lock!", "unlock!"));
        Ok(())
    }

    #[test]
    fn test_set_keywords_rejects_identical() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let store = SettingsStore::new(temp_dir.path())?;
        assert!(store.set_keywords(CommandKeywords::new("x", "x")).is_err());
        assert_eq!(store.keywords(), CommandKeywords::default());
        Ok(())
    }

    #[test]
    fn test_file_uses_setting_names() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let store = SettingsStore::new(temp_dir.path())?;
        store.set_address("AA-BB-CC-DD-EE-FF")?;

        let content = std::fs::read_to_string(temp_dir.path().join(SETTINGS_FILE))?;
        let value: serde_json::Value = serde_json::from_str(&content)?;
        assert_eq!(value["LOCK"], "lock");
        assert_eq!(value["UNLOCK"], "unlock");
        assert_eq!(value["ADDRESS"], "AA-BB-CC-DD-EE-FF");
        assert_eq!(value["version"], SETTINGS_VERSION);
        Ok(())
    }

    #[test]
    fn test_external_edit_is_picked_up() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let store = SettingsStore::new(temp_dir.path())?;

        std::fs::write(
            temp_dir.path().join(SETTINGS_FILE),
            r#"{"version":1,"LOCK":"bye","UNLOCK":"hello"}"#,
        )?;
        assert_eq!(store.keywords(), CommandKeywords::new("bye", "hello"));
        Ok(())
    }

    #[test]
    fn test_corrupt_file_keeps_last_good() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let store = SettingsStore::new(temp_dir.path())?;
        store.set_keywords(CommandKeywords::new("a", "b"))?;

        std::fs::write(temp_dir.path().join(SETTINGS_FILE), "{not json")?;
        assert_eq!(store.keywords(), CommandKeywords::new("a", "b"));
        Ok(())
    }

    #[test]
    fn test_missing_keys_fall_back_to_defaults() -> Result<()> {
        let temp_dir = TempDir::new()?;
        std::fs::write(
            temp_dir.path().join(SETTINGS_FILE),
            r#"{"version":1,"LOCK":"sleep"}"#,
        )?;
        let store = SettingsStore::new(temp_dir.path())?;
        assert_eq!(store.keywords(), CommandKeywords::new("sleep", "unlock"));
        Ok(())
    }

    #[test]
    fn test_file_without_version() -> Result<()> {
        let temp_dir = TempDir::new()?;
        std::fs::write(
            temp_dir.path().join(SETTINGS_FILE),
            r#"{"LOCK":"a","UNLOCK":"b"}"#,
        )?;
        let store = SettingsStore::new(temp_dir.path())?;
        assert_eq!(store.keywords(), CommandKeywords::new("a", "b"));
        Ok(())
    }

    #[test]
    fn test_corrupt_file_at_startup_uses_defaults() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "{not json")?;

        let store = SettingsStore::new(temp_dir.path())?;
        assert_eq!(store.keywords(), CommandKeywords::default());
        assert_eq!(store.address(), None);

        // Once fixed, the file is picked up again.
        std::fs::write(&path, r#"{"version":1,"LOCK":"x","UNLOCK":"y"}"#)?;
        assert_eq!(store.keywords(), CommandKeywords::new("x", "y"));
        Ok(())
    }
}
