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

//! User configuration (`config.toml`).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::input::InputBackend;
use crate::session::Timings;

const APP_DIR: &str = "airunlock";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bluetooth: BluetoothConfig,
    pub timing: TimingConfig,
    pub input: InputConfig,
    pub tray: TrayConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BluetoothConfig {
    /// Turn the adapter on when it is found off at startup.
    pub auto_power_on: bool,
    /// Adapter to use, e.g. `hci0`. Defaults to BlueZ's default adapter.
    pub adapter: Option<String>,
}

impl Default for BluetoothConfig {
    fn default() -> Self {
        Self {
            auto_power_on: true,
            adapter: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub lock_settle_ms: u64,
    pub wake_delay_ms: u64,
    pub confirm_grace_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        let timings = Timings::default();
        Self {
            lock_settle_ms: timings.lock_settle.as_millis() as u64,
            wake_delay_ms: timings.wake_delay.as_millis() as u64,
            confirm_grace_ms: timings.confirm_grace.as_millis() as u64,
        }
    }
}

impl TimingConfig {
    pub fn timings(&self) -> Timings {
        Timings {
            lock_settle: Duration::from_millis(self.lock_settle_ms),
            wake_delay: Duration::from_millis(self.wake_delay_ms),
            confirm_grace: Duration::from_millis(self.confirm_grace_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub backend: InputBackend,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrayConfig {
    pub enabled: bool,
}

impl Default for TrayConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    /// `$XDG_CONFIG_HOME/airunlock`.
    pub fn default_dir() -> Result<PathBuf> {
        let base = dirs::config_dir().context("Failed to get config directory")?;
        Ok(base.join(APP_DIR))
    }

    /// Load `config.toml` from `dir`. A missing file means defaults.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(&path).with_context(|| format!("Failed to read {:?}", path))?;
        let config: Config =
            toml::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }
}
