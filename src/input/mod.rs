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

//! Synthetic keyboard input for submitting the credential.

mod keys;

pub use keys::Key;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::Arc;
use tracing::{info, warn};

/// Types into whatever control currently has keyboard focus.
pub trait InputInjector: Send + Sync {
    fn type_text(&self, text: &str) -> Result<()>;

    fn press_key(&self, key: Key) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// Which injector to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputBackend {
    /// enigo on X11, ydotool on Wayland.
    #[default]
    Auto,
    Enigo,
    Ydotool,
}

/// Build the injector for the configured backend.
pub fn create_injector(backend: InputBackend) -> Result<Arc<dyn InputInjector>> {
    let resolved = match backend {
        InputBackend::Auto => {
            if is_wayland_session() || !cfg!(feature = "x11") {
                InputBackend::Ydotool
            } else {
                InputBackend::Enigo
            }
        }
        other => other,
    };

    let injector: Arc<dyn InputInjector> = match resolved {
        InputBackend::Enigo => enigo_injector()?,
        _ => Arc::new(YdotoolInjector::new()),
    };
    info!("Using {} input backend", injector.name());
    Ok(injector)
}

fn is_wayland_session() -> bool {
    std::env::var("XDG_SESSION_TYPE")
        .map(|t| t.eq_ignore_ascii_case("wayland"))
        .unwrap_or(false)
        || std::env::var_os("WAYLAND_DISPLAY").is_some()
}

#[cfg(feature = "x11")]
fn enigo_injector() -> Result<Arc<dyn InputInjector>> {
    Ok(Arc::new(EnigoInjector))
}

#[cfg(not(feature = "x11"))]
fn enigo_injector() -> Result<Arc<dyn InputInjector>> {
    Err(anyhow!("built without the x11 feature"))
}

/// X11 injection through enigo.
///
/// A fresh connection is opened per call; the lock screen may belong to a
/// different X client than the one seen at startup.
#[cfg(feature = "x11")]
pub struct EnigoInjector;

#[cfg(feature = "x11")]
impl EnigoInjector {
    fn connect() -> Result<enigo::Enigo> {
        enigo::Enigo::new(&enigo::Settings::default())
            .map_err(|e| anyhow!("Failed to connect enigo: {:?}", e))
    }
}

#[cfg(feature = "x11")]
impl InputInjector for EnigoInjector {
    fn type_text(&self, text: &str) -> Result<()> {
        use enigo::Keyboard;
        Self::connect()?
            .text(text)
            .map_err(|e| anyhow!("enigo text failed: {:?}", e))
    }

    fn press_key(&self, key: Key) -> Result<()> {
        use enigo::Keyboard;
        Self::connect()?
            .key(key.to_enigo(), enigo::Direction::Click)
            .map_err(|e| anyhow!("enigo key failed: {:?}", e))
    }

    fn name(&self) -> &'static str {
        "enigo"
    }
}

/// Injection through the `ydotool` client (requires `ydotoold`).
pub struct YdotoolInjector {
    program: String,
}

impl YdotoolInjector {
    pub fn new() -> Self {
        Self {
            program: "ydotool".to_string(),
        }
    }
}

impl Default for YdotoolInjector {
    fn default() -> Self {
        Self::new()
    }
}

impl InputInjector for YdotoolInjector {
    fn type_text(&self, text: &str) -> Result<()> {
        // Text goes through stdin so it never shows up in the process list.
        let mut child = Command::new(&self.program)
            .args(["type", "--file", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to spawn {}", self.program))?;

        child
            .stdin
            .take()
            .context("ydotool stdin unavailable")?
            .write_all(text.as_bytes())?;

        let output = child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("ydotool type exited with {}", output.status);
            return Err(anyhow!("ydotool type failed: {}", stderr.trim()));
        }
        Ok(())
    }

    fn press_key(&self, key: Key) -> Result<()> {
        let status = Command::new(&self.program)
            .arg("key")
            .args(key.ydotool_click())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .with_context(|| format!("Failed to spawn {}", self.program))?;
        if !status.success() {
            return Err(anyhow!("ydotool key exited with {}", status));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ydotool"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_names_deserialize() {
        #[derive(Deserialize)]
        struct Wrapper {
            backend: InputBackend,
        }
        let w: Wrapper = toml::from_str("backend = \"ydotool\"").unwrap();
        assert_eq!(w.backend, InputBackend::Ydotool);
        let w: Wrapper = toml::from_str("backend = \"auto\"").unwrap();
        assert_eq!(w.backend, InputBackend::Auto);
    }

    #[test]
    fn test_explicit_ydotool_backend() {
        let injector = create_injector(InputBackend::Ydotool).unwrap();
        assert_eq!(injector.name(), "ydotool");
    }

    #[test]
    fn test_missing_ydotool_is_an_error() {
        let injector = YdotoolInjector {
            program: "/nonexistent/ydotool".to_string(),
        };
        assert!(injector.type_text("secret").is_err());
        assert!(injector.press_key(Key::Enter).is_err());
    }
}
