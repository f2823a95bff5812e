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

//! One-time questions for the user at startup.

use tracing::warn;

/// Startup prompts.
pub trait UserPrompt: Send + Sync {
    /// The secret store refused access; ask the user to grant it.
    fn secret_store_consent(&self);

    /// Bluetooth is off; returns whether the user wants it switched on.
    fn offer_bluetooth_power_on(&self) -> bool;
}

/// Prompts through the log, for a daemon without a dialog toolkit.
pub struct DesktopPrompt {
    auto_power_on: bool,
}

impl DesktopPrompt {
    pub fn new(auto_power_on: bool) -> Self {
        Self { auto_power_on }
    }
}

impl UserPrompt for DesktopPrompt {
    fn secret_store_consent(&self) {
        warn!(
            "AirUnlock needs permission to store your password in the system keyring. \
             Unlock the keyring and run `airunlock set-password`."
        );
    }

    fn offer_bluetooth_power_on(&self) -> bool {
        if self.auto_power_on {
            warn!("Bluetooth hardware is off, turning it on");
        } else {
            warn!(
                "Bluetooth hardware is off. AirUnlock will start advertising once \
                 Bluetooth is turned on."
            );
        }
        self.auto_power_on
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    pub struct CountingPrompt {
        consents: AtomicUsize,
    }

    impl CountingPrompt {
        pub fn consent_count(&self) -> usize {
            self.consents.load(Ordering::SeqCst)
        }
    }

    impl UserPrompt for CountingPrompt {
        fn secret_store_consent(&self) {
            self.consents.fetch_add(1, Ordering::SeqCst);
        }

        fn offer_bluetooth_power_on(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_desktop_prompt_follows_config() {
        assert!(DesktopPrompt::new(true).offer_bluetooth_power_on());
        assert!(!DesktopPrompt::new(false).offer_bluetooth_power_on());
    }
}
