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

//! Shared application state for the tray.

use chrono::{DateTime, Local};
use parking_lot::RwLock;
use tokio::sync::watch;

use crate::commands::DispatchOutcome;

/// What the BLE peripheral is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PeripheralStatus {
    /// Adapter off or not yet started.
    #[default]
    PoweredOff,
    Advertising,
    Error,
}

impl PeripheralStatus {
    pub fn describe(self) -> &'static str {
        match self {
            PeripheralStatus::PoweredOff => "Bluetooth is off",
            PeripheralStatus::Advertising => "Advertising",
            PeripheralStatus::Error => "Bluetooth error",
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    status: PeripheralStatus,
    pairing_payload: Option<String>,
    last_command: Option<(DispatchOutcome, DateTime<Local>)>,
}

/// Application state.
///
/// Every change is announced to [`AppState::subscribe`] receivers.
#[derive(Debug)]
pub struct AppState {
    inner: RwLock<Inner>,
    changes: watch::Sender<()>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            changes: watch::Sender::new(()),
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> watch::Receiver<()> {
        self.changes.subscribe()
    }

    fn notify(&self) {
        self.changes.send_replace(());
    }

    pub fn get_status(&self) -> PeripheralStatus {
        self.inner.read().status
    }

    pub fn set_status(&self, status: PeripheralStatus) {
        {
            let mut inner = self.inner.write();
            if inner.status == status {
                return;
            }
            inner.status = status;
        }
        self.notify();
    }

    pub fn get_pairing_payload(&self) -> Option<String> {
        self.inner.read().pairing_payload.clone()
    }

    pub fn set_pairing_payload(&self, payload: String) {
        self.inner.write().pairing_payload = Some(payload);
        self.notify();
    }

    /// Last action that actually ran, with its time.
    pub fn get_last_command(&self) -> Option<(DispatchOutcome, DateTime<Local>)> {
        self.inner.read().last_command
    }

    pub fn record_command(&self, outcome: DispatchOutcome) {
        if matches!(outcome, DispatchOutcome::Ignored(_)) {
            return;
        }
        self.inner.write().last_command = Some((outcome, Local::now()));
        self.notify();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::IgnoreReason;

    #[test]
    fn test_ignored_commands_are_not_recorded() {
        let state = AppState::new();
        state.record_command(DispatchOutcome::Ignored(IgnoreReason::Unrecognized));
        assert!(state.get_last_command().is_none());

        state.record_command(DispatchOutcome::Locked);
        assert_eq!(
            state.get_last_command().map(|(o, _)| o),
            Some(DispatchOutcome::Locked)
        );
    }

    #[test]
    fn test_status_defaults_to_powered_off() {
        let state = AppState::new();
        assert_eq!(state.get_status(), PeripheralStatus::PoweredOff);
        state.set_status(PeripheralStatus::Advertising);
        assert_eq!(state.get_status().describe(), "Advertising");
    }

    #[tokio::test]
    async fn test_changes_are_announced() {
        let state = AppState::new();
        let mut changes = state.subscribe();

        state.set_status(PeripheralStatus::Advertising);
        assert!(changes.has_changed().unwrap());
        changes.changed().await.unwrap();

        // Same status again is not a change.
        state.set_status(PeripheralStatus::Advertising);
        assert!(!changes.has_changed().unwrap());

        state.record_command(DispatchOutcome::Unlocked);
        assert!(changes.has_changed().unwrap());
    }
}
