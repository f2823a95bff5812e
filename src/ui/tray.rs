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

//! System tray implementation using ksni.

use anyhow::Result;
use ksni::{self, menu::StandardItem, Handle, MenuItem, Tray, TrayService};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::info;

use crate::commands::DispatchOutcome;
use crate::session::{LockState, LockStateReader};
use crate::state::{AppState, PeripheralStatus};

/// Actions that can be triggered from the tray menu.
#[derive(Debug, Clone)]
pub enum TrayAction {
    Quit,
}

/// System tray icon and menu.
pub struct AirUnlockTray {
    state: Arc<AppState>,
    lock_state: LockStateReader,
    action_tx: mpsc::UnboundedSender<TrayAction>,
}

impl AirUnlockTray {
    pub fn new(
        state: Arc<AppState>,
        lock_state: LockStateReader,
        action_tx: mpsc::UnboundedSender<TrayAction>,
    ) -> Self {
        Self {
            state,
            lock_state,
            action_tx,
        }
    }

    fn lock_label(&self) -> &'static str {
        match self.lock_state.state() {
            LockState::Locked => "Session locked",
            LockState::Unlocked => "Session unlocked",
        }
    }
}

impl Tray for AirUnlockTray {
    fn icon_name(&self) -> String {
        match (self.state.get_status(), self.lock_state.state()) {
            (PeripheralStatus::Advertising, LockState::Locked) => "changes-prevent-symbolic",
            (PeripheralStatus::Advertising, LockState::Unlocked) => "changes-allow-symbolic",
            (PeripheralStatus::PoweredOff, _) => "bluetooth-disabled-symbolic",
            (PeripheralStatus::Error, _) => "dialog-error-symbolic",
        }
        .to_string()
    }

    fn title(&self) -> String {
        "AirUnlock".to_string()
    }

    fn tool_tip(&self) -> ksni::ToolTip {
        let mut description = format!(
            "{} · {}",
            self.state.get_status().describe(),
            self.lock_label()
        );
        if let Some((outcome, at)) = self.state.get_last_command() {
            let verb = match outcome {
                DispatchOutcome::Locked => "Locked",
                DispatchOutcome::Unlocked => "Unlocked",
                DispatchOutcome::Ignored(_) => "Ignored",
            };
            description.push_str(&format!("\n{} remotely at {}", verb, at.format("%H:%M")));
        }

        ksni::ToolTip {
            icon_name: String::new(),
            icon_pixmap: Vec::new(),
            title: "AirUnlock".to_string(),
            description,
        }
    }

    fn menu(&self) -> Vec<MenuItem<Self>> {
        let mut items = vec![];

        let status_text = match self.state.get_status() {
            PeripheralStatus::Advertising => format!("● {}", self.lock_label()),
            PeripheralStatus::PoweredOff => "○ Bluetooth is off".to_string(),
            PeripheralStatus::Error => "✕ Bluetooth error".to_string(),
        };
        items.push(MenuItem::Standard(StandardItem {
            label: status_text,
            enabled: false,
            ..Default::default()
        }));

        if let Some(payload) = self.state.get_pairing_payload() {
            items.push(MenuItem::Standard(StandardItem {
                label: format!("Pairing: {}", payload),
                enabled: false,
                ..Default::default()
            }));
        }

        items.push(MenuItem::Separator);

        items.push(MenuItem::Standard(StandardItem {
            label: "Quit".to_string(),
            activate: Box::new(|tray: &mut Self| {
                let _ = tray.action_tx.send(TrayAction::Quit);
            }),
            ..Default::default()
        }));

        items
    }

    fn id(&self) -> String {
        "airunlock".to_string()
    }

    fn category(&self) -> ksni::Category {
        ksni::Category::SystemServices
    }
}

/// Run the system tray service.
pub fn run_tray(
    state: Arc<AppState>,
    lock_state: LockStateReader,
) -> Result<(mpsc::UnboundedReceiver<TrayAction>, Handle<AirUnlockTray>)> {
    let (action_tx, action_rx) = mpsc::unbounded_channel();

    let state_changes = state.subscribe();
    let tray = AirUnlockTray::new(state, lock_state.clone(), action_tx);
    let service = TrayService::new(tray);
    let handle = service.handle();

    std::thread::spawn(move || {
        let _ = service.run();
    });

    spawn_refresh(handle.clone(), lock_state, state_changes);

    info!("System tray started");

    Ok((action_rx, handle))
}

/// Redraw on every lock notification and every peripheral state change.
fn spawn_refresh(
    handle: Handle<AirUnlockTray>,
    mut lock_state: LockStateReader,
    mut state_changes: watch::Receiver<()>,
) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                changed = lock_state.changed() => {
                    if changed.is_none() {
                        break;
                    }
                }
                changed = state_changes.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
            handle.update(|_| {});
        }
    });
}
