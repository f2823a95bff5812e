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

//! Host session lock state.
//!
//! The lock state is written only by the session monitor, which relays the
//! desktop's own lock/unlock notifications. Everything else reads snapshots.

pub mod actions;
pub mod logind;

use std::fmt;
use tokio::sync::watch;
use tracing::info;

pub use actions::{ActivityAssertion, SessionActions, SessionControl, Timings};
pub use logind::{LogindControl, SessionMonitor};

/// Whether the interactive session is locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockState {
    Locked,
    #[default]
    Unlocked,
}

impl LockState {
    pub fn is_locked(self) -> bool {
        self == LockState::Locked
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockState::Locked => f.write_str("locked"),
            LockState::Unlocked => f.write_str("unlocked"),
        }
    }
}

/// A lock notification from the desktop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSignal {
    ScreenLocked,
    ScreenUnlocked,
}

impl SessionSignal {
    pub fn from_locked_hint(locked: bool) -> Self {
        if locked {
            SessionSignal::ScreenLocked
        } else {
            SessionSignal::ScreenUnlocked
        }
    }

    fn state(self) -> LockState {
        match self {
            SessionSignal::ScreenLocked => LockState::Locked,
            SessionSignal::ScreenUnlocked => LockState::Unlocked,
        }
    }
}

/// Lock state plus a counter of notifications received so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LockSnapshot {
    pub state: LockState,
    pub generation: u64,
}

/// Sole writer of the lock state.
#[derive(Debug)]
pub struct LockStateTracker {
    tx: watch::Sender<LockSnapshot>,
}

impl LockStateTracker {
    /// Start out unlocked, as at login.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(LockSnapshot::default());
        Self { tx }
    }

    /// Record a notification from the desktop.
    pub fn apply(&self, signal: SessionSignal) {
        self.tx.send_modify(|snapshot| {
            snapshot.state = signal.state();
            snapshot.generation += 1;
        });
        match signal {
            SessionSignal::ScreenLocked => info!("Screen is locked"),
            SessionSignal::ScreenUnlocked => info!("Screen is unlocked"),
        }
    }

    pub fn subscribe(&self) -> LockStateReader {
        LockStateReader {
            rx: self.tx.subscribe(),
        }
    }

    pub fn current(&self) -> LockSnapshot {
        *self.tx.borrow()
    }
}

impl Default for LockStateTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Read side of the lock state.
#[derive(Debug, Clone)]
pub struct LockStateReader {
    rx: watch::Receiver<LockSnapshot>,
}

impl LockStateReader {
    pub fn snapshot(&self) -> LockSnapshot {
        *self.rx.borrow()
    }

    pub fn state(&self) -> LockState {
        self.rx.borrow().state
    }

    /// Wait for the next notification. Returns `None` once the tracker is gone.
    pub async fn changed(&mut self) -> Option<LockSnapshot> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }
}
