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

//! Command dispatch state machine.

use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{Command, KeywordSource};
use crate::session::{LockSnapshot, LockState, LockStateReader, SessionActions};
use crate::storage::{Credential, SecretError, SecretStore};

/// What a dispatched write led to. The central is told `Success` either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Locked,
    Unlocked,
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Not a keyword, or not text at all.
    Unrecognized,
    /// Right keyword for the other lock state.
    WrongState,
    /// An action was issued and the desktop has not reported back yet.
    AwaitingConfirmation,
    /// Unlock requested but no credential could be loaded.
    NoCredential,
    /// The desktop refused the action or the keystrokes did not go out.
    ActionFailed,
}

/// An action whose effect has not been confirmed by a lock notification.
#[derive(Debug, Clone, Copy)]
struct PendingTransition {
    expected: LockState,
    generation: u64,
    deadline: Instant,
}

/// Turns write payloads into lock and unlock actions.
///
/// The dispatcher reads the lock state but never writes it. After issuing
/// an action it holds back further actions until the next lock
/// notification arrives, or until the confirmation window runs out.
pub struct CommandDispatcher {
    keywords: Arc<dyn KeywordSource>,
    lock_state: LockStateReader,
    actions: SessionActions,
    secrets: Arc<dyn SecretStore>,
    pending: Option<PendingTransition>,
}

impl CommandDispatcher {
    pub fn new(
        keywords: Arc<dyn KeywordSource>,
        lock_state: LockStateReader,
        actions: SessionActions,
        secrets: Arc<dyn SecretStore>,
    ) -> Self {
        Self {
            keywords,
            lock_state,
            actions,
            secrets,
            pending: None,
        }
    }

    /// Interpret one write payload, running the matching action to completion.
    pub async fn dispatch(&mut self, payload: &[u8]) -> DispatchOutcome {
        let keywords = self.keywords.keywords();
        let command = Command::parse(payload, &keywords);
        let snapshot = self.lock_state.snapshot();
        self.expire_pending(snapshot);

        let outcome = match command {
            Command::Lock => self.lock(snapshot).await,
            Command::Unlock => self.unlock(snapshot).await,
            Command::Toggle => match snapshot.state {
                LockState::Unlocked => self.lock(snapshot).await,
                LockState::Locked => self.unlock(snapshot).await,
            },
            Command::Unrecognized => DispatchOutcome::Ignored(IgnoreReason::Unrecognized),
        };
        debug!(
            "Dispatched {:?} in state {}: {:?}",
            command, snapshot.state, outcome
        );
        outcome
    }

    async fn lock(&mut self, snapshot: LockSnapshot) -> DispatchOutcome {
        if let Some(reason) = self.gate(LockState::Unlocked, snapshot) {
            return DispatchOutcome::Ignored(reason);
        }

        info!("lock screen!");
        let started = Instant::now();
        if !self.actions.lock().await {
            return DispatchOutcome::Ignored(IgnoreReason::ActionFailed);
        }
        self.await_confirmation(LockState::Locked, snapshot, started);
        DispatchOutcome::Locked
    }

    async fn unlock(&mut self, snapshot: LockSnapshot) -> DispatchOutcome {
        if let Some(reason) = self.gate(LockState::Locked, snapshot) {
            return DispatchOutcome::Ignored(reason);
        }

        let Some(credential) = self.load_credential().await else {
            return DispatchOutcome::Ignored(IgnoreReason::NoCredential);
        };

        info!("unlock screen!");
        let started = Instant::now();
        if !self.actions.unlock(&credential).await {
            return DispatchOutcome::Ignored(IgnoreReason::ActionFailed);
        }
        self.await_confirmation(LockState::Unlocked, snapshot, started);
        DispatchOutcome::Unlocked
    }

    /// Why an action requiring `required` may not run now, if anything.
    fn gate(&self, required: LockState, snapshot: LockSnapshot) -> Option<IgnoreReason> {
        if snapshot.state != required {
            return Some(IgnoreReason::WrongState);
        }
        if self.pending.is_some() {
            return Some(IgnoreReason::AwaitingConfirmation);
        }
        None
    }

    fn await_confirmation(
        &mut self,
        expected: LockState,
        snapshot: LockSnapshot,
        started: Instant,
    ) {
        self.pending = Some(PendingTransition {
            expected,
            generation: snapshot.generation,
            deadline: started + self.actions.timings().confirmation_window(),
        });
    }

    fn expire_pending(&mut self, snapshot: LockSnapshot) {
        let Some(pending) = self.pending else {
            return;
        };
        if pending.generation != snapshot.generation {
            debug!(
                "Lock notification received while expecting {}",
                pending.expected
            );
            self.pending = None;
        } else if Instant::now() >= pending.deadline {
            warn!(
                "Desktop never reported {}, accepting commands again",
                pending.expected
            );
            self.pending = None;
        }
    }

    /// Fetch the credential for a single unlock; it is dropped right after.
    async fn load_credential(&self) -> Option<Credential> {
        let secrets = self.secrets.clone();
        let loaded = match tokio::task::spawn_blocking(move || secrets.load()).await {
            Ok(result) => result,
            Err(e) => Err(SecretError::Backend(e.to_string())),
        };
        match loaded {
            Ok(credential) => Some(credential),
            Err(SecretError::NotFound) => {
                warn!("Unlock requested but no credential is stored");
                None
            }
            Err(e) => {
                warn!("Cannot read unlock credential: {}", e);
                None
            }
        }
    }
}
