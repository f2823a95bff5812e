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

//! Lock and unlock actions.
//!
//! Both run inside the write processor task. Their delays are awaited, so the
//! central only gets its response once the action has played out.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::input::{InputInjector, Key};
use crate::storage::Credential;

/// Token for an active "user is present" assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityAssertion(pub u32);

/// Desktop operations the actions are built from.
#[async_trait]
pub trait SessionControl: Send + Sync {
    /// Force the session onto the lock screen.
    async fn lock_session(&self) -> Result<()>;

    /// Wake the display and keep it from idling until released.
    async fn assert_user_activity(&self) -> Result<ActivityAssertion>;

    async fn release_user_activity(&self, assertion: ActivityAssertion) -> Result<()>;
}

/// Delay stages inside the actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Pause after locking, before answering the central.
    pub lock_settle: Duration,
    /// Pause between waking the display and typing the credential.
    pub wake_delay: Duration,
    /// How long the desktop gets to report an action, on top of the
    /// action's own delays.
    pub confirm_grace: Duration,
}

impl Timings {
    /// No delay stages. The confirmation grace is kept.
    pub fn immediate() -> Self {
        Self {
            lock_settle: Duration::ZERO,
            wake_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Time after an action after which a missing lock notification is
    /// no longer waited for.
    pub fn confirmation_window(&self) -> Duration {
        self.lock_settle + self.wake_delay + self.confirm_grace
    }
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            lock_settle: Duration::from_secs(3),
            wake_delay: Duration::from_secs(1),
            confirm_grace: Duration::from_secs(10),
        }
    }
}

/// Lock Action and Unlock Action.
pub struct SessionActions {
    control: Arc<dyn SessionControl>,
    injector: Arc<dyn InputInjector>,
    timings: Timings,
}

impl SessionActions {
    pub fn new(
        control: Arc<dyn SessionControl>,
        injector: Arc<dyn InputInjector>,
        timings: Timings,
    ) -> Self {
        Self {
            control,
            injector,
            timings,
        }
    }

    pub fn timings(&self) -> Timings {
        self.timings
    }

    /// Lock the session, then give the lock screen time to come up.
    ///
    /// Returns whether the lock request was accepted. A failure is logged
    /// and never reaches the central.
    pub async fn lock(&self) -> bool {
        info!("Locking screen");
        let accepted = match self.control.lock_session().await {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to lock session: {:#}", e);
                false
            }
        };
        tokio::time::sleep(self.timings.lock_settle).await;
        accepted
    }

    /// Wake the display and type the credential into the focused prompt.
    ///
    /// Returns whether the credential was submitted. A failed wake alone
    /// does not count as a failure.
    pub async fn unlock(&self, credential: &Credential) -> bool {
        info!("Unlocking screen");

        let assertion = match self.control.assert_user_activity().await {
            Ok(assertion) => Some(assertion),
            Err(e) => {
                warn!("Could not assert user activity: {:#}", e);
                None
            }
        };

        tokio::time::sleep(self.timings.wake_delay).await;

        let submitted = match self.submit(credential).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Credential submission failed: {:#}", e);
                false
            }
        };

        if let Some(assertion) = assertion {
            if let Err(e) = self.control.release_user_activity(assertion).await {
                warn!("Could not release user activity assertion: {:#}", e);
            }
        }
        submitted
    }

    async fn submit(&self, credential: &Credential) -> Result<()> {
        let injector = self.injector.clone();
        let secret = credential.clone();
        debug!("Submitting credential via {}", injector.name());

        tokio::task::spawn_blocking(move || -> Result<()> {
            injector.type_text(secret.expose())?;
            injector.press_key(Key::Enter)
        })
        .await
        .context("Input task panicked")?
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::*;
    use parking_lot::Mutex;

    /// Records every desktop call in order.
    #[derive(Default)]
    pub struct Journal {
        pub calls: Mutex<Vec<String>>,
    }

    impl Journal {
        pub fn push(&self, call: impl Into<String>) {
            self.calls.lock().push(call.into());
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    #[derive(Default)]
    pub struct FakeControl {
        pub journal: Arc<Journal>,
        pub fail_assert: bool,
        pub fail_lock: bool,
    }

    #[async_trait]
    impl SessionControl for FakeControl {
        async fn lock_session(&self) -> Result<()> {
            if self.fail_lock {
                anyhow::bail!("no locker");
            }
            self.journal.push("lock");
            Ok(())
        }

        async fn assert_user_activity(&self) -> Result<ActivityAssertion> {
            if self.fail_assert {
                anyhow::bail!("screensaver unavailable");
            }
            self.journal.push("assert");
            Ok(ActivityAssertion(7))
        }

        async fn release_user_activity(&self, assertion: ActivityAssertion) -> Result<()> {
            self.journal.push(format!("release:{}", assertion.0));
            Ok(())
        }
    }

    pub struct FakeInjector {
        pub journal: Arc<Journal>,
        pub fail: bool,
    }

    impl InputInjector for FakeInjector {
        fn type_text(&self, text: &str) -> Result<()> {
            if self.fail {
                anyhow::bail!("automation failed");
            }
            self.journal.push(format!("type:{}", text));
            Ok(())
        }

        fn press_key(&self, key: Key) -> Result<()> {
            self.journal.push(format!("key:{:?}", key));
            Ok(())
        }

        fn name(&self) -> &'static str {
            "fake"
        }
    }

    pub fn actions(journal: &Arc<Journal>) -> SessionActions {
        actions_with(
            FakeControl {
                journal: journal.clone(),
                ..Default::default()
            },
            false,
            Timings::immediate(),
        )
    }

    pub fn actions_with(
        control: FakeControl,
        fail_input: bool,
        timings: Timings,
    ) -> SessionActions {
        let journal = control.journal.clone();
        SessionActions::new(
            Arc::new(control),
            Arc::new(FakeInjector {
                journal,
                fail: fail_input,
            }),
            timings,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::fakes::*;
    use super::*;

    #[tokio::test]
    async fn test_lock_calls_control() {
        let journal = Arc::new(Journal::default());
        assert!(actions(&journal).lock().await);
        assert_eq!(journal.calls(), vec!["lock"]);
    }

    #[tokio::test]
    async fn test_failed_lock_is_reported() {
        let journal = Arc::new(Journal::default());
        let control = FakeControl {
            journal: journal.clone(),
            fail_lock: true,
            ..Default::default()
        };
        assert!(!actions_with(control, false, Timings::immediate()).lock().await);
        assert!(journal.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unlock_stage_order() {
        let journal = Arc::new(Journal::default());
        assert!(actions(&journal).unlock(&Credential::new("hunter2")).await);
        assert_eq!(
            journal.calls(),
            vec!["assert", "type:hunter2", "key:Enter", "release:7"]
        );
    }

    #[tokio::test]
    async fn test_unlock_releases_after_failed_submit() {
        let journal = Arc::new(Journal::default());
        let actions = SessionActions::new(
            Arc::new(FakeControl {
                journal: journal.clone(),
                ..Default::default()
            }),
            Arc::new(FakeInjector {
                journal: journal.clone(),
                fail: true,
            }),
            Timings::immediate(),
        );

        assert!(!actions.unlock(&Credential::new("hunter2")).await);
        assert_eq!(journal.calls(), vec!["assert", "release:7"]);
    }

    #[tokio::test]
    async fn test_unlock_types_without_assertion() {
        let journal = Arc::new(Journal::default());
        let actions = SessionActions::new(
            Arc::new(FakeControl {
                journal: journal.clone(),
                fail_assert: true,
                ..Default::default()
            }),
            Arc::new(FakeInjector {
                journal: journal.clone(),
                fail: false,
            }),
            Timings::immediate(),
        );

        assert!(actions.unlock(&Credential::new("pw")).await);
        assert_eq!(journal.calls(), vec!["type:pw", "key:Enter"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lock_waits_for_settle() {
        let journal = Arc::new(Journal::default());
        let actions = SessionActions::new(
            Arc::new(FakeControl {
                journal: journal.clone(),
                ..Default::default()
            }),
            Arc::new(FakeInjector {
                journal: journal.clone(),
                fail: false,
            }),
            Timings::default(),
        );

        let started = tokio::time::Instant::now();
        actions.lock().await;
        assert!(started.elapsed() >= Duration::from_secs(3));
    }

    #[test]
    fn test_confirmation_window_covers_delays() {
        let timings = Timings::default();
        assert_eq!(timings.confirmation_window(), Duration::from_secs(14));
        assert_eq!(
            Timings::immediate().confirmation_window(),
            timings.confirm_grace
        );
    }
}
