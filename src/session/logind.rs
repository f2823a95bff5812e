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

//! systemd-logind and freedesktop screensaver bindings.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use tracing::{debug, info, warn};
use zbus::zvariant::OwnedObjectPath;
use zbus::Connection;

use super::actions::{ActivityAssertion, SessionControl};
use super::{LockStateTracker, SessionSignal};

const APPLICATION_NAME: &str = "AirUnlock";

#[zbus::proxy(
    interface = "org.freedesktop.login1.Manager",
    default_service = "org.freedesktop.login1",
    default_path = "/org/freedesktop/login1"
)]
trait LoginManager {
    fn get_session(&self, session_id: &str) -> zbus::Result<OwnedObjectPath>;

    #[zbus(name = "GetSessionByPID")]
    fn get_session_by_pid(&self, pid: u32) -> zbus::Result<OwnedObjectPath>;
}

#[zbus::proxy(
    interface = "org.freedesktop.login1.Session",
    default_service = "org.freedesktop.login1",
    default_path = "/org/freedesktop/login1/session/auto"
)]
trait LoginSession {
    fn lock(&self) -> zbus::Result<()>;

    #[zbus(property)]
    fn locked_hint(&self) -> zbus::Result<bool>;
}

#[zbus::proxy(
    interface = "org.freedesktop.ScreenSaver",
    default_service = "org.freedesktop.ScreenSaver",
    default_path = "/org/freedesktop/ScreenSaver"
)]
trait ScreenSaver {
    fn simulate_user_activity(&self) -> zbus::Result<()>;

    fn inhibit(&self, application_name: &str, reason_for_inhibit: &str) -> zbus::Result<u32>;

    fn un_inhibit(&self, cookie: u32) -> zbus::Result<()>;
}

/// Proxy for the logind session this process belongs to.
///
/// Signals are emitted on the session's real object path, so `auto` is
/// resolved first.
pub async fn connect_session() -> Result<LoginSessionProxy<'static>> {
    let connection = Connection::system()
        .await
        .context("Failed to connect to the system bus")?;
    let manager = LoginManagerProxy::new(&connection).await?;

    let mut path = None;
    if let Ok(id) = std::env::var("XDG_SESSION_ID") {
        match manager.get_session(&id).await {
            Ok(p) => path = Some(p),
            Err(e) => debug!("No logind session for XDG_SESSION_ID={}: {}", id, e),
        }
    }
    let path = match path {
        Some(p) => p,
        None => manager
            .get_session_by_pid(std::process::id())
            .await
            .context("Process is not part of a logind session")?,
    };
    info!("Using logind session {}", path.as_str());

    let session = LoginSessionProxy::builder(&connection)
        .path(path)?
        .build()
        .await?;
    Ok(session)
}

/// Relays logind `LockedHint` changes into the lock state.
pub struct SessionMonitor {
    session: LoginSessionProxy<'static>,
}

impl SessionMonitor {
    pub fn new(session: LoginSessionProxy<'static>) -> Self {
        Self { session }
    }

    /// Runs until the bus connection goes away.
    pub async fn run(self, tracker: LockStateTracker) -> Result<()> {
        let mut changes = self.session.receive_locked_hint_changed().await;
        info!("Watching session lock notifications");

        while let Some(change) = changes.next().await {
            match change.get().await {
                Ok(locked) => tracker.apply(SessionSignal::from_locked_hint(locked)),
                Err(e) => warn!("Unreadable LockedHint change: {}", e),
            }
        }

        warn!("Session lock notification stream ended");
        Ok(())
    }
}

/// [`SessionControl`] backed by logind and the desktop screensaver.
pub struct LogindControl {
    session: LoginSessionProxy<'static>,
    screensaver: Option<ScreenSaverProxy<'static>>,
}

impl LogindControl {
    /// The screensaver lives on the session bus and is optional; without it
    /// the display is not woken before typing.
    pub async fn new(session: LoginSessionProxy<'static>) -> Self {
        let screensaver = match Self::connect_screensaver().await {
            Ok(proxy) => Some(proxy),
            Err(e) => {
                warn!("Screensaver service unavailable: {:#}", e);
                None
            }
        };
        Self {
            session,
            screensaver,
        }
    }

    async fn connect_screensaver() -> Result<ScreenSaverProxy<'static>> {
        let connection = Connection::session()
            .await
            .context("Failed to connect to the session bus")?;
        Ok(ScreenSaverProxy::new(&connection).await?)
    }
}

#[async_trait]
impl SessionControl for LogindControl {
    async fn lock_session(&self) -> Result<()> {
        self.session.lock().await.context("logind Lock failed")
    }

    async fn assert_user_activity(&self) -> Result<ActivityAssertion> {
        let screensaver = self
            .screensaver
            .as_ref()
            .context("No screensaver service")?;
        screensaver.simulate_user_activity().await?;
        let cookie = screensaver
            .inhibit(APPLICATION_NAME, "Unlocking session")
            .await?;
        debug!("Idle inhibited, cookie {}", cookie);
        Ok(ActivityAssertion(cookie))
    }

    async fn release_user_activity(&self, assertion: ActivityAssertion) -> Result<()> {
        let screensaver = self
            .screensaver
            .as_ref()
            .context("No screensaver service")?;
        screensaver.un_inhibit(assertion.0).await?;
        Ok(())
    }
}
