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

//! Serial processing of characteristic writes.
//!
//! BlueZ may invoke the write callback concurrently. Every write is funnelled
//! through one channel into a single [`WriteProcessor`], so at most one
//! command runs at a time and each write gets exactly one response.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::bluetooth::{PeripheralIdentity, WriteOutcome, WriteRequest};
use crate::commands::CommandDispatcher;
use crate::state::AppState;

/// Channel depth for writes waiting on the processor.
pub const WRITE_QUEUE_DEPTH: usize = 16;

/// A write waiting for its response.
#[derive(Debug)]
pub struct PeripheralWrite {
    pub request: WriteRequest,
    pub reply: oneshot::Sender<WriteOutcome>,
}

/// Owns the dispatcher and answers writes one by one.
pub struct WriteProcessor {
    identity: PeripheralIdentity,
    dispatcher: CommandDispatcher,
    state: Arc<AppState>,
}

impl WriteProcessor {
    pub fn new(
        identity: PeripheralIdentity,
        dispatcher: CommandDispatcher,
        state: Arc<AppState>,
    ) -> Self {
        Self {
            identity,
            dispatcher,
            state,
        }
    }

    /// Process a single write.
    ///
    /// Writes the peripheral does not accept are rejected untouched. Anything
    /// else is a success, whether or not it triggered an action.
    pub async fn process_write(&mut self, request: WriteRequest) -> WriteOutcome {
        if !self.identity.accepts(&request) {
            warn!(
                "Rejecting write to characteristic {}",
                request.characteristic_uuid
            );
            return WriteOutcome::WriteNotPermitted;
        }

        debug!(
            "Write received: {} bytes ({})",
            request.payload.len(),
            hex::encode(&request.payload)
        );
        let outcome = self.dispatcher.dispatch(&request.payload).await;
        self.state.record_command(outcome);
        WriteOutcome::Success
    }

    /// Answer writes until every sender is gone.
    pub async fn run(mut self, mut rx: mpsc::Receiver<PeripheralWrite>) {
        info!("Write processor started");
        while let Some(write) = rx.recv().await {
            let outcome = self.process_write(write.request).await;
            if write.reply.send(outcome).is_err() {
                debug!("Write response dropped, request was abandoned");
            }
        }
        info!("Write processor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bluetooth::ble_constants::SERVICE_UUID;
    use crate::commands::{CommandKeywords, DispatchOutcome};
    use crate::session::actions::fakes::{actions, Journal};
    use crate::session::{LockState, LockStateTracker, SessionSignal};
    use crate::storage::secret::MemorySecretStore;

    fn processor(
        tracker: &LockStateTracker,
        journal: &Arc<Journal>,
        state: &Arc<AppState>,
    ) -> WriteProcessor {
        let dispatcher = CommandDispatcher::new(
            Arc::new(CommandKeywords::new("lock", "unlock")),
            tracker.subscribe(),
            actions(journal),
            Arc::new(MemorySecretStore::with(Some("s3cret"))),
        );
        WriteProcessor::new(PeripheralIdentity::default(), dispatcher, state.clone())
    }

    fn count(journal: &Journal, call: &str) -> usize {
        journal.calls().iter().filter(|c| *c == call).count()
    }

    #[tokio::test]
    async fn test_lock_unlock_scenario() {
        let tracker = LockStateTracker::new();
        let journal = Arc::new(Journal::default());
        let state = Arc::new(AppState::new());
        let mut processor = processor(&tracker, &journal, &state);

        let outcome = processor
            .process_write(WriteRequest::command(b"lock".to_vec()))
            .await;
        assert_eq!(outcome, WriteOutcome::Success);
        assert_eq!(count(&journal, "lock"), 1);

        tracker.apply(SessionSignal::ScreenLocked);
        assert_eq!(tracker.current().state, LockState::Locked);

        let outcome = processor
            .process_write(WriteRequest::command(b"unlock".to_vec()))
            .await;
        assert_eq!(outcome, WriteOutcome::Success);
        assert_eq!(count(&journal, "type:s3cret"), 1);
        assert_eq!(
            state.get_last_command().map(|(o, _)| o),
            Some(DispatchOutcome::Unlocked)
        );

        // Second unlock before any notification does nothing.
        let outcome = processor
            .process_write(WriteRequest::command(b"unlock".to_vec()))
            .await;
        assert_eq!(outcome, WriteOutcome::Success);
        assert_eq!(count(&journal, "type:s3cret"), 1);
    }

    #[tokio::test]
    async fn test_round_trip_ends_unlocked() {
        let tracker = LockStateTracker::new();
        let journal = Arc::new(Journal::default());
        let state = Arc::new(AppState::new());
        let mut processor = processor(&tracker, &journal, &state);

        processor
            .process_write(WriteRequest::command(b"lock".to_vec()))
            .await;
        tracker.apply(SessionSignal::ScreenLocked);
        processor
            .process_write(WriteRequest::command(b"unlock".to_vec()))
            .await;
        tracker.apply(SessionSignal::ScreenUnlocked);

        let outcome = processor
            .process_write(WriteRequest::command(b"unlock".to_vec()))
            .await;
        assert_eq!(outcome, WriteOutcome::Success);
        assert_eq!(count(&journal, "assert"), 1);
    }

    #[tokio::test]
    async fn test_non_utf8_write_succeeds_without_action() {
        let tracker = LockStateTracker::new();
        let journal = Arc::new(Journal::default());
        let state = Arc::new(AppState::new());
        let mut processor = processor(&tracker, &journal, &state);

        let outcome = processor
            .process_write(WriteRequest::command(vec![0xff, 0xfe, 0xfd]))
            .await;
        assert_eq!(outcome, WriteOutcome::Success);
        assert!(journal.calls().is_empty());
        assert!(state.get_last_command().is_none());
    }

    #[tokio::test]
    async fn test_unregistered_characteristic_rejected() {
        let tracker = LockStateTracker::new();
        let journal = Arc::new(Journal::default());
        let state = Arc::new(AppState::new());
        let mut processor = processor(&tracker, &journal, &state);

        let request = WriteRequest {
            characteristic_uuid: SERVICE_UUID,
            payload: b"lock".to_vec(),
            write_permitted: true,
        };
        assert_eq!(
            processor.process_write(request).await,
            WriteOutcome::WriteNotPermitted
        );
        assert!(journal.calls().is_empty());
    }

    #[tokio::test]
    async fn test_run_answers_each_write_once() {
        let tracker = LockStateTracker::new();
        let journal = Arc::new(Journal::default());
        let state = Arc::new(AppState::new());
        let processor = processor(&tracker, &journal, &state);

        let (tx, rx) = mpsc::channel(WRITE_QUEUE_DEPTH);
        let task = tokio::spawn(processor.run(rx));

        let mut replies = Vec::new();
        for payload in [&b"lock"[..], b"lock", b"hello"] {
            let (reply, response) = oneshot::channel();
            tx.send(PeripheralWrite {
                request: WriteRequest::command(payload.to_vec()),
                reply,
            })
            .await
            .unwrap();
            replies.push(response);
        }

        for response in replies {
            assert_eq!(response.await.unwrap(), WriteOutcome::Success);
        }
        assert_eq!(count(&journal, "lock"), 1);

        drop(tx);
        task.await.unwrap();
    }
}
