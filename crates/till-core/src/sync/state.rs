//! Published sync state, consumed by status UI.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

/// Current phase of the sync subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Idle,
    Syncing,
    Error,
    Offline,
}

/// One observable snapshot of the sync subsystem.
///
/// Listeners receive whole values only; there are no partial patches.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncState {
    pub status: SyncStatus,
    pub is_online: bool,
    pub pending_count: u64,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl SyncState {
    #[must_use]
    fn initial(is_online: bool) -> Self {
        Self {
            status: if is_online {
                SyncStatus::Idle
            } else {
                SyncStatus::Offline
            },
            is_online,
            pending_count: 0,
            last_sync_at: None,
            error_message: None,
        }
    }
}

/// Single-writer publisher over a watch channel.
///
/// Every helper builds a complete new `SyncState` and replaces the previous
/// value, so readers never observe a torn update.
#[derive(Debug, Clone)]
pub struct SyncStatePublisher {
    tx: Arc<watch::Sender<SyncState>>,
}

impl SyncStatePublisher {
    #[must_use]
    pub fn new(is_online: bool) -> Self {
        let (tx, _rx) = watch::channel(SyncState::initial(is_online));
        Self { tx: Arc::new(tx) }
    }

    /// Snapshot of the current state
    #[must_use]
    pub fn current(&self) -> SyncState {
        self.tx.borrow().clone()
    }

    /// Subscribe to state changes. Dropping the receiver unsubscribes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.tx.subscribe()
    }

    fn replace(&self, mutate: impl FnOnce(&mut SyncState)) {
        let mut next = self.current();
        mutate(&mut next);
        self.tx.send_replace(next);
    }

    pub fn set_status(&self, status: SyncStatus) {
        self.replace(|state| state.status = status);
    }

    /// Record a connectivity transition. Going offline parks the status;
    /// coming back online resets it ahead of the reconnect sync pass.
    pub fn set_online(&self, is_online: bool) {
        self.replace(|state| {
            state.is_online = is_online;
            state.status = if is_online {
                SyncStatus::Idle
            } else {
                SyncStatus::Offline
            };
        });
    }

    pub fn set_pending_count(&self, pending_count: u64) {
        self.replace(|state| state.pending_count = pending_count);
    }

    /// Successful pass: back to idle with a fresh sync timestamp
    pub fn finish_idle(&self, pending_count: u64) {
        self.replace(|state| {
            state.status = SyncStatus::Idle;
            state.pending_count = pending_count;
            state.last_sync_at = Some(Utc::now());
            state.error_message = None;
        });
    }

    /// Failed pass: error status with the message surfaced passively
    pub fn set_error(&self, message: impl Into<String>) {
        self.replace(|state| {
            state.status = SyncStatus::Error;
            state.error_message = Some(message.into());
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn initial_state_reflects_connectivity() {
        let online = SyncStatePublisher::new(true);
        assert_eq!(online.current().status, SyncStatus::Idle);

        let offline = SyncStatePublisher::new(false);
        assert_eq!(offline.current().status, SyncStatus::Offline);
        assert!(!offline.current().is_online);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn subscribers_see_whole_value_updates() {
        let publisher = SyncStatePublisher::new(true);
        let mut rx = publisher.subscribe();

        publisher.finish_idle(3);
        rx.changed().await.unwrap();

        let state = rx.borrow().clone();
        assert_eq!(state.pending_count, 3);
        assert!(state.last_sync_at.is_some());
        assert_eq!(state.status, SyncStatus::Idle);
    }

    #[test]
    fn error_then_idle_clears_message() {
        let publisher = SyncStatePublisher::new(true);
        publisher.set_error("remote unavailable");
        assert_eq!(publisher.current().status, SyncStatus::Error);
        assert_eq!(
            publisher.current().error_message.as_deref(),
            Some("remote unavailable")
        );

        publisher.finish_idle(0);
        assert_eq!(publisher.current().status, SyncStatus::Idle);
        assert!(publisher.current().error_message.is_none());
    }

    #[test]
    fn offline_transition_parks_status() {
        let publisher = SyncStatePublisher::new(true);
        publisher.set_online(false);
        assert_eq!(publisher.current().status, SyncStatus::Offline);

        publisher.set_online(true);
        assert_eq!(publisher.current().status, SyncStatus::Idle);
    }
}
