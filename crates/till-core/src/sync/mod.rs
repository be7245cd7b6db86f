//! Offline-first synchronization subsystem.
//!
//! Local writes land in the durable store and on the sync queue; the engine
//! drains the queue against the remote proxy when online, in dependency
//! order, exactly once per entry. Reference data flows the other way via
//! periodic pulls.

pub mod connectivity;
pub mod engine;
pub mod queue;
pub mod remote;
pub mod state;

use std::sync::Arc;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

pub use connectivity::{ConnectivityMonitor, ConnectivityProbe, HttpConnectivityProbe};
pub use engine::SyncEngine;
pub use queue::SyncQueue;
pub use remote::{HttpRemoteStore, RemoteStore};
pub use state::{SyncState, SyncStatePublisher, SyncStatus};

/// Fire-and-forget wakeup for the background drain task.
///
/// `enqueue` callers poke this instead of awaiting remote confirmation.
#[derive(Debug, Clone, Default)]
pub struct SyncSignal {
    inner: Arc<Notify>,
}

impl SyncSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the engine to attempt a drain soon
    pub fn request_drain(&self) {
        self.inner.notify_one();
    }

    /// Suspend until a drain is requested
    pub async fn drain_requested(&self) {
        self.inner.notified().await;
    }
}

/// Owner handle for a spawned background task; aborts the task on drop so
/// subscriptions and pollers tear down with their owner.
#[derive(Debug)]
pub struct TaskGuard {
    handle: JoinHandle<()>,
}

impl TaskGuard {
    #[must_use]
    pub const fn new(handle: JoinHandle<()>) -> Self {
        Self { handle }
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_signal_wakes_waiter() {
        let signal = SyncSignal::new();
        let waiter = signal.clone();
        let task = tokio::spawn(async move {
            waiter.drain_requested().await;
            true
        });
        signal.request_drain();
        assert!(task.await.unwrap());
    }
}
