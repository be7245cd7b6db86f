//! Sync queue service: the enqueue ingress for every outbound mutation.

use std::sync::Arc;

use serde_json::Value;

use super::state::SyncStatePublisher;
use super::SyncSignal;
use crate::db::{Database, LibSqlQueueRepository, QueueRepository};
use crate::error::Result;
use crate::models::{Collection, QueueEntry, SyncAction};

/// Durable, ordered list of pending mutation intents.
///
/// `enqueue` appends durably, refreshes the published pending count, and
/// pokes the drain task; the caller never awaits remote confirmation.
/// Durability failures propagate to the caller as fatal.
#[derive(Clone)]
pub struct SyncQueue {
    db: Arc<Database>,
    publisher: SyncStatePublisher,
    signal: SyncSignal,
}

impl SyncQueue {
    #[must_use]
    pub fn new(db: Arc<Database>, publisher: SyncStatePublisher, signal: SyncSignal) -> Self {
        Self {
            db,
            publisher,
            signal,
        }
    }

    /// Durably append a pending entry and request a drain
    pub async fn enqueue(
        &self,
        action: SyncAction,
        collection: Collection,
        record_id: impl Into<String>,
        payload: Value,
    ) -> Result<QueueEntry> {
        let entry = QueueEntry::new(action, collection, record_id, payload);
        let repo = LibSqlQueueRepository::new(self.db.connection());
        repo.insert(&entry).await?;

        let pending = repo.pending_count().await?;
        self.publisher.set_pending_count(pending);
        tracing::debug!(
            collection = %entry.collection,
            action = %entry.action,
            record_id = %entry.record_id,
            "queued outbound mutation"
        );

        self.signal.request_drain();
        Ok(entry)
    }

    /// Count of pending entries
    pub async fn pending_count(&self) -> Result<u64> {
        LibSqlQueueRepository::new(self.db.connection())
            .pending_count()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test(flavor = "multi_thread")]
    async fn enqueue_is_durable_and_publishes_count() {
        let db = Arc::new(Database::open_in_memory().await.unwrap());
        let publisher = SyncStatePublisher::new(true);
        let signal = SyncSignal::new();
        let queue = SyncQueue::new(Arc::clone(&db), publisher.clone(), signal.clone());

        let entry = queue
            .enqueue(
                SyncAction::Create,
                Collection::Transactions,
                "t1",
                json!({"id": "t1"}),
            )
            .await
            .unwrap();

        assert_eq!(queue.pending_count().await.unwrap(), 1);
        assert_eq!(publisher.current().pending_count, 1);

        // The entry survives on its own connection-level durability
        let repo = LibSqlQueueRepository::new(db.connection());
        let pending = repo.load_pending().await.unwrap();
        assert_eq!(pending, vec![entry]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn enqueue_signals_drain_task() {
        let db = Arc::new(Database::open_in_memory().await.unwrap());
        let publisher = SyncStatePublisher::new(true);
        let signal = SyncSignal::new();
        let queue = SyncQueue::new(db, publisher, signal.clone());

        let waiter = signal.clone();
        let task = tokio::spawn(async move {
            waiter.drain_requested().await;
        });

        queue
            .enqueue(SyncAction::Update, Collection::Products, "p1", json!({}))
            .await
            .unwrap();

        task.await.unwrap();
    }
}
