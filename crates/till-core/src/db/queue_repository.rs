//! Sync queue repository implementation

use std::collections::HashSet;

use libsql::Connection;

use crate::error::Result;
use crate::models::{Collection, EntryId, QueueEntry, QueueStatus, SyncAction};

/// Trait for durable sync queue storage operations (async)
#[allow(async_fn_in_trait)]
pub trait QueueRepository {
    /// Durably append an entry
    async fn insert(&self, entry: &QueueEntry) -> Result<()>;

    /// Load all pending entries in drain order:
    /// `(priority, created_at, id)` ascending
    async fn load_pending(&self) -> Result<Vec<QueueEntry>>;

    /// Count of pending entries
    async fn pending_count(&self) -> Result<u64>;

    /// Mark an entry completed after a successful remote call
    async fn mark_completed(&self, id: &EntryId) -> Result<()>;

    /// Record a failed attempt. The entry stays pending below the retry
    /// ceiling and flips to failed at it. Returns whether it failed now.
    async fn record_failure(
        &self,
        id: &EntryId,
        new_retry_count: u32,
        error: &str,
        ceiling: u32,
    ) -> Result<bool>;

    /// Mark an entry failed outright, bypassing the retry ceiling
    async fn fail_entry(&self, id: &EntryId, error: &str) -> Result<()>;

    /// Garbage-collect completed entries created before `cutoff` (RFC 3339).
    /// Returns the number of deleted rows.
    async fn delete_completed_before(&self, cutoff: &str) -> Result<u64>;

    /// List entries, optionally filtered by status, newest first
    async fn list(&self, status: Option<QueueStatus>, limit: usize) -> Result<Vec<QueueEntry>>;

    /// Put a failed entry back on the queue with fresh retry bookkeeping.
    /// Returns false when the entry does not exist or is not failed.
    async fn requeue_failed(&self, id: &EntryId) -> Result<bool>;

    /// Record ids of failed entries for one `(collection, action)` pair;
    /// used to cascade-fail children of a permanently failed parent
    async fn failed_record_ids(
        &self,
        collection: Collection,
        action: SyncAction,
    ) -> Result<HashSet<String>>;
}

/// libSQL implementation of `QueueRepository`
pub struct LibSqlQueueRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlQueueRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_entry(row: &libsql::Row) -> Result<QueueEntry> {
        let id: String = row.get(0)?;
        let action: String = row.get(1)?;
        let collection: String = row.get(2)?;
        let payload: String = row.get(4)?;
        let retry_count: i64 = row.get(6)?;
        let status: String = row.get(8)?;

        Ok(QueueEntry {
            id: id
                .parse()
                .map_err(|_| crate::error::Error::InvalidInput(format!("invalid entry id: {id}")))?,
            action: action.parse()?,
            collection: collection.parse()?,
            record_id: row.get(3)?,
            payload: serde_json::from_str(&payload)?,
            created_at: row.get(5)?,
            retry_count: u32::try_from(retry_count).unwrap_or(0),
            last_error: row.get(7)?,
            status: status.parse()?,
        })
    }

    async fn collect_entries(&self, sql: &str, params: impl libsql::params::IntoParams) -> Result<Vec<QueueEntry>> {
        let mut rows = self.conn.query(sql, params).await?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(Self::parse_entry(&row)?);
        }
        Ok(entries)
    }
}

const SELECT_COLUMNS: &str = "id, action, collection, record_id, payload, created_at, retry_count, last_error, status";

impl QueueRepository for LibSqlQueueRepository<'_> {
    async fn insert(&self, entry: &QueueEntry) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO sync_queue
                 (id, action, collection, record_id, payload, created_at, retry_count, last_error, status)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                libsql::params![
                    entry.id.as_str(),
                    entry.action.as_str(),
                    entry.collection.as_str(),
                    entry.record_id.clone(),
                    entry.payload.to_string(),
                    entry.created_at.clone(),
                    i64::from(entry.retry_count),
                    entry.last_error.clone(),
                    entry.status.as_str(),
                ],
            )
            .await?;
        Ok(())
    }

    async fn load_pending(&self) -> Result<Vec<QueueEntry>> {
        let mut entries = self
            .collect_entries(
                &format!("SELECT {SELECT_COLUMNS} FROM sync_queue WHERE status = 'pending'"),
                (),
            )
            .await?;

        // Priority first, then FIFO; id as deterministic tie-break.
        entries.sort_by(|a, b| {
            a.priority()
                .cmp(&b.priority())
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.as_str().cmp(&b.id.as_str()))
        });
        Ok(entries)
    }

    async fn pending_count(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM sync_queue WHERE status = 'pending'",
                (),
            )
            .await?;
        let count: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn mark_completed(&self, id: &EntryId) -> Result<()> {
        self.conn
            .execute(
                "UPDATE sync_queue SET status = 'completed', last_error = NULL WHERE id = ?",
                [id.as_str()],
            )
            .await?;
        Ok(())
    }

    async fn record_failure(
        &self,
        id: &EntryId,
        new_retry_count: u32,
        error: &str,
        ceiling: u32,
    ) -> Result<bool> {
        let failed = new_retry_count >= ceiling;
        let status = if failed {
            QueueStatus::Failed
        } else {
            QueueStatus::Pending
        };
        self.conn
            .execute(
                "UPDATE sync_queue SET retry_count = ?, last_error = ?, status = ? WHERE id = ?",
                libsql::params![
                    i64::from(new_retry_count),
                    error,
                    status.as_str(),
                    id.as_str()
                ],
            )
            .await?;
        Ok(failed)
    }

    async fn fail_entry(&self, id: &EntryId, error: &str) -> Result<()> {
        self.conn
            .execute(
                "UPDATE sync_queue SET status = 'failed', last_error = ? WHERE id = ?",
                libsql::params![error, id.as_str()],
            )
            .await?;
        Ok(())
    }

    async fn delete_completed_before(&self, cutoff: &str) -> Result<u64> {
        let deleted = self
            .conn
            .execute(
                "DELETE FROM sync_queue WHERE status = 'completed' AND created_at < ?",
                [cutoff],
            )
            .await?;
        Ok(deleted)
    }

    async fn list(&self, status: Option<QueueStatus>, limit: usize) -> Result<Vec<QueueEntry>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        match status {
            Some(status) => {
                self.collect_entries(
                    &format!(
                        "SELECT {SELECT_COLUMNS} FROM sync_queue WHERE status = ?
                         ORDER BY created_at DESC LIMIT ?"
                    ),
                    libsql::params![status.as_str(), limit],
                )
                .await
            }
            None => {
                self.collect_entries(
                    &format!(
                        "SELECT {SELECT_COLUMNS} FROM sync_queue
                         ORDER BY created_at DESC LIMIT ?"
                    ),
                    libsql::params![limit],
                )
                .await
            }
        }
    }

    async fn requeue_failed(&self, id: &EntryId) -> Result<bool> {
        let updated = self
            .conn
            .execute(
                "UPDATE sync_queue
                 SET status = 'pending', retry_count = 0, last_error = NULL
                 WHERE id = ? AND status = 'failed'",
                [id.as_str()],
            )
            .await?;
        Ok(updated > 0)
    }

    async fn failed_record_ids(
        &self,
        collection: Collection,
        action: SyncAction,
    ) -> Result<HashSet<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT record_id FROM sync_queue
                 WHERE status = 'failed' AND collection = ? AND action = ?",
                [collection.as_str(), action.as_str()],
            )
            .await?;
        let mut ids = HashSet::new();
        while let Some(row) = rows.next().await? {
            ids.insert(row.get::<String>(0)?);
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn entry_at(
        action: SyncAction,
        collection: Collection,
        record_id: &str,
        created_at: &str,
    ) -> QueueEntry {
        let mut entry = QueueEntry::new(action, collection, record_id, json!({"id": record_id}));
        entry.created_at = created_at.to_string();
        entry
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_insert_and_load_round_trip() {
        let db = setup().await;
        let repo = LibSqlQueueRepository::new(db.connection());

        let entry = QueueEntry::new(
            SyncAction::Create,
            Collection::Transactions,
            "t1",
            json!({"id": "t1", "total_amount": 50_000.0}),
        );
        repo.insert(&entry).await.unwrap();

        let pending = repo.load_pending().await.unwrap();
        assert_eq!(pending, vec![entry]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_load_pending_orders_by_priority_then_fifo() {
        let db = setup().await;
        let repo = LibSqlQueueRepository::new(db.connection());

        // Inserted deliberately out of drain order.
        let stock = entry_at(
            SyncAction::Update,
            Collection::Products,
            "p1",
            "2025-01-01T08:00:00+00:00",
        );
        let employee = entry_at(
            SyncAction::Create,
            Collection::TransactionEmployees,
            "e1",
            "2025-01-01T08:00:01+00:00",
        );
        let detail_late = entry_at(
            SyncAction::Create,
            Collection::TransactionDetails,
            "d2",
            "2025-01-01T08:00:02+00:00",
        );
        let detail_early = entry_at(
            SyncAction::Create,
            Collection::TransactionDetails,
            "d1",
            "2025-01-01T08:00:01+00:00",
        );
        let trx = entry_at(
            SyncAction::Create,
            Collection::Transactions,
            "t1",
            "2025-01-01T08:00:03+00:00",
        );

        for entry in [&stock, &employee, &detail_late, &detail_early, &trx] {
            repo.insert(entry).await.unwrap();
        }

        let order: Vec<String> = repo
            .load_pending()
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.record_id)
            .collect();
        assert_eq!(order, vec!["t1", "d1", "d2", "e1", "p1"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_record_failure_respects_ceiling() {
        let db = setup().await;
        let repo = LibSqlQueueRepository::new(db.connection());

        let entry = QueueEntry::new(SyncAction::Create, Collection::Transactions, "t1", json!({}));
        repo.insert(&entry).await.unwrap();

        for attempt in 1..5 {
            let failed = repo
                .record_failure(&entry.id, attempt, "network timeout", 5)
                .await
                .unwrap();
            assert!(!failed);
            assert_eq!(repo.pending_count().await.unwrap(), 1);
        }

        let failed = repo
            .record_failure(&entry.id, 5, "network timeout", 5)
            .await
            .unwrap();
        assert!(failed);
        assert_eq!(repo.pending_count().await.unwrap(), 0);

        let failed_entries = repo.list(Some(QueueStatus::Failed), 10).await.unwrap();
        assert_eq!(failed_entries.len(), 1);
        assert_eq!(failed_entries[0].retry_count, 5);
        assert_eq!(
            failed_entries[0].last_error.as_deref(),
            Some("network timeout")
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_gc_only_collects_old_completed() {
        let db = setup().await;
        let repo = LibSqlQueueRepository::new(db.connection());

        let old_completed = entry_at(
            SyncAction::Create,
            Collection::Transactions,
            "old",
            "2025-01-01T00:00:00+00:00",
        );
        let old_failed = entry_at(
            SyncAction::Create,
            Collection::Transactions,
            "stuck",
            "2025-01-01T00:00:00+00:00",
        );
        let fresh_completed = entry_at(
            SyncAction::Create,
            Collection::Transactions,
            "fresh",
            "2025-06-01T00:00:00+00:00",
        );
        for entry in [&old_completed, &old_failed, &fresh_completed] {
            repo.insert(entry).await.unwrap();
        }
        repo.mark_completed(&old_completed.id).await.unwrap();
        repo.mark_completed(&fresh_completed.id).await.unwrap();
        repo.fail_entry(&old_failed.id, "gave up").await.unwrap();

        let deleted = repo
            .delete_completed_before("2025-03-01T00:00:00+00:00")
            .await
            .unwrap();
        assert_eq!(deleted, 1);

        let remaining: Vec<String> = repo
            .list(None, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.record_id)
            .collect();
        assert!(remaining.contains(&"stuck".to_string()));
        assert!(remaining.contains(&"fresh".to_string()));
        assert!(!remaining.contains(&"old".to_string()));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_requeue_failed_resets_bookkeeping() {
        let db = setup().await;
        let repo = LibSqlQueueRepository::new(db.connection());

        let entry = QueueEntry::new(SyncAction::Create, Collection::Transactions, "t1", json!({}));
        repo.insert(&entry).await.unwrap();
        repo.record_failure(&entry.id, 5, "boom", 5).await.unwrap();

        assert!(repo.requeue_failed(&entry.id).await.unwrap());
        let pending = repo.load_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].retry_count, 0);
        assert!(pending[0].last_error.is_none());

        // Requeue is a no-op on entries that are not failed
        assert!(!repo.requeue_failed(&entry.id).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_record_ids_filters_by_collection_and_action() {
        let db = setup().await;
        let repo = LibSqlQueueRepository::new(db.connection());

        let trx = QueueEntry::new(SyncAction::Create, Collection::Transactions, "t1", json!({}));
        let stock = QueueEntry::new(SyncAction::Update, Collection::Products, "p1", json!({}));
        repo.insert(&trx).await.unwrap();
        repo.insert(&stock).await.unwrap();
        repo.fail_entry(&trx.id, "gave up").await.unwrap();
        repo.fail_entry(&stock.id, "gave up").await.unwrap();

        let failed = repo
            .failed_record_ids(Collection::Transactions, SyncAction::Create)
            .await
            .unwrap();
        assert_eq!(failed, HashSet::from(["t1".to_string()]));
    }
}
