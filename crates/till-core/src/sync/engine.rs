//! Sync engine: drains the queue against the remote store and pulls
//! reference-data snapshots back into the local mirror.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;

use super::connectivity::ConnectivityMonitor;
use super::remote::RemoteStore;
use super::state::{SyncStatePublisher, SyncStatus};
use super::{SyncSignal, TaskGuard};
use crate::config::{StoreContext, SyncSettings};
use crate::db::{
    CatalogRepository, Database, LibSqlCatalogRepository, LibSqlQueueRepository,
    LibSqlSalesRepository, QueueRepository, SalesRepository,
};
use crate::error::Result;
use crate::models::{Collection, QueueEntry, SyncAction};
use crate::util::compact_text;

/// Drains the sync queue and refreshes local reference mirrors.
///
/// The only component allowed to write to the remote store.
pub struct SyncEngine<R> {
    db: Arc<Database>,
    remote: R,
    connectivity: ConnectivityMonitor,
    publisher: SyncStatePublisher,
    signal: SyncSignal,
    context: StoreContext,
    settings: SyncSettings,
}

impl<R: RemoteStore> SyncEngine<R> {
    #[must_use]
    pub fn new(
        db: Arc<Database>,
        remote: R,
        connectivity: ConnectivityMonitor,
        publisher: SyncStatePublisher,
        signal: SyncSignal,
        context: StoreContext,
        settings: SyncSettings,
    ) -> Self {
        Self {
            db,
            remote,
            connectivity,
            publisher,
            signal,
            context,
            settings,
        }
    }

    #[must_use]
    pub const fn publisher(&self) -> &SyncStatePublisher {
        &self.publisher
    }

    /// One drain pass over all eligible pending entries.
    ///
    /// No-op when offline or when a drain is already in progress (the
    /// published `syncing` status doubles as the concurrency guard; all
    /// invocations run on the same logical thread of execution). Requires a
    /// resolved store context; without one the pass fails with an
    /// explanatory error instead of attempting a partial sync.
    pub async fn process_queue(&self) -> Result<()> {
        if !self.connectivity.is_online() {
            tracing::debug!("offline, skipping queue drain");
            return Ok(());
        }
        if self.publisher.current().status == SyncStatus::Syncing {
            tracing::debug!("drain already in progress, skipping");
            return Ok(());
        }
        let store_id = match self.context.store_id() {
            Ok(store_id) => store_id,
            Err(error) => {
                self.publisher.set_error(error.to_string());
                return Err(error);
            }
        };

        self.publisher.set_status(SyncStatus::Syncing);
        match self.drain(&store_id).await {
            Ok(pending) => {
                self.publisher.finish_idle(pending);
                Ok(())
            }
            Err(error) => {
                self.publisher.set_error(error.to_string());
                Err(error)
            }
        }
    }

    /// Process the pending batch in priority order and garbage-collect old
    /// completed entries. Returns the pending count after the pass.
    async fn drain(&self, store_id: &str) -> Result<u64> {
        let queue = LibSqlQueueRepository::new(self.db.connection());
        let sales = LibSqlSalesRepository::new(self.db.connection());

        let entries = queue.load_pending().await?;
        tracing::debug!(count = entries.len(), "processing sync queue");

        // Parents present in this batch gate their children until synced.
        let batch_parents: HashSet<String> = entries
            .iter()
            .filter(|entry| {
                entry.collection == Collection::Transactions && entry.action == SyncAction::Create
            })
            .map(|entry| entry.record_id.clone())
            .collect();
        let mut failed_parents = queue
            .failed_record_ids(Collection::Transactions, SyncAction::Create)
            .await?;
        let mut synced_parents: HashSet<String> = HashSet::new();

        for entry in &entries {
            if let Some(parent) = entry.gating_parent() {
                if failed_parents.contains(&parent) {
                    // The parent can never sync; a gated child would starve
                    // forever, so it fails with it.
                    queue
                        .fail_entry(&entry.id, "parent transaction failed to sync")
                        .await?;
                    continue;
                }
                if batch_parents.contains(&parent) && !synced_parents.contains(&parent) {
                    continue;
                }
            }

            match self.push_entry(entry, store_id).await {
                Ok(()) => {
                    if entry.collection == Collection::Transactions
                        && entry.action == SyncAction::Create
                    {
                        synced_parents.insert(entry.record_id.clone());
                        sales.mark_synced(&entry.record_id).await?;
                    }
                    queue.mark_completed(&entry.id).await?;
                }
                Err(error) => {
                    tracing::warn!(
                        entry = %entry.id,
                        collection = %entry.collection,
                        error = %error,
                        "failed to sync queue entry"
                    );
                    let failed_now = queue
                        .record_failure(
                            &entry.id,
                            entry.retry_count + 1,
                            &compact_text(&error.to_string()),
                            self.settings.retry_ceiling,
                        )
                        .await?;
                    if failed_now
                        && entry.collection == Collection::Transactions
                        && entry.action == SyncAction::Create
                    {
                        failed_parents.insert(entry.record_id.clone());
                    }
                }
            }
        }

        let removed = queue
            .delete_completed_before(&self.settings.completed_cutoff())
            .await?;
        if removed > 0 {
            tracing::debug!(removed, "collected completed queue entries");
        }

        queue.pending_count().await
    }

    async fn push_entry(&self, entry: &QueueEntry, store_id: &str) -> Result<()> {
        self.remote
            .mutate(
                entry.action,
                entry.collection,
                Some(&entry.record_id),
                &entry.payload,
                store_id,
            )
            .await?;

        if !self.settings.activity_log_triggers
            && entry.collection == Collection::Transactions
            && entry.action == SyncAction::Create
        {
            // The remote database has no audit triggers in this
            // configuration; write the log the trigger would have written.
            let invoice = entry
                .payload
                .get("invoice_number")
                .and_then(Value::as_str)
                .unwrap_or(&entry.record_id);
            let log = serde_json::json!({
                "user_id": entry.payload.get("created_by"),
                "action": "create_transaction",
                "table_name": Collection::Transactions.as_str(),
                "record_id": entry.record_id,
                "description": format!("Transaction {invoice} synced from device"),
                "new_value": entry.payload,
            });
            self.remote
                .mutate(
                    SyncAction::Create,
                    Collection::ActivityLogs,
                    None,
                    &log,
                    store_id,
                )
                .await?;
        }

        Ok(())
    }

    /// Full pass: pull reference-data snapshots, then drain the queue.
    ///
    /// Runs on reconnect and on demand. A pull failure aborts the pass and
    /// publishes the error; existing local rows stay untouched because
    /// upserts are per-record and pulls are retried wholesale next cycle.
    pub async fn sync_all(&self) -> Result<()> {
        if !self.connectivity.is_online() {
            tracing::debug!("offline, skipping full sync");
            return Ok(());
        }
        let Ok(store_id) = self.context.store_id() else {
            tracing::debug!("no store context, skipping full sync");
            return Ok(());
        };

        self.publisher.set_status(SyncStatus::Syncing);
        if let Err(error) = self.pull_reference(&store_id).await {
            tracing::warn!(error = %error, "reference pull failed");
            self.publisher.set_error(error.to_string());
            return Err(error);
        }
        self.publisher.set_status(SyncStatus::Idle);

        self.process_queue().await
    }

    async fn pull_reference(&self, store_id: &str) -> Result<()> {
        let catalog = LibSqlCatalogRepository::new(self.db.connection());
        for collection in Collection::REFERENCE {
            let rows = self.remote.fetch(collection, store_id).await?;
            if rows.is_empty() {
                continue;
            }
            let count = catalog.upsert_mirror(collection, &rows).await?;
            tracing::debug!(collection = %collection, count, "synced reference data");
        }
        Ok(())
    }
}

impl<R: RemoteStore + 'static> SyncEngine<R> {
    /// Spawn the steady-state background task: a heartbeat drain, wakeups
    /// from `enqueue`, and connectivity transitions (reconnect triggers a
    /// full sync). The returned guard aborts the task when dropped.
    pub fn spawn_background(self: &Arc<Self>) -> TaskGuard {
        let engine = Arc::clone(self);
        let mut connectivity = engine.connectivity.subscribe();
        TaskGuard::new(tokio::spawn(async move {
            let mut heartbeat = tokio::time::interval(engine.settings.heartbeat_interval());
            heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = heartbeat.tick() => {
                        if engine.connectivity.is_online() && engine.context.profile().is_some() {
                            if let Err(error) = engine.process_queue().await {
                                tracing::warn!(error = %error, "background drain failed");
                            }
                        }
                    }
                    () = engine.signal.drain_requested() => {
                        if engine.connectivity.is_online() {
                            if let Err(error) = engine.process_queue().await {
                                tracing::warn!(error = %error, "drain after enqueue failed");
                            }
                        }
                    }
                    changed = connectivity.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let online = *connectivity.borrow_and_update();
                        engine.publisher.set_online(online);
                        if online {
                            tracing::info!("connectivity restored, running full sync");
                            if let Err(error) = engine.sync_all().await {
                                tracing::warn!(error = %error, "sync after reconnect failed");
                            }
                        }
                    }
                }
            }
        }))
    }
}
