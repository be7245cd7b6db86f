//! Sync queue entry model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;
use crate::util::rfc3339_now;

/// A unique identifier for a queue entry, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(Uuid);

impl EntryId {
    /// Create a new unique entry ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntryId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// The mutation a queue entry intends against the remote store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    Create,
    Update,
    Delete,
}

impl SyncAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl FromStr for SyncAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(Error::InvalidInput(format!("unknown sync action: {other}"))),
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of remote collections the sync layer may touch.
///
/// Unknown collection names are rejected at the boundary with a typed error
/// instead of flowing through as raw strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Products,
    Categories,
    Customers,
    Users,
    Shifts,
    ShiftSessions,
    Transactions,
    TransactionDetails,
    TransactionEmployees,
    SyncQueue,
    StoreSettings,
    ActivityLogs,
}

impl Collection {
    /// Reference-data collections mirrored locally by the periodic pull.
    pub const REFERENCE: [Self; 5] = [
        Self::Products,
        Self::Categories,
        Self::Customers,
        Self::Users,
        Self::Shifts,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Products => "products",
            Self::Categories => "categories",
            Self::Customers => "customers",
            Self::Users => "users",
            Self::Shifts => "shifts",
            Self::ShiftSessions => "shift_sessions",
            Self::Transactions => "transactions",
            Self::TransactionDetails => "transaction_details",
            Self::TransactionEmployees => "transaction_employees",
            Self::SyncQueue => "sync_queue",
            Self::StoreSettings => "store_settings",
            Self::ActivityLogs => "activity_logs",
        }
    }
}

impl FromStr for Collection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "products" => Ok(Self::Products),
            "categories" => Ok(Self::Categories),
            "customers" => Ok(Self::Customers),
            "users" => Ok(Self::Users),
            "shifts" => Ok(Self::Shifts),
            "shift_sessions" => Ok(Self::ShiftSessions),
            "transactions" => Ok(Self::Transactions),
            "transaction_details" => Ok(Self::TransactionDetails),
            "transaction_employees" => Ok(Self::TransactionEmployees),
            "sync_queue" => Ok(Self::SyncQueue),
            "store_settings" => Ok(Self::StoreSettings),
            "activity_logs" => Ok(Self::ActivityLogs),
            other => Err(Error::UnknownCollection(other.to_string())),
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Queue entry lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Pending,
    Processing,
    Failed,
    Completed,
}

impl QueueStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Failed => "failed",
            Self::Completed => "completed",
        }
    }
}

impl FromStr for QueueStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "failed" => Ok(Self::Failed),
            "completed" => Ok(Self::Completed),
            other => Err(Error::InvalidInput(format!("unknown queue status: {other}"))),
        }
    }
}

/// One durable intent to mutate a named remote collection.
///
/// `payload` is the full record snapshot at enqueue time, not a diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: EntryId,
    pub action: SyncAction,
    pub collection: Collection,
    pub record_id: String,
    pub payload: serde_json::Value,
    pub created_at: String,
    pub retry_count: u32,
    pub last_error: Option<String>,
    pub status: QueueStatus,
}

impl QueueEntry {
    /// Create a fresh pending entry with a new id and the current timestamp
    #[must_use]
    pub fn new(
        action: SyncAction,
        collection: Collection,
        record_id: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: EntryId::new(),
            action,
            collection,
            record_id: record_id.into(),
            payload,
            created_at: rfc3339_now(),
            retry_count: 0,
            last_error: None,
            status: QueueStatus::Pending,
        }
    }

    /// Drain priority: transaction creates first, then their children,
    /// everything else behind them.
    #[must_use]
    pub const fn priority(&self) -> u8 {
        match (self.action, self.collection) {
            (SyncAction::Create, Collection::Transactions) => 1,
            (SyncAction::Create, Collection::TransactionDetails) => 2,
            (SyncAction::Create, Collection::TransactionEmployees) => 3,
            _ => 10,
        }
    }

    /// The parent transaction id this entry must wait for, if any.
    ///
    /// Only child creates (`transaction_details` / `transaction_employees`)
    /// are gated; everything else syncs independently.
    #[must_use]
    pub fn gating_parent(&self) -> Option<String> {
        if self.action != SyncAction::Create {
            return None;
        }
        match self.collection {
            Collection::TransactionDetails | Collection::TransactionEmployees => self
                .payload
                .get("transaction_id")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string),
            _ => None,
        }
    }
}
