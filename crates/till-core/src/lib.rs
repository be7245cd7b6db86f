//! till-core - Core library for Till
//!
//! This crate contains the shared models, the local durable store, and the
//! offline-first sync subsystem used by all Till interfaces. Point-of-sale
//! operations commit to the local store immediately and are reconciled with
//! the remote store exactly once by the sync engine, in dependency order.

pub mod checkout;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod sync;
pub mod util;

pub use checkout::Checkout;
pub use config::{StoreContext, SyncSettings};
pub use error::{Error, Result};
pub use models::{Collection, QueueEntry, SyncAction};
pub use sync::{ConnectivityMonitor, SyncEngine, SyncQueue, SyncState, SyncStatus};
