//! Local durable store for Till
//!
//! The on-device libSQL database exclusively owns local state: reference
//! mirrors, locally originated sales, shift sessions, and the outbound sync
//! queue. Components mutate it only through the repositories here.

mod catalog_repository;
mod connection;
mod migrations;
mod queue_repository;
mod sales_repository;
mod session_repository;
mod settings_repository;

pub use catalog_repository::{CatalogRepository, LibSqlCatalogRepository};
pub use connection::Database;
pub use queue_repository::{LibSqlQueueRepository, QueueRepository};
pub use sales_repository::{LibSqlSalesRepository, SalesRepository};
pub use session_repository::{LibSqlSessionRepository, SessionRepository};
pub use settings_repository::{LibSqlSettingsRepository, SettingsRepository};
