//! Data models for Till

mod catalog;
mod queue;
mod sale;
mod session;
mod store;

pub use catalog::Product;
pub use queue::{Collection, EntryId, QueueEntry, QueueStatus, SyncAction};
pub use sale::{
    PaymentMethod, SaleTransaction, TransactionDetail, TransactionEmployee, TransactionId,
    TransactionStatus,
};
pub use session::{SessionId, SessionStatus, ShiftSession};
pub use store::StoreProfile;

/// Generate a fresh client-side record id (UUID v7, time-sortable).
///
/// The same id is the primary key locally and remotely, which is what makes
/// queue retries idempotent.
#[must_use]
pub fn new_record_id() -> String {
    uuid::Uuid::now_v7().to_string()
}
