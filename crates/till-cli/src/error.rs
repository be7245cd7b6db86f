use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] till_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Queue entry ID is not valid: {0}")]
    InvalidEntryId(String),
    #[error("Queue entry not found or not failed: {0}")]
    EntryNotRetriable(String),
    #[error("No store profile configured. Run `till store set --id <ID> --name <NAME>` first.")]
    NotSignedIn,
    #[error(
        "Sync is not configured. Pass --endpoint or set TILL_SYNC_ENDPOINT to the proxy URL."
    )]
    SyncNotConfigured,
}
