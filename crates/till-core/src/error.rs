//! Error types for till-core

use thiserror::Error;

/// Result type alias using till-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in till-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote proxy rejected or failed the request
    #[error("Remote error: {0}")]
    Remote(String),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input (validation failure, rejected before any write)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No store context resolved (remote calls require a store id)
    #[error("No store context resolved; sign in to a store before syncing")]
    MissingStoreContext,

    /// Collection name outside the sync allow-list
    #[error("Unknown collection: {0}")]
    UnknownCollection(String),
}
