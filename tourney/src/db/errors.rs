//! Storage error types.

use std::time::Duration;
use thiserror::Error;

/// Errors raised by storage collaborators
///
/// These are wrapped, never interpreted, by the tournament core.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Database migration error
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Column payload could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored value does not map onto a domain type
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    /// Value does not fit its column
    #[error("Value out of range: {0}")]
    OutOfRange(String),

    /// Operation exceeded its deadline
    #[error("Store operation timed out after {0:?}")]
    Timeout(Duration),

    /// Caller cancelled the operation
    #[error("Store operation cancelled")]
    Cancelled,

    /// Store refused the operation
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;
