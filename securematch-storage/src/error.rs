//! Storage error types.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] duckdb::Error),

    #[error("not found: {0}")]
    NotFound(String),

    /// A conditional auditor update found a different key version than expected.
    #[error("key version conflict for auditor {auditor_id}: expected version {expected}")]
    VersionConflict { auditor_id: String, expected: u32 },

    #[error("integrity violation: {0}")]
    Integrity(String),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("connection lock poisoned")]
    LockPoisoned,
}
