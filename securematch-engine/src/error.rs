//! Engine error taxonomy.

use securematch_crypto::CryptoError;
use securematch_storage::StorageError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors returned by [`crate::SearchEngine`] operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("auditor not found: {0}")]
    AuditorNotFound(String),

    #[error("document not found: {0}")]
    DocumentNotFound(String),

    /// The search attempt was audited as `audit_log_id` before this was returned.
    #[error("signature verification failed")]
    SignatureInvalid { audit_log_id: String, key_version: u32 },

    #[error("key rotation conflict for auditor {0}")]
    RotationConflict(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// Storage or crypto failure. The message is fixed; the
    /// cause is only reachable through `source()`.
    #[error("internal error")]
    Internal(#[source] InternalFault),
}

/// Underlying cause of [`EngineError::Internal`].
#[derive(Debug, Error)]
pub enum InternalFault {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl From<StorageError> for EngineError {
    fn from(err: StorageError) -> Self {
        EngineError::Internal(err.into())
    }
}

impl From<CryptoError> for EngineError {
    fn from(err: CryptoError) -> Self {
        EngineError::Internal(err.into())
    }
}

impl EngineError {
    /// Status code a transport layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            EngineError::InvalidInput(_) => 400,
            EngineError::SignatureInvalid { .. } => 403,
            EngineError::AuditorNotFound(_) | EngineError::DocumentNotFound(_) => 404,
            EngineError::RotationConflict(_) => 409,
            EngineError::Config(_) | EngineError::Internal(_) => 500,
        }
    }
}
