//! Crypto error types.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur in cipher, tokenizer and signing operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("encryption failed: {0}")]
    Encryption(String),

    /// GCM tag check failed: tampered ciphertext, corrupted nonce or wrong key.
    #[error("authentication failed (wrong key or tampered data)")]
    AuthenticationFailure,

    /// Decryption succeeded but the plaintext is not a valid record.
    #[error("decrypted payload is not a valid record: {0}")]
    DeserializationFailure(String),

    /// The canonical record encoding does not fit in one cipher block.
    #[error("record of {size} bytes exceeds the {max}-byte limit")]
    RecordTooLarge { size: usize, max: usize },

    #[error("invalid record block size: {0}")]
    InvalidBlockSize(usize),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),
}
