//! Process-lifetime key holder.

use crate::error::{CryptoError, CryptoResult};
use std::fmt;
use zeroize::Zeroizing;

/// Size of the AES-256 encryption key, and the minimum tokenization key size.
pub const KEY_SIZE: usize = 32;

/// The two symmetric keys derived by the key-management service.
///
/// Constructed once at startup and passed by reference (usually inside an
/// `Arc`) to every component that needs key material. Bytes are wiped on drop.
pub struct SearchKeys {
    encryption_key: Zeroizing<[u8; KEY_SIZE]>,
    tokenization_key: Zeroizing<Vec<u8>>,
}

impl SearchKeys {
    /// Builds a key holder from opaque derived key bytes.
    ///
    /// The encryption key must be exactly 32 bytes; the tokenization key at
    /// least 32 bytes.
    pub fn new(encryption_key: &[u8], tokenization_key: &[u8]) -> CryptoResult<Self> {
        if encryption_key.len() != KEY_SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: KEY_SIZE,
                actual: encryption_key.len(),
            });
        }
        if tokenization_key.len() < KEY_SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: KEY_SIZE,
                actual: tokenization_key.len(),
            });
        }

        let mut enc = Zeroizing::new([0u8; KEY_SIZE]);
        enc.copy_from_slice(encryption_key);

        Ok(Self {
            encryption_key: enc,
            tokenization_key: Zeroizing::new(tokenization_key.to_vec()),
        })
    }

    pub(crate) fn encryption_key(&self) -> &[u8; KEY_SIZE] {
        &self.encryption_key
    }

    pub(crate) fn tokenization_key(&self) -> &[u8] {
        &self.tokenization_key
    }
}

impl fmt::Debug for SearchKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchKeys")
            .field("encryption_key", &"[REDACTED]")
            .field("tokenization_key", &"[REDACTED]")
            .finish()
    }
}
