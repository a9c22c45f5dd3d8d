//! Authenticated encryption of document records with AES-256-GCM.

use crate::error::{CryptoError, CryptoResult};
use crate::keys::SearchKeys;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// GCM nonce size (96 bits).
pub const NONCE_SIZE: usize = 12;

/// GCM authentication tag size, appended to every ciphertext.
pub const TAG_SIZE: usize = 16;

/// Default plaintext block every record is padded to before encryption.
pub const DEFAULT_RECORD_BLOCK: usize = 2048;

/// Big-endian `u32` body length at the start of each block.
const LENGTH_PREFIX: usize = 4;

/// Smallest accepted block size.
pub const MIN_RECORD_BLOCK: usize = 64;

/// A flat document record: top-level field name to JSON value.
///
/// `serde_json::Map` keeps keys sorted, so serializing a record always
/// yields the same canonical bytes.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Output of a single encryption call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedDocument {
    /// Random nonce, unique per encryption call.
    pub nonce: [u8; NONCE_SIZE],
    /// AES-256-GCM ciphertext with the tag appended.
    pub ciphertext: Vec<u8>,
}

/// Encrypts and decrypts document records with the process encryption key.
///
/// Records are serialized canonically, prefixed with their length and
/// zero-padded to a fixed block, so every record ciphertext has the same
/// length ([`DocumentCipher::ciphertext_len`]). No associated data is bound
/// to the ciphertext.
#[derive(Clone)]
pub struct DocumentCipher {
    cipher: Aes256Gcm,
    block_size: usize,
}

impl DocumentCipher {
    /// Cipher with the [`DEFAULT_RECORD_BLOCK`] block size.
    pub fn new(keys: &SearchKeys) -> CryptoResult<Self> {
        Self::with_block_size(keys, DEFAULT_RECORD_BLOCK)
    }

    /// Cipher padding every record to `block_size` plaintext bytes.
    ///
    /// The block size must stay the same for the lifetime of a database.
    pub fn with_block_size(keys: &SearchKeys, block_size: usize) -> CryptoResult<Self> {
        if block_size < MIN_RECORD_BLOCK || u32::try_from(block_size).is_err() {
            return Err(CryptoError::InvalidBlockSize(block_size));
        }
        let cipher = Aes256Gcm::new_from_slice(keys.encryption_key()).map_err(|_| {
            CryptoError::InvalidKeyLength {
                expected: crate::KEY_SIZE,
                actual: keys.encryption_key().len(),
            }
        })?;
        Ok(Self { cipher, block_size })
    }

    /// Length of every ciphertext [`DocumentCipher::encrypt`] produces.
    pub fn ciphertext_len(&self) -> usize {
        self.block_size + TAG_SIZE
    }

    /// Largest canonical record encoding that fits in one block.
    pub fn max_record_len(&self) -> usize {
        self.block_size - LENGTH_PREFIX
    }

    /// Serializes a record canonically, pads it to the block size and
    /// encrypts it under a fresh nonce.
    ///
    /// Fails with [`CryptoError::RecordTooLarge`] when the encoding does not
    /// fit in one block.
    pub fn encrypt(&self, record: &Document) -> CryptoResult<EncryptedDocument> {
        let body = Zeroizing::new(
            serde_json::to_vec(record).map_err(|e| CryptoError::Serialization(e.to_string()))?,
        );
        if body.len() > self.max_record_len() {
            return Err(CryptoError::RecordTooLarge {
                size: body.len(),
                max: self.max_record_len(),
            });
        }

        let mut block = Zeroizing::new(Vec::with_capacity(self.block_size));
        // block_size fits in u32, checked at construction.
        block.extend_from_slice(&(body.len() as u32).to_be_bytes());
        block.extend_from_slice(&body);
        block.resize(self.block_size, 0);
        self.encrypt_bytes(&block)
    }

    /// Decrypts a block and deserializes the record inside it.
    ///
    /// Returns [`CryptoError::AuthenticationFailure`] when the tag does not
    /// verify and [`CryptoError::DeserializationFailure`] when the block is
    /// malformed or its body is not a JSON object.
    pub fn decrypt(&self, encrypted: &EncryptedDocument) -> CryptoResult<Document> {
        let block = Zeroizing::new(self.decrypt_bytes(encrypted)?);
        let body = unframe(&block)?;
        let value: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| CryptoError::DeserializationFailure(e.to_string()))?;
        match value {
            serde_json::Value::Object(map) => Ok(map),
            other => Err(CryptoError::DeserializationFailure(format!(
                "expected object, found {}",
                json_kind(&other)
            ))),
        }
    }

    /// Encrypts raw bytes under a fresh random nonce.
    pub fn encrypt_bytes(&self, plaintext: &[u8]) -> CryptoResult<EncryptedDocument> {
        let mut nonce = [0u8; NONCE_SIZE];
        rand::rng().fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| CryptoError::Encryption(format!("AES-GCM encrypt failed: {e}")))?;

        Ok(EncryptedDocument { nonce, ciphertext })
    }

    /// Decrypts raw bytes, verifying the GCM tag.
    pub fn decrypt_bytes(&self, encrypted: &EncryptedDocument) -> CryptoResult<Vec<u8>> {
        self.cipher
            .decrypt(
                Nonce::from_slice(&encrypted.nonce),
                encrypted.ciphertext.as_ref(),
            )
            .map_err(|_| CryptoError::AuthenticationFailure)
    }
}

fn unframe(block: &[u8]) -> CryptoResult<&[u8]> {
    let (prefix, rest) = block.split_first_chunk::<LENGTH_PREFIX>().ok_or_else(|| {
        CryptoError::DeserializationFailure("block shorter than length prefix".into())
    })?;
    let body_len = u32::from_be_bytes(*prefix) as usize;
    rest.get(..body_len).ok_or_else(|| {
        CryptoError::DeserializationFailure(format!(
            "length prefix {body_len} exceeds block of {} bytes",
            rest.len()
        ))
    })
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
