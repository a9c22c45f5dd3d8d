//! Deterministic, field-bound tokenization for the blind index.
//!
//! `token(field, value) = hex(HMAC-SHA256(tokenization_key, field ":" normalize(value)))`
//!
//! The field name is part of the MAC input, so equal values under different
//! fields produce unrelated tokens and an index built for one field cannot be
//! searched with a token computed for another.
//!
//! [`keyword_hash`] is the separate external token space: a plain SHA-256 of
//! the normalized keyword that an auditor can compute without any key.

use crate::error::CryptoResult;
use crate::keys::SearchKeys;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Length of a hex-encoded SHA-256 digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// Trims surrounding whitespace and lowercases.
pub fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Key-independent external token: `hex(SHA-256(normalize(value)))`.
pub fn keyword_hash(value: &str) -> String {
    hex::encode(Sha256::digest(normalize(value).as_bytes()))
}

/// Whether `candidate` has the shape of a keyword hash (64 lowercase hex chars).
pub fn is_keyword_hash(candidate: &str) -> bool {
    candidate.len() == DIGEST_HEX_LEN
        && candidate
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Keyed tokenizer producing index tokens and search trapdoors.
#[derive(Clone)]
pub struct Tokenizer {
    mac: HmacSha256,
}

impl Tokenizer {
    pub fn new(keys: &SearchKeys) -> CryptoResult<Self> {
        // HMAC accepts keys of any length; SearchKeys already enforces the minimum.
        let mac = <HmacSha256 as Mac>::new_from_slice(keys.tokenization_key()).map_err(|_| {
            crate::CryptoError::InvalidKeyLength {
                expected: crate::KEY_SIZE,
                actual: keys.tokenization_key().len(),
            }
        })?;
        Ok(Self { mac })
    }

    /// Index token for a (field, value) pair, as lowercase hex.
    pub fn token(&self, field: &str, value: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(field.as_bytes());
        mac.update(b":");
        mac.update(normalize(value).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Search trapdoor for a (field, value) pair.
    ///
    /// Intentionally the same function as [`Tokenizer::token`]: the trapdoor
    /// must equal the token stored at ingest for equality lookup to work.
    pub fn trapdoor(&self, field: &str, value: &str) -> String {
        self.token(field, value)
    }
}
