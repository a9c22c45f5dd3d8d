//! Cryptographic core for SecureMatch searchable encryption.
//!
//! Provides:
//! - AES-256-GCM encryption of whole document records
//! - HMAC-SHA256 field-bound tokens for the blind index
//! - Key-independent keyword hashes for auditor (external) search
//! - Ed25519 auditor keypairs and keyword-hash signature verification
//!
//! # Architecture
//!
//! Two symmetric keys are supplied by an external key-management service:
//!
//! 1. **Encryption Key**: 32 bytes, used by [`DocumentCipher`] for every
//!    record. Each encryption call draws a fresh random 96-bit nonce, and
//!    every record is padded to the same block size so ciphertext length
//!    says nothing about record content.
//!
//! 2. **Tokenization Key**: used by [`Tokenizer`] to derive deterministic
//!    index tokens and search trapdoors.
//!
//! Both live in a single [`SearchKeys`] holder that is built once at startup
//! and shared behind an `Arc`. Key bytes are zeroized on drop and never
//! appear in `Debug` output.

mod cipher;
mod error;
mod keys;
pub mod signing;
pub mod tokenizer;

pub use cipher::{
    DEFAULT_RECORD_BLOCK, Document, DocumentCipher, EncryptedDocument, MIN_RECORD_BLOCK, NONCE_SIZE,
    TAG_SIZE,
};
pub use error::{CryptoError, CryptoResult};
pub use keys::{KEY_SIZE, SearchKeys};
pub use signing::{AuditorKeyPair, parse_public_key, verify_keyword_signature};
pub use tokenizer::{Tokenizer, is_keyword_hash, keyword_hash, normalize};
