//! Row types persisted by the stores. Timestamps are Unix milliseconds.

use securematch_crypto::EncryptedDocument;
use serde::{Deserialize, Serialize};

/// An encrypted document. Never re-encrypted or updated in place.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptedRecord {
    pub id: String,
    pub document: EncryptedDocument,
    pub created_at: i64,
}

/// One blind-index row for a (record, searchable field) pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexEntry {
    pub id: String,
    pub record_id: String,
    /// Field-bound HMAC token (hex).
    pub token: String,
    /// Keyword hash an auditor can compute without the tokenization key.
    pub external_token: Option<String>,
}

/// An auditor with its single active public key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditorRecord {
    pub id: String,
    pub name: String,
    /// Hex-encoded Ed25519 public key.
    pub public_key: String,
    /// Starts at 1 and increases by exactly one per rotation.
    pub key_version: u32,
    pub created_at: i64,
    pub rotated_at: Option<i64>,
}

/// One external search attempt, successful or not.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchAuditRecord {
    pub id: String,
    /// Kept after the auditor is deleted.
    pub auditor_id: String,
    pub keyword_hash: String,
    pub total_matches: u64,
    pub returned_count: u64,
    pub truncated: bool,
    pub execution_time_ms: f64,
    pub signature_verification_ms: f64,
    pub success: bool,
    pub key_version: u32,
    pub created_at: i64,
}
