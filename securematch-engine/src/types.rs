//! Request and response types for engine operations.

use chrono::{DateTime, Utc};
use securematch_crypto::{Document, NONCE_SIZE};
use securematch_storage::{EncryptedRecord, SearchAuditRecord};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub indexed: bool,
    pub record_id: String,
    pub index_entries: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub deleted: bool,
}

/// Why a matched record could not be returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaultKind {
    /// GCM tag check failed: tampering, corruption or a key mismatch.
    AuthenticationFailure,
    /// Decrypted bytes were not a record.
    DeserializationFailure,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFault {
    pub record_id: String,
    pub kind: FaultKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalSearchResponse {
    pub results: Vec<Document>,
    pub total_matches: usize,
    pub returned_count: usize,
    pub truncated: bool,
    pub execution_time_ms: f64,
    /// Matched records that failed to decrypt. Counted in `total_matches`.
    pub faults: Vec<RecordFault>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalSearchRequest {
    pub auditor_id: String,
    /// Lowercase hex SHA-256 of the normalized keyword.
    pub keyword_hash: String,
    /// Hex Ed25519 signature over the `keyword_hash` string.
    pub signature: String,
}

/// One slot of an external response: a real match or padding.
///
/// Real and padding slots serialize to the same number of bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSlot {
    /// Hex nonce.
    pub nonce: String,
    /// Hex ciphertext including the GCM tag.
    pub ciphertext: String,
    /// Encoded as `0` or `1` so both values have the same width.
    #[serde(with = "slot_flag")]
    pub padded: bool,
}

impl ResultSlot {
    pub(crate) fn matched(record: &EncryptedRecord) -> Self {
        Self {
            nonce: hex::encode(record.document.nonce),
            ciphertext: hex::encode(&record.document.ciphertext),
            padded: false,
        }
    }

    /// Zero nonce and `ciphertext_len` zero bytes of ciphertext.
    pub(crate) fn padding(ciphertext_len: usize) -> Self {
        Self {
            nonce: hex::encode([0u8; NONCE_SIZE]),
            ciphertext: "0".repeat(2 * ciphertext_len),
            padded: true,
        }
    }
}

mod slot_flag {
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(padded: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*padded))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        match u8::deserialize(deserializer)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(de::Error::custom(format!("invalid padding flag {other}"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalSearchResponse {
    /// Always exactly the configured external cap long.
    pub results: Vec<ResultSlot>,
    pub total_matches: usize,
    pub returned_count: usize,
    pub truncated: bool,
    pub execution_time_ms: f64,
    pub signature_verification_ms: f64,
    pub audit_log_id: String,
    pub searches_last_hour: u64,
    pub key_version_used: u32,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAuditorResponse {
    pub auditor_id: String,
    pub public_key: String,
    /// Returned once, never stored.
    pub private_key: String,
    pub key_version: u32,
}

impl fmt::Debug for CreateAuditorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateAuditorResponse")
            .field("auditor_id", &self.auditor_id)
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .field("key_version", &self.key_version)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotateKeyResponse {
    pub auditor_id: String,
    pub new_public_key: String,
    /// Present only when the keypair was generated here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_private_key: Option<String>,
    pub new_key_version: u32,
}

impl fmt::Debug for RotateKeyResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RotateKeyResponse")
            .field("auditor_id", &self.auditor_id)
            .field("new_public_key", &self.new_public_key)
            .field(
                "new_private_key",
                &self.new_private_key.as_ref().map(|_| "<redacted>"),
            )
            .field("new_key_version", &self.new_key_version)
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditorLogsResponse {
    pub auditor_id: String,
    /// Newest first.
    pub logs: Vec<SearchAuditRecord>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditorSnapshot {
    pub auditor_id: String,
    pub name: String,
    pub active_key_version: u32,
    pub created_at: DateTime<Utc>,
}

/// Operator-facing aggregates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InternalMetrics {
    pub total_documents: u64,
    pub total_tokens: u64,
    pub external_tokens: u64,
    pub external_searches_last_24h: u64,
    pub failed_external_searches_last_24h: u64,
    pub avg_external_search_ms: f64,
    pub last_index_update: Option<DateTime<Utc>>,
    pub auditors: Vec<AuditorSnapshot>,
}

/// The only figures exposed to external parties.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalMetrics {
    pub total_documents: u64,
}
