//! Record ingest: encrypt, tokenize searchable fields, commit atomically.

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::types::{DeleteResponse, IngestResponse};
use chrono::Utc;
use securematch_crypto::{
    CryptoError, Document, DocumentCipher, Tokenizer, keyword_hash, normalize,
};
use securematch_storage::{DocumentStore, EncryptedRecord, IndexEntry};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Builds the blind index as records arrive.
pub struct Indexer {
    documents: DocumentStore,
    cipher: Arc<DocumentCipher>,
    tokenizer: Arc<Tokenizer>,
    config: Arc<EngineConfig>,
}

impl Indexer {
    pub fn new(
        documents: DocumentStore,
        cipher: Arc<DocumentCipher>,
        tokenizer: Arc<Tokenizer>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            documents,
            cipher,
            tokenizer,
            config,
        }
    }

    /// Encrypts `record` and stores it together with one index entry per
    /// searchable field holding a non-empty value.
    pub fn ingest(&self, record: &Value) -> EngineResult<IngestResponse> {
        let document = flat_document(record)?;
        let record_id = Uuid::now_v7().to_string();

        let entries = self.index_entries(&record_id, &document);
        let sealed = self.cipher.encrypt(&document).map_err(|err| match err {
            CryptoError::RecordTooLarge { .. } => EngineError::InvalidInput(err.to_string()),
            err => err.into(),
        })?;
        let encrypted = EncryptedRecord {
            id: record_id.clone(),
            document: sealed,
            created_at: Utc::now().timestamp_millis(),
        };
        self.documents.insert_document(&encrypted, &entries)?;

        info!(record_id = %record_id, index_entries = entries.len(), "record ingested");
        Ok(IngestResponse {
            indexed: true,
            record_id,
            index_entries: entries.len(),
        })
    }

    /// Removes a record and all of its index entries.
    pub fn delete(&self, record_id: &str) -> EngineResult<DeleteResponse> {
        if !self.documents.delete_document(record_id)? {
            return Err(EngineError::DocumentNotFound(record_id.to_string()));
        }
        info!(record_id, "record deleted");
        Ok(DeleteResponse { deleted: true })
    }

    fn index_entries(&self, record_id: &str, document: &Document) -> Vec<IndexEntry> {
        let mut entries = Vec::new();
        for (field, value) in document {
            if !self.config.is_searchable(field) {
                continue;
            }
            let Some(text) = scalar_text(value) else {
                continue;
            };
            if normalize(&text).is_empty() {
                continue;
            }

            let token = self.tokenizer.token(field, &text);
            debug!(field = %field, token = token_prefix(&token), "indexing field");
            entries.push(IndexEntry {
                id: Uuid::now_v7().to_string(),
                record_id: record_id.to_string(),
                token,
                external_token: self
                    .config
                    .is_external(field)
                    .then(|| keyword_hash(&text)),
            });
        }
        entries
    }
}

/// Accepts only a JSON object whose values are all scalars.
pub(crate) fn flat_document(value: &Value) -> EngineResult<Document> {
    let Value::Object(map) = value else {
        return Err(EngineError::InvalidInput(
            "record must be a JSON object".into(),
        ));
    };
    if let Some((field, _)) = map
        .iter()
        .find(|(_, v)| matches!(v, Value::Object(_) | Value::Array(_)))
    {
        return Err(EngineError::InvalidInput(format!(
            "field '{field}' is not a scalar value"
        )));
    }
    Ok(map.clone())
}

/// Text form of a scalar for tokenization. `None` for null and non-scalars.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// First 8 hex chars of a token, for debug logs.
pub(crate) fn token_prefix(token: &str) -> &str {
    token.get(..8).unwrap_or(token)
}
