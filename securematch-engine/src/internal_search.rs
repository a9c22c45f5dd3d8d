//! Conjunctive trapdoor search for internal callers.

use crate::elapsed_ms;
use crate::error::{EngineError, EngineResult};
use crate::ingest::{scalar_text, token_prefix};
use crate::types::{FaultKind, InternalSearchResponse, RecordFault};
use securematch_crypto::{CryptoError, DocumentCipher, Tokenizer, normalize};
use securematch_storage::DocumentStore;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Looks up trapdoors in the blind index and decrypts the matches.
pub struct InternalSearch {
    documents: DocumentStore,
    cipher: Arc<DocumentCipher>,
    tokenizer: Arc<Tokenizer>,
    result_cap: usize,
}

impl InternalSearch {
    pub fn new(
        documents: DocumentStore,
        cipher: Arc<DocumentCipher>,
        tokenizer: Arc<Tokenizer>,
        result_cap: usize,
    ) -> Self {
        Self {
            documents,
            cipher,
            tokenizer,
            result_cap,
        }
    }

    /// Returns records matching every `field = value` pair in `query`.
    pub fn search(&self, query: &Map<String, Value>) -> EngineResult<InternalSearchResponse> {
        let started = Instant::now();
        if query.is_empty() {
            return Err(EngineError::InvalidInput("query must name at least one field".into()));
        }

        let mut terms = Vec::with_capacity(query.len());
        for (field, value) in query {
            let text = scalar_text(value).ok_or_else(|| {
                EngineError::InvalidInput(format!(
                    "query value for '{field}' must be a non-null scalar"
                ))
            })?;
            terms.push((field.as_str(), text));
        }

        let matched = self.intersect(&terms)?;
        self.materialize(matched, started, terms.len())
    }

    /// Decrypts up to the cap of `matched`. Records deleted since the index
    /// lookup are dropped from the count.
    fn materialize(
        &self,
        matched: BTreeSet<String>,
        started: Instant,
        fields: usize,
    ) -> EngineResult<InternalSearchResponse> {
        let truncated = matched.len() > self.result_cap;
        let selected: Vec<String> = matched.iter().take(self.result_cap).cloned().collect();
        let fetched = self.documents.get_documents(&selected)?;
        let total_matches = matched.len() - (selected.len() - fetched.len());

        let mut results = Vec::with_capacity(fetched.len());
        let mut faults = Vec::new();
        for record in fetched {
            match self.cipher.decrypt(&record.document) {
                Ok(document) => results.push(document),
                Err(CryptoError::AuthenticationFailure) => faults.push(RecordFault {
                    record_id: record.id,
                    kind: FaultKind::AuthenticationFailure,
                }),
                Err(CryptoError::DeserializationFailure(_)) => faults.push(RecordFault {
                    record_id: record.id,
                    kind: FaultKind::DeserializationFailure,
                }),
                Err(e) => return Err(e.into()),
            }
        }

        if !faults.is_empty() {
            warn!(faults = faults.len(), "matched records failed to decrypt");
        }
        let execution_time_ms = elapsed_ms(started);
        debug!(
            fields,
            total_matches,
            returned = results.len(),
            truncated,
            execution_time_ms,
            "internal search"
        );

        Ok(InternalSearchResponse {
            returned_count: results.len(),
            results,
            total_matches,
            truncated,
            execution_time_ms,
            faults,
        })
    }

    /// Record ids whose index holds every term's trapdoor, in id order.
    fn intersect(&self, terms: &[(&str, String)]) -> EngineResult<BTreeSet<String>> {
        let mut matched: Option<BTreeSet<String>> = None;
        for (field, text) in terms {
            // Empty values are never indexed, so nothing can match them.
            if normalize(text).is_empty() {
                return Ok(BTreeSet::new());
            }
            let trapdoor = self.tokenizer.trapdoor(field, text);
            debug!(field = %field, token = token_prefix(&trapdoor), "trapdoor lookup");

            let ids: BTreeSet<String> = self
                .documents
                .record_ids_for_token(&trapdoor)?
                .into_iter()
                .collect();
            let next = match matched {
                None => ids,
                Some(prev) => prev.intersection(&ids).cloned().collect(),
            };
            if next.is_empty() {
                return Ok(next);
            }
            matched = Some(next);
        }
        Ok(matched.unwrap_or_default())
    }
}
