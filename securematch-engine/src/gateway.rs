//! Signature-gated search for external auditors.
//!
//! Auditors never see plaintext. They prove knowledge of a keyword by signing
//! its hash, and receive the matching records' nonce and ciphertext padded to
//! a fixed number of slots, so response size says nothing about match count.
//! Every attempt that gets past auditor lookup is written to the audit log,
//! including rejected signatures.

use crate::elapsed_ms;
use crate::error::{EngineError, EngineResult};
use crate::ingest::token_prefix;
use crate::types::{ExternalSearchRequest, ExternalSearchResponse, ResultSlot};
use chrono::Utc;
use securematch_crypto::{is_keyword_hash, parse_public_key, verify_keyword_signature};
use securematch_storage::{
    AuditStore, AuditorRecord, AuditorStore, DocumentStore, SearchAuditRecord,
};
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub struct ExternalSearchGateway {
    documents: DocumentStore,
    auditors: AuditorStore,
    audit: AuditStore,
    result_cap: usize,
    slot_ciphertext_len: usize,
    recent_window_ms: i64,
}

/// Counts and timings of one attempt, as written to the audit log.
struct Attempt {
    total_matches: usize,
    returned_count: usize,
    truncated: bool,
    execution_time_ms: f64,
    signature_verification_ms: f64,
    success: bool,
}

impl ExternalSearchGateway {
    pub fn new(
        documents: DocumentStore,
        auditors: AuditorStore,
        audit: AuditStore,
        result_cap: usize,
        slot_ciphertext_len: usize,
        recent_window_secs: u64,
    ) -> Self {
        Self {
            documents,
            auditors,
            audit,
            result_cap,
            slot_ciphertext_len,
            recent_window_ms: i64::try_from(recent_window_secs.saturating_mul(1000))
                .unwrap_or(i64::MAX),
        }
    }

    pub fn search(&self, request: &ExternalSearchRequest) -> EngineResult<ExternalSearchResponse> {
        let started = Instant::now();
        if !is_keyword_hash(&request.keyword_hash) {
            return Err(EngineError::InvalidInput(
                "keyword hash must be 64 lowercase hex characters".into(),
            ));
        }

        let auditor = self
            .auditors
            .get(&request.auditor_id)?
            .ok_or_else(|| EngineError::AuditorNotFound(request.auditor_id.clone()))?;
        let public_key = parse_public_key(&auditor.public_key)?;

        let verify_started = Instant::now();
        let verified =
            verify_keyword_signature(&public_key, &request.keyword_hash, &request.signature);
        let signature_verification_ms = elapsed_ms(verify_started);

        if verified.is_err() {
            let audit_log_id = self.record(
                &auditor,
                &request.keyword_hash,
                &Attempt {
                    total_matches: 0,
                    returned_count: 0,
                    truncated: false,
                    execution_time_ms: elapsed_ms(started),
                    signature_verification_ms,
                    success: false,
                },
            )?;
            warn!(
                auditor_id = %auditor.id,
                key_version = auditor.key_version,
                audit_log_id = %audit_log_id,
                "external search signature rejected"
            );
            return Err(EngineError::SignatureInvalid {
                audit_log_id,
                key_version: auditor.key_version,
            });
        }

        debug!(
            auditor_id = %auditor.id,
            keyword = token_prefix(&request.keyword_hash),
            "external token lookup"
        );
        let matched = self
            .documents
            .record_ids_for_external_token(&request.keyword_hash)?;
        let total_matches = matched.len();
        let truncated = total_matches > self.result_cap;
        let selected = &matched[..total_matches.min(self.result_cap)];

        let mut results: Vec<ResultSlot> = self
            .documents
            .get_documents(selected)?
            .iter()
            .map(ResultSlot::matched)
            .collect();
        let returned_count = results.len();
        results.resize_with(self.result_cap, || ResultSlot::padding(self.slot_ciphertext_len));

        let since = Utc::now().timestamp_millis().saturating_sub(self.recent_window_ms);
        let searches_last_hour = self.audit.count_for_auditor_since(&auditor.id, since)?;

        let execution_time_ms = elapsed_ms(started);
        let audit_log_id = self.record(
            &auditor,
            &request.keyword_hash,
            &Attempt {
                total_matches,
                returned_count,
                truncated,
                execution_time_ms,
                signature_verification_ms,
                success: true,
            },
        )?;

        info!(
            auditor_id = %auditor.id,
            total_matches,
            returned_count,
            truncated,
            execution_time_ms,
            "external search"
        );
        Ok(ExternalSearchResponse {
            results,
            total_matches,
            returned_count,
            truncated,
            execution_time_ms,
            signature_verification_ms,
            audit_log_id,
            searches_last_hour,
            key_version_used: auditor.key_version,
        })
    }

    fn record(
        &self,
        auditor: &AuditorRecord,
        keyword_hash: &str,
        attempt: &Attempt,
    ) -> EngineResult<String> {
        let record = SearchAuditRecord {
            id: Uuid::now_v7().to_string(),
            auditor_id: auditor.id.clone(),
            keyword_hash: keyword_hash.to_string(),
            total_matches: attempt.total_matches as u64,
            returned_count: attempt.returned_count as u64,
            truncated: attempt.truncated,
            execution_time_ms: attempt.execution_time_ms,
            signature_verification_ms: attempt.signature_verification_ms,
            success: attempt.success,
            key_version: auditor.key_version,
            created_at: Utc::now().timestamp_millis(),
        };
        self.audit.append(&record)?;
        Ok(record.id)
    }
}
