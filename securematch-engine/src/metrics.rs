//! Read-only aggregates over the corpus and the search audit log.

use crate::error::EngineResult;
use crate::types::{AuditorLogsResponse, AuditorSnapshot, ExternalMetrics, InternalMetrics};
use chrono::{DateTime, Utc};
use securematch_storage::{AuditStore, AuditorStore, DocumentStore};

pub struct MetricsLedger {
    documents: DocumentStore,
    auditors: AuditorStore,
    audit: AuditStore,
    log_limit: usize,
    window_ms: i64,
}

impl MetricsLedger {
    pub fn new(
        documents: DocumentStore,
        auditors: AuditorStore,
        audit: AuditStore,
        log_limit: usize,
        window_secs: u64,
    ) -> Self {
        Self {
            documents,
            auditors,
            audit,
            log_limit,
            window_ms: i64::try_from(window_secs.saturating_mul(1000)).unwrap_or(i64::MAX),
        }
    }

    /// Most recent attempts by `auditor_id`, newest first. Works for deleted auditors.
    pub fn auditor_logs(&self, auditor_id: &str) -> EngineResult<AuditorLogsResponse> {
        Ok(AuditorLogsResponse {
            auditor_id: auditor_id.to_string(),
            logs: self.audit.recent_for_auditor(auditor_id, self.log_limit)?,
        })
    }

    pub fn internal_metrics(&self) -> EngineResult<InternalMetrics> {
        let since = Utc::now().timestamp_millis().saturating_sub(self.window_ms);

        let auditors = self
            .auditors
            .list()?
            .into_iter()
            .map(|a| AuditorSnapshot {
                created_at: from_millis(a.created_at),
                auditor_id: a.id,
                name: a.name,
                active_key_version: a.key_version,
            })
            .collect();

        Ok(InternalMetrics {
            total_documents: self.documents.count_documents()?,
            total_tokens: self.documents.count_index_entries()?,
            external_tokens: self.documents.count_external_tokens()?,
            external_searches_last_24h: self.audit.count_since(since, true)?,
            failed_external_searches_last_24h: self.audit.count_since(since, false)?,
            avg_external_search_ms: self.audit.average_success_latency_ms()?.unwrap_or(0.0),
            last_index_update: self.documents.last_ingest_at()?.map(from_millis),
            auditors,
        })
    }

    pub fn external_metrics(&self) -> EngineResult<ExternalMetrics> {
        Ok(ExternalMetrics {
            total_documents: self.documents.count_documents()?,
        })
    }
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}
