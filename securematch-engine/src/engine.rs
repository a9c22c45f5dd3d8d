//! The [`SearchEngine`] facade: every operation a transport layer exposes.

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::gateway::ExternalSearchGateway;
use crate::ingest::Indexer;
use crate::internal_search::InternalSearch;
use crate::metrics::MetricsLedger;
use crate::registry::AuditorRegistry;
use crate::types::{
    AuditorLogsResponse, CreateAuditorResponse, DeleteResponse, ExternalMetrics,
    ExternalSearchRequest, ExternalSearchResponse, IngestResponse, InternalMetrics,
    InternalSearchResponse, RotateKeyResponse,
};
use securematch_crypto::{DocumentCipher, SearchKeys, Tokenizer};
use securematch_storage::{
    AuditStore, AuditorRecord, AuditorStore, DocumentStore, SharedConnection, open_shared,
    open_shared_in_memory,
};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Searchable-encryption engine over one DuckDB database.
///
/// Key material is consumed once at construction; the cipher and tokenizer
/// built from it are shared read-only by every component.
pub struct SearchEngine {
    config: Arc<EngineConfig>,
    indexer: Indexer,
    internal: InternalSearch,
    registry: AuditorRegistry,
    gateway: ExternalSearchGateway,
    ledger: MetricsLedger,
}

impl SearchEngine {
    /// Opens or creates a file-backed engine.
    pub fn open(path: &Path, config: EngineConfig, keys: &SearchKeys) -> EngineResult<Self> {
        config.validate()?;
        let conn = open_shared(path, &config.memory_limit, config.threads)?;
        info!(path = %path.display(), "opening search engine");
        Self::open_with_conn(conn, config, keys)
    }

    /// Opens an in-memory engine (for testing).
    pub fn open_in_memory(config: EngineConfig, keys: &SearchKeys) -> EngineResult<Self> {
        Self::open_with_conn(open_shared_in_memory()?, config, keys)
    }

    /// Opens on an existing shared connection.
    pub fn open_with_conn(
        conn: SharedConnection,
        config: EngineConfig,
        keys: &SearchKeys,
    ) -> EngineResult<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let cipher = Arc::new(DocumentCipher::with_block_size(keys, config.record_block_size)?);
        let slot_ciphertext_len = cipher.ciphertext_len();
        let tokenizer = Arc::new(Tokenizer::new(keys)?);

        let documents = DocumentStore::open_with_conn(conn.clone())?;
        let auditors = AuditorStore::open_with_conn(conn.clone())?;
        let audit = AuditStore::open_with_conn(conn)?;

        Ok(Self {
            indexer: Indexer::new(
                documents.clone(),
                cipher.clone(),
                tokenizer.clone(),
                config.clone(),
            ),
            internal: InternalSearch::new(
                documents.clone(),
                cipher,
                tokenizer,
                config.internal_result_cap,
            ),
            registry: AuditorRegistry::new(auditors.clone()),
            gateway: ExternalSearchGateway::new(
                documents.clone(),
                auditors.clone(),
                audit.clone(),
                config.external_result_cap,
                slot_ciphertext_len,
                config.recent_search_window_secs,
            ),
            ledger: MetricsLedger::new(
                documents,
                auditors,
                audit,
                config.auditor_log_limit,
                config.metrics_window_secs,
            ),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ── Records ──────────────────────────────────────────────────

    pub fn ingest(&self, record: &Value) -> EngineResult<IngestResponse> {
        self.indexer.ingest(record)
    }

    pub fn delete_document(&self, record_id: &str) -> EngineResult<DeleteResponse> {
        self.indexer.delete(record_id)
    }

    pub fn internal_search(
        &self,
        query: &Map<String, Value>,
    ) -> EngineResult<InternalSearchResponse> {
        self.internal.search(query)
    }

    pub fn external_search(
        &self,
        request: &ExternalSearchRequest,
    ) -> EngineResult<ExternalSearchResponse> {
        self.gateway.search(request)
    }

    // ── Auditors ─────────────────────────────────────────────────

    pub fn create_auditor(&self, name: &str) -> EngineResult<CreateAuditorResponse> {
        self.registry.create(name)
    }

    pub fn get_auditor(&self, auditor_id: &str) -> EngineResult<AuditorRecord> {
        self.registry.get(auditor_id)
    }

    pub fn list_auditors(&self) -> EngineResult<Vec<AuditorRecord>> {
        self.registry.list()
    }

    pub fn rotate_auditor_key(
        &self,
        auditor_id: &str,
        new_public_key: Option<&str>,
    ) -> EngineResult<RotateKeyResponse> {
        self.registry.rotate(auditor_id, new_public_key)
    }

    pub fn delete_auditor(&self, auditor_id: &str) -> EngineResult<DeleteResponse> {
        self.registry.delete(auditor_id)
    }

    // ── Audit & metrics ──────────────────────────────────────────

    pub fn auditor_logs(&self, auditor_id: &str) -> EngineResult<AuditorLogsResponse> {
        self.ledger.auditor_logs(auditor_id)
    }

    pub fn internal_metrics(&self) -> EngineResult<InternalMetrics> {
        self.ledger.internal_metrics()
    }

    pub fn external_metrics(&self) -> EngineResult<ExternalMetrics> {
        self.ledger.external_metrics()
    }
}
