//! Searchable-encryption engine for SecureMatch.
//!
//! Records are stored AES-256-GCM encrypted. Each searchable field gets a
//! field-bound HMAC token (for internal callers holding the tokenization key)
//! and optionally a plain keyword hash (for external auditors). Two search
//! paths sit on top:
//!
//! - **Internal**: conjunctive trapdoor lookup, results decrypted, capped.
//! - **External**: Ed25519-signed keyword hash, ciphertext only, padded to a
//!   fixed slot count, every attempt audited.
//!
//! [`SearchEngine`] wires the components over one shared DuckDB connection.

mod config;
mod engine;
mod error;
mod gateway;
mod ingest;
mod internal_search;
mod metrics;
mod registry;
mod types;

pub use config::EngineConfig;
pub use engine::SearchEngine;
pub use error::{EngineError, EngineResult, InternalFault};
pub use gateway::ExternalSearchGateway;
pub use ingest::Indexer;
pub use internal_search::InternalSearch;
pub use metrics::MetricsLedger;
pub use registry::AuditorRegistry;
pub use types::{
    AuditorLogsResponse, AuditorSnapshot, CreateAuditorResponse, DeleteResponse,
    ExternalMetrics, ExternalSearchRequest, ExternalSearchResponse, FaultKind, IngestResponse,
    InternalMetrics, InternalSearchResponse, RecordFault, ResultSlot, RotateKeyResponse,
};

use std::time::Instant;

pub(crate) fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
