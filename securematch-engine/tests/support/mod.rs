//! Shared helpers for engine integration tests.

#![allow(dead_code)]

use securematch_crypto::{AuditorKeyPair, SearchKeys, keyword_hash};
use securematch_engine::{EngineConfig, ExternalSearchRequest, SearchEngine};
use serde_json::{Map, Value};
use tracing_subscriber::EnvFilter;

pub const ENCRYPTION_KEY: [u8; 32] = [0x11; 32];
pub const TOKENIZATION_KEY: [u8; 32] = [0x22; 32];

/// Routes engine logs to the test writer; filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

pub fn test_keys() -> SearchKeys {
    SearchKeys::new(&ENCRYPTION_KEY, &TOKENIZATION_KEY).unwrap()
}

pub fn engine() -> SearchEngine {
    engine_with(EngineConfig::default())
}

pub fn engine_with(config: EngineConfig) -> SearchEngine {
    init_tracing();
    SearchEngine::open_in_memory(config, &test_keys()).unwrap()
}

/// Unwraps a `json!` object literal into a query map.
pub fn query(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("query must be an object, got {other}"),
    }
}

/// An auditor keypair recovered from the private key handed out at creation.
pub fn keypair(private_hex: &str) -> AuditorKeyPair {
    AuditorKeyPair::from_private_hex(private_hex).unwrap()
}

/// A correctly signed external request for `keyword`.
pub fn signed_request(
    auditor_id: &str,
    signer: &AuditorKeyPair,
    keyword: &str,
) -> ExternalSearchRequest {
    let hash = keyword_hash(keyword);
    ExternalSearchRequest {
        auditor_id: auditor_id.to_string(),
        signature: signer.sign_keyword_hash(&hash),
        keyword_hash: hash,
    }
}
