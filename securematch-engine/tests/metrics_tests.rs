mod support;

use pretty_assertions::assert_eq;
use securematch_crypto::AuditorKeyPair;
use securematch_engine::EngineConfig;
use serde_json::json;
use support::{engine, engine_with, keypair, signed_request};

#[test]
fn empty_engine_metrics() {
    let engine = engine();
    let metrics = engine.internal_metrics().unwrap();

    assert_eq!(metrics.total_documents, 0);
    assert_eq!(metrics.total_tokens, 0);
    assert_eq!(metrics.external_tokens, 0);
    assert_eq!(metrics.external_searches_last_24h, 0);
    assert_eq!(metrics.failed_external_searches_last_24h, 0);
    assert_eq!(metrics.avg_external_search_ms, 0.0);
    assert_eq!(metrics.last_index_update, None);
    assert!(metrics.auditors.is_empty());
}

#[test]
fn corpus_counts() {
    let engine = engine_with(EngineConfig {
        external_fields: Some(vec!["email".into()]),
        ..Default::default()
    });
    engine
        .ingest(&json!({"email": "f@example.com", "name": "F", "blank": ""}))
        .unwrap();
    engine.ingest(&json!({"name": "G"})).unwrap();

    let metrics = engine.internal_metrics().unwrap();
    assert_eq!(metrics.total_documents, 2);
    assert_eq!(metrics.total_tokens, 3);
    assert_eq!(metrics.external_tokens, 1);
    assert!(metrics.last_index_update.is_some());
}

#[test]
fn search_outcomes_and_auditor_snapshot() {
    let engine = engine();
    let created = engine.create_auditor("Metrics Auditor").unwrap();
    let signer = keypair(&created.private_key);
    engine.ingest(&json!({"k": "v"})).unwrap();

    for _ in 0..2 {
        engine
            .external_search(&signed_request(&created.auditor_id, &signer, "v"))
            .unwrap();
    }
    let _ = engine.external_search(&signed_request(
        &created.auditor_id,
        &AuditorKeyPair::generate(),
        "v",
    ));
    engine.rotate_auditor_key(&created.auditor_id, None).unwrap();

    let metrics = engine.internal_metrics().unwrap();
    assert_eq!(metrics.external_searches_last_24h, 2);
    assert_eq!(metrics.failed_external_searches_last_24h, 1);
    assert!(metrics.avg_external_search_ms > 0.0);

    assert_eq!(metrics.auditors.len(), 1);
    let snapshot = &metrics.auditors[0];
    assert_eq!(snapshot.auditor_id, created.auditor_id);
    assert_eq!(snapshot.name, "Metrics Auditor");
    assert_eq!(snapshot.active_key_version, 2);
}

#[test]
fn external_metrics_expose_only_document_count() {
    let engine = engine();
    engine.ingest(&json!({"a": "1"})).unwrap();
    engine.ingest(&json!({"a": "2"})).unwrap();
    engine.create_auditor("Hidden").unwrap();

    let external = engine.external_metrics().unwrap();
    assert_eq!(external.total_documents, 2);
    assert_eq!(
        serde_json::to_value(&external).unwrap(),
        json!({"total_documents": 2})
    );
}

#[test]
fn auditor_logs_bounded_and_newest_first() {
    let engine = engine_with(EngineConfig {
        auditor_log_limit: 3,
        ..Default::default()
    });
    let created = engine.create_auditor("Busy Auditor").unwrap();
    let signer = keypair(&created.private_key);

    let mut audit_ids = Vec::new();
    for keyword in ["one", "two", "three", "four", "five"] {
        let resp = engine
            .external_search(&signed_request(&created.auditor_id, &signer, keyword))
            .unwrap();
        audit_ids.push(resp.audit_log_id);
    }

    let logs = engine.auditor_logs(&created.auditor_id).unwrap().logs;
    let ids: Vec<String> = logs.into_iter().map(|l| l.id).collect();
    audit_ids.reverse();
    assert_eq!(ids, audit_ids[..3].to_vec());
}
