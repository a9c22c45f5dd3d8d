mod support;

use pretty_assertions::assert_eq;
use securematch_crypto::{AuditorKeyPair, TAG_SIZE, keyword_hash};
use securematch_engine::{EngineConfig, EngineError, ExternalSearchRequest, SearchEngine};
use serde_json::json;
use support::{engine, engine_with, keypair, signed_request};

fn engine_with_auditor() -> (SearchEngine, String, AuditorKeyPair) {
    let engine = engine();
    let created = engine.create_auditor("Ledger Audit LLP").unwrap();
    let signer = keypair(&created.private_key);
    (engine, created.auditor_id, signer)
}

// ── Padding ──────────────────────────────────────────────────────

#[test]
fn response_always_has_fifty_slots() {
    let (engine, auditor_id, signer) = engine_with_auditor();

    let mut ingested = 0;
    for k in [0usize, 1, 7, 49, 50] {
        while ingested < k {
            engine
                .ingest(&json!({"keyword": "sanctions", "seq": ingested}))
                .unwrap();
            ingested += 1;
        }

        let resp = engine
            .external_search(&signed_request(&auditor_id, &signer, "sanctions"))
            .unwrap();
        assert_eq!(resp.results.len(), 50, "k = {k}");
        assert_eq!(resp.total_matches, k);
        assert_eq!(resp.returned_count, k);
        assert!(!resp.truncated);

        let padded = resp.results.iter().filter(|s| s.padded).count();
        assert_eq!(padded, 50 - k);
        assert!(resp.results[..k].iter().all(|s| !s.padded));
        let sealed_len = engine.config().record_block_size + TAG_SIZE;
        for slot in &resp.results[k..] {
            assert_eq!(slot.nonce, "0".repeat(24));
            assert_eq!(slot.ciphertext, "0".repeat(2 * sealed_len));
        }
    }
}

#[test]
fn results_encode_to_same_size_for_any_match_count() {
    let (engine, auditor_id, signer) = engine_with_auditor();

    let mut sizes = Vec::new();
    let mut ingested = 0;
    for k in [0usize, 1, 50] {
        while ingested < k {
            let note = "x".repeat(ingested * 13 % 400);
            engine
                .ingest(&json!({"keyword": "embargo", "seq": ingested, "note": note}))
                .unwrap();
            ingested += 1;
        }

        let resp = engine
            .external_search(&signed_request(&auditor_id, &signer, "embargo"))
            .unwrap();
        assert_eq!(resp.returned_count, k);
        let widths: Vec<usize> = resp
            .results
            .iter()
            .map(|slot| serde_json::to_vec(slot).unwrap().len())
            .collect();
        assert!(widths.iter().all(|w| *w == widths[0]), "k = {k}");
        sizes.push(serde_json::to_vec(&resp.results).unwrap().len());
    }
    assert_eq!(sizes[0], sizes[1]);
    assert_eq!(sizes[1], sizes[2]);
}

#[test]
fn padded_flag_is_encoded_as_digit() {
    let (engine, auditor_id, signer) = engine_with_auditor();
    engine.ingest(&json!({"keyword": "levy"})).unwrap();

    let resp = engine
        .external_search(&signed_request(&auditor_id, &signer, "levy"))
        .unwrap();
    let encoded = serde_json::to_value(&resp.results[..2]).unwrap();
    assert_eq!(encoded[0]["padded"], json!(0));
    assert_eq!(encoded[1]["padded"], json!(1));

    let decoded: Vec<securematch_engine::ResultSlot> = serde_json::from_value(encoded).unwrap();
    assert_eq!(decoded, resp.results[..2].to_vec());
}

#[test]
fn matches_beyond_cap_are_truncated() {
    let (engine, auditor_id, signer) = engine_with_auditor();
    for i in 0..55 {
        engine.ingest(&json!({"keyword": "fraud", "seq": i})).unwrap();
    }

    let resp = engine
        .external_search(&signed_request(&auditor_id, &signer, "fraud"))
        .unwrap();
    assert_eq!(resp.results.len(), 50);
    assert_eq!(resp.total_matches, 55);
    assert_eq!(resp.returned_count, 50);
    assert!(resp.truncated);
    assert!(resp.results.iter().all(|s| !s.padded));
}

#[test]
fn results_are_ciphertext_not_plaintext() {
    let (engine, auditor_id, signer) = engine_with_auditor();
    engine
        .ingest(&json!({"email": "dana@example.com", "note": "confidential"}))
        .unwrap();

    let resp = engine
        .external_search(&signed_request(&auditor_id, &signer, "dana@example.com"))
        .unwrap();
    let slot = &resp.results[0];
    assert!(!slot.padded);
    assert_eq!(slot.nonce.len(), 24);
    assert!(hex::decode(&slot.ciphertext).is_ok());

    let wire = serde_json::to_string(&resp).unwrap();
    assert!(!wire.contains("dana@example.com"));
    assert!(!wire.contains("confidential"));
}

#[test]
fn record_matching_through_two_fields_counts_once() {
    let (engine, auditor_id, signer) = engine_with_auditor();
    engine
        .ingest(&json!({"billing_name": "Smith", "shipping_name": "smith"}))
        .unwrap();

    let resp = engine
        .external_search(&signed_request(&auditor_id, &signer, "SMITH"))
        .unwrap();
    assert_eq!(resp.total_matches, 1);
}

#[test]
fn non_external_fields_are_invisible_to_auditors() {
    let engine = engine_with(EngineConfig {
        external_fields: Some(vec!["email".into()]),
        ..Default::default()
    });
    let created = engine.create_auditor("Narrow Scope").unwrap();
    let signer = keypair(&created.private_key);
    engine
        .ingest(&json!({"email": "erin@example.com", "ssn": "123-45-6789"}))
        .unwrap();

    let ssn = engine
        .external_search(&signed_request(&created.auditor_id, &signer, "123-45-6789"))
        .unwrap();
    assert_eq!(ssn.total_matches, 0);

    let email = engine
        .external_search(&signed_request(&created.auditor_id, &signer, "erin@example.com"))
        .unwrap();
    assert_eq!(email.total_matches, 1);
}

#[test]
fn padding_follows_configured_cap() {
    let engine = engine_with(EngineConfig {
        external_result_cap: 8,
        ..Default::default()
    });
    let created = engine.create_auditor("Small Cap").unwrap();
    let signer = keypair(&created.private_key);
    engine.ingest(&json!({"k": "v"})).unwrap();

    let resp = engine
        .external_search(&signed_request(&created.auditor_id, &signer, "v"))
        .unwrap();
    assert_eq!(resp.results.len(), 8);
    assert_eq!(resp.returned_count, 1);
}

// ── Signature gating ─────────────────────────────────────────────

#[test]
fn wrong_signer_rejected_and_audited() {
    let (engine, auditor_id, _signer) = engine_with_auditor();
    let impostor = AuditorKeyPair::generate();

    let err = engine
        .external_search(&signed_request(&auditor_id, &impostor, "anything"))
        .unwrap_err();
    let EngineError::SignatureInvalid {
        audit_log_id,
        key_version,
    } = &err
    else {
        panic!("expected SignatureInvalid, got {err:?}");
    };
    assert_eq!(*key_version, 1);
    assert_eq!(err.status_code(), 403);

    let logs = engine.auditor_logs(&auditor_id).unwrap().logs;
    assert_eq!(logs.len(), 1);
    assert_eq!(&logs[0].id, audit_log_id);
    assert!(!logs[0].success);
    assert_eq!(logs[0].total_matches, 0);
    assert_eq!(logs[0].returned_count, 0);
    assert_eq!(logs[0].keyword_hash, keyword_hash("anything"));
}

#[test]
fn stale_key_rejected_after_rotation() {
    let (engine, auditor_id, old_signer) = engine_with_auditor();
    engine.ingest(&json!({"keyword": "audit"})).unwrap();

    let ok = engine
        .external_search(&signed_request(&auditor_id, &old_signer, "audit"))
        .unwrap();
    assert_eq!(ok.key_version_used, 1);

    let rotated = engine.rotate_auditor_key(&auditor_id, None).unwrap();
    assert_eq!(rotated.new_key_version, 2);

    let err = engine
        .external_search(&signed_request(&auditor_id, &old_signer, "audit"))
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::SignatureInvalid { key_version: 2, .. }
    ));

    let new_signer = keypair(rotated.new_private_key.as_deref().unwrap());
    let fresh = engine
        .external_search(&signed_request(&auditor_id, &new_signer, "audit"))
        .unwrap();
    assert_eq!(fresh.key_version_used, 2);
    assert_eq!(fresh.total_matches, 1);

    let outcomes: Vec<(bool, u32)> = engine
        .auditor_logs(&auditor_id)
        .unwrap()
        .logs
        .iter()
        .map(|l| (l.success, l.key_version))
        .collect();
    assert_eq!(outcomes, vec![(true, 2), (false, 2), (true, 1)]);
}

#[test]
fn malformed_signature_is_audited_failure() {
    let (engine, auditor_id, _signer) = engine_with_auditor();
    let all_zero = "00".repeat(64);
    for signature in ["", "zz", "abcd", all_zero.as_str()] {
        let err = engine
            .external_search(&ExternalSearchRequest {
                auditor_id: auditor_id.clone(),
                keyword_hash: keyword_hash("x"),
                signature: signature.to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, EngineError::SignatureInvalid { .. }));
    }
    assert_eq!(engine.auditor_logs(&auditor_id).unwrap().logs.len(), 4);
}

#[test]
fn signature_over_different_hash_rejected() {
    let (engine, auditor_id, signer) = engine_with_auditor();
    let mut request = signed_request(&auditor_id, &signer, "first");
    request.keyword_hash = keyword_hash("second");

    assert!(matches!(
        engine.external_search(&request),
        Err(EngineError::SignatureInvalid { .. })
    ));
}

// ── Rejections without audit ─────────────────────────────────────

#[test]
fn unknown_auditor_leaves_no_audit_row() {
    let (engine, _auditor_id, signer) = engine_with_auditor();

    let err = engine
        .external_search(&signed_request("no-such-auditor", &signer, "x"))
        .unwrap_err();
    assert!(matches!(err, EngineError::AuditorNotFound(_)));
    assert!(engine.auditor_logs("no-such-auditor").unwrap().logs.is_empty());

    let metrics = engine.internal_metrics().unwrap();
    assert_eq!(metrics.external_searches_last_24h, 0);
    assert_eq!(metrics.failed_external_searches_last_24h, 0);
}

#[test]
fn malformed_keyword_hash_is_invalid_input() {
    let (engine, auditor_id, signer) = engine_with_auditor();
    for bad in [
        String::new(),
        "plaintext keyword".to_string(),
        keyword_hash("x").to_uppercase(),
        keyword_hash("x")[..63].to_string(),
    ] {
        let request = ExternalSearchRequest {
            auditor_id: auditor_id.clone(),
            signature: signer.sign_keyword_hash(&bad),
            keyword_hash: bad,
        };
        assert!(matches!(
            engine.external_search(&request),
            Err(EngineError::InvalidInput(_))
        ));
    }
    assert!(engine.auditor_logs(&auditor_id).unwrap().logs.is_empty());
}

// ── Audit accounting ─────────────────────────────────────────────

#[test]
fn success_is_audited_with_full_counts() {
    let (engine, auditor_id, signer) = engine_with_auditor();
    for i in 0..3 {
        engine.ingest(&json!({"region": "emea", "seq": i})).unwrap();
    }

    let resp = engine
        .external_search(&signed_request(&auditor_id, &signer, "EMEA"))
        .unwrap();
    let logs = engine.auditor_logs(&auditor_id).unwrap().logs;
    let log = &logs[0];

    assert_eq!(log.id, resp.audit_log_id);
    assert!(log.success);
    assert_eq!(log.total_matches, 3);
    assert_eq!(log.returned_count, 3);
    assert!(!log.truncated);
    assert_eq!(log.key_version, 1);
    assert_eq!(log.execution_time_ms, resp.execution_time_ms);
    assert_eq!(log.signature_verification_ms, resp.signature_verification_ms);
    assert!(resp.signature_verification_ms <= resp.execution_time_ms);
}

#[test]
fn searches_last_hour_counts_prior_attempts() {
    let (engine, auditor_id, signer) = engine_with_auditor();
    let impostor = AuditorKeyPair::generate();

    let first = engine
        .external_search(&signed_request(&auditor_id, &signer, "a"))
        .unwrap();
    assert_eq!(first.searches_last_hour, 0);

    let _ = engine.external_search(&signed_request(&auditor_id, &impostor, "b"));

    let third = engine
        .external_search(&signed_request(&auditor_id, &signer, "c"))
        .unwrap();
    assert_eq!(third.searches_last_hour, 2);
}

#[test]
fn searches_last_hour_is_per_auditor() {
    let (engine, first_id, first_signer) = engine_with_auditor();
    let other = engine.create_auditor("Second Firm").unwrap();
    let other_signer = keypair(&other.private_key);

    for _ in 0..3 {
        engine
            .external_search(&signed_request(&first_id, &first_signer, "q"))
            .unwrap();
    }
    let resp = engine
        .external_search(&signed_request(&other.auditor_id, &other_signer, "q"))
        .unwrap();
    assert_eq!(resp.searches_last_hour, 0);
}

proptest::proptest! {
    #![proptest_config(proptest::prelude::ProptestConfig::with_cases(16))]

    #[test]
    fn slot_count_independent_of_match_count(k in 0usize..=10) {
        let engine = engine_with(EngineConfig {
            external_result_cap: 10,
            ..Default::default()
        });
        let created = engine.create_auditor("Property Auditor").unwrap();
        let signer = keypair(&created.private_key);
        for i in 0..k {
            engine.ingest(&json!({"tag": "watchlist", "seq": i})).unwrap();
        }
        engine.ingest(&json!({"tag": "other"})).unwrap();

        let resp = engine
            .external_search(&signed_request(&created.auditor_id, &signer, "watchlist"))
            .unwrap();
        proptest::prop_assert_eq!(resp.results.len(), 10);
        proptest::prop_assert_eq!(resp.total_matches, k);
        proptest::prop_assert_eq!(resp.results.iter().filter(|s| s.padded).count(), 10 - k);
    }
}
