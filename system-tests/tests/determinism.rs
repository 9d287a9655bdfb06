// system-tests/tests/determinism.rs
// ============================================================================
// Module: Determinism and Replay Tests
// Description: Critical-field equality across repeat runs and replay
// verification.
// ============================================================================
//! Invariants: equal inputs produce equal critical outputs, exactly one
//! trace per decision, and replay tokens invert to the same trace.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

mod helpers;

use ade_core::DeterminismVerdict;
use ade_core::runtime::compare_responses;
use helpers::harness::demo_engine;
use helpers::scenarios::notification_action;
use helpers::scenarios::notification_request;
use helpers::scenarios::workout_action;
use helpers::scenarios::fitness_request;

/// Standard candidate set reused across runs.
fn actions() -> Vec<ade_core::ActionCandidate> {
    vec![
        notification_action("send-now", "immediate"),
        notification_action("delay-1h", "delayed"),
        notification_action("suppress", "none"),
    ]
}

#[tokio::test(flavor = "multi_thread")]
async fn identical_requests_verify_under_the_comparator() {
    let engine = demo_engine();
    let first = engine.decide(notification_request(actions())).await.expect("first");
    let second = engine.decide(notification_request(actions())).await.expect("second");

    let comparison = compare_responses(&first, &second);
    assert_eq!(comparison.verdict, DeterminismVerdict::Verified);
    assert!(comparison.critical.is_empty(), "critical: {:?}", comparison.critical);
}

#[tokio::test(flavor = "multi_thread")]
async fn audit_trace_is_stored_once_and_equal_on_retrieval() {
    let engine = demo_engine();
    let response = engine.decide(notification_request(actions())).await.expect("decide");

    let by_id = engine
        .audit_store
        .retrieve(&response.audit.decision_id)
        .await
        .expect("retrieve")
        .expect("present");
    assert_eq!(by_id.decision_id, response.audit.decision_id);
    assert_eq!(by_id.final_response, response);
    assert_eq!(by_id.engine_version, ade_core::runtime::ENGINE_VERSION);
}

#[tokio::test(flavor = "multi_thread")]
async fn replay_token_inverts_to_the_same_trace() {
    let engine = demo_engine();
    let response = engine.decide(notification_request(actions())).await.expect("decide");

    let by_id = engine
        .audit_store
        .retrieve(&response.audit.decision_id)
        .await
        .expect("retrieve")
        .expect("present");
    let by_token = engine
        .audit_store
        .retrieve_by_token(&response.audit.replay_token)
        .await
        .expect("retrieve by token")
        .expect("present");
    assert_eq!(by_id, by_token);
}

#[tokio::test(flavor = "multi_thread")]
async fn verify_replay_pins_scenario_and_memory() {
    let engine = demo_engine();
    let response = engine.decide(notification_request(actions())).await.expect("decide");
    let decision_id = response.audit.decision_id.clone();

    let comparison = engine.verify_replay(&decision_id).await.expect("verify");
    assert_eq!(comparison.verdict, DeterminismVerdict::Verified);

    let stored = engine
        .audit_store
        .retrieve(&decision_id)
        .await
        .expect("retrieve")
        .expect("present");
    assert_eq!(stored.determinism_verified, DeterminismVerdict::Verified);
}

#[tokio::test(flavor = "multi_thread")]
async fn memory_backed_scoring_stays_deterministic_via_snapshots() {
    let engine = demo_engine();
    let request = || {
        fitness_request(vec![
            workout_action("workout-a", "moderate", 30.0),
            workout_action("workout-b", "high", 45.0),
        ])
    };
    let response = engine.decide(request()).await.expect("decide");
    let decision_id = response.audit.decision_id.clone();

    // A memory write between commit and replay must not change the verdict:
    // the replay reads the pinned snapshot, not live memory.
    engine
        .memory_store
        .apply_updates(
            "default",
            &"athlete-7".into(),
            &[ade_core::MemoryUpdate {
                namespace: "learned".to_string(),
                key: "variety_boost".to_string(),
                value: serde_json::json!(0.95),
                ttl_seconds: None,
            }],
        )
        .await
        .expect("memory write");

    let comparison = engine.verify_replay(&decision_id).await.expect("verify");
    assert_eq!(
        comparison.verdict,
        DeterminismVerdict::Verified,
        "critical: {:?}",
        comparison.critical
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn scenario_hash_is_stable_across_registrations() {
    let first = helpers::scenarios::notification_timing().content_hash().expect("hash");
    let second = helpers::scenarios::notification_timing().content_hash().expect("hash");
    assert_eq!(first, second);
    assert!(first.to_string().starts_with("sha256:"));
    assert_eq!(first.to_string().len(), "sha256:".len() + 64);
}
