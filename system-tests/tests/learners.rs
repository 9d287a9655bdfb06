// system-tests/tests/learners.rs
// ============================================================================
// Module: Learner Governance Tests
// Description: Pathological-learner capstone, guards, and non-causality.
// ============================================================================
//! A crasher, a flooder, and an escalator run against a committed decision:
//! the trace stays byte-equal, the escalator is rejected atomically, the
//! healthy learner succeeds, and learners never influence decisions.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

mod helpers;

use std::sync::Arc;

use ade_core::learners::InputGuardError;
use ade_core::learners::LearnerInput;
use ade_core::learners::LearnerRegistry;
use ade_core::learners::LearnerStatus;
use ade_core::learners::guard_input;
use ade_core::learners::guard_namespaces;
use ade_core::MemoryUpdate;
use helpers::harness::demo_engine;
use helpers::rogue::CrashingLearner;
use helpers::rogue::EscalatingLearner;
use helpers::rogue::FloodingLearner;
use helpers::rogue::HealthyLearner;
use helpers::scenarios::notification_action;
use helpers::scenarios::notification_request;
use serde_json::Value;
use serde_json::json;

/// Runs one decision and returns its committed trace.
async fn committed_trace(engine: &ade_server::EngineHandle) -> ade_core::AuditTrace {
    let response = engine
        .decide(notification_request(vec![
            notification_action("send-now", "immediate"),
            notification_action("delay-1h", "delayed"),
        ]))
        .await
        .expect("decide");
    engine
        .audit_store
        .retrieve(&response.audit.decision_id)
        .await
        .expect("retrieve")
        .expect("present")
}

#[tokio::test(flavor = "multi_thread")]
async fn pathological_learner_capstone() {
    let engine = demo_engine();
    let trace = committed_trace(&engine).await;
    let before = serde_json::to_vec(&trace).expect("serialize before");

    let mut registry = LearnerRegistry::new(Arc::clone(&engine.memory_store));
    registry.register(Arc::new(CrashingLearner));
    registry.register(Arc::new(FloodingLearner {
        writes: 500,
    }));
    registry.register(Arc::new(EscalatingLearner));
    registry.register(Arc::new(HealthyLearner));

    let outcomes = registry.dispatch(&trace).await;
    assert_eq!(outcomes.len(), 4);

    let by_id = |id: &str| {
        outcomes
            .iter()
            .find(|outcome| outcome.learner_id.as_str() == id)
            .unwrap_or_else(|| panic!("missing outcome for {id}"))
    };
    assert_eq!(by_id("crasher").status, LearnerStatus::Failed);
    assert_eq!(by_id("flooder").status, LearnerStatus::Succeeded);
    assert_eq!(by_id("flooder").updates_applied, 500);
    assert_eq!(by_id("escalator").status, LearnerStatus::NamespaceRejected);
    assert_eq!(by_id("escalator").updates_applied, 0);
    assert_eq!(by_id("healthy").status, LearnerStatus::Succeeded);

    // The committed trace is byte-equal after the whole stampede.
    let stored = engine
        .audit_store
        .retrieve(&trace.decision_id)
        .await
        .expect("retrieve")
        .expect("present");
    let after = serde_json::to_vec(&stored).expect("serialize after");
    assert_eq!(before, after);

    // The escalator's cover write was dropped with the escalation (atomic).
    let record = engine
        .memory_store
        .load("default", &trace.request.user_id)
        .await
        .expect("load")
        .expect("record exists after learner writes");
    assert!(!record.custom.contains_key("scoring.hack"));
    assert!(!record.custom.contains_key("learned.cover.benign"));
    assert!(record.custom.contains_key("learned.preferences.last_decision"));
    assert!(record.custom.contains_key("learned.flood.key_0"));
}

#[tokio::test(flavor = "multi_thread")]
async fn learner_input_guard_refuses_uncommitted_markers() {
    let engine = demo_engine();
    let trace = committed_trace(&engine).await;

    let complete = LearnerInput::from_trace(&trace);
    assert!(guard_input(&complete).is_ok());

    let mut missing_snapshot = complete.clone();
    missing_snapshot.memory_snapshot_id = None;
    assert_eq!(guard_input(&missing_snapshot), Err(InputGuardError::MissingSnapshotId));

    let mut missing_decision = complete.clone();
    missing_decision.final_decision = None;
    assert_eq!(guard_input(&missing_decision), Err(InputGuardError::MissingFinalDecision));

    let mut missing_timestamp = complete.clone();
    missing_timestamp.audit_timestamp = None;
    assert_eq!(guard_input(&missing_timestamp), Err(InputGuardError::MissingAuditTimestamp));

    let mut missing_id = complete;
    missing_id.decision_id = None;
    assert_eq!(guard_input(&missing_id), Err(InputGuardError::MissingDecisionId));
}

#[tokio::test(flavor = "multi_thread")]
async fn deficient_input_never_reaches_process() {
    let engine = demo_engine();
    let mut trace = committed_trace(&engine).await;
    trace.memory_snapshot_id = None;

    let mut registry = LearnerRegistry::new(Arc::clone(&engine.memory_store));
    registry.register(Arc::new(HealthyLearner));
    let outcomes = registry.dispatch(&trace).await;
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].status, LearnerStatus::InputRejected);
    assert_eq!(outcomes[0].updates_applied, 0);
}

#[test]
fn namespace_guard_is_atomic_over_the_result() {
    let good = MemoryUpdate {
        namespace: "learned.tone".to_string(),
        key: "preference".to_string(),
        value: json!("warm"),
        ttl_seconds: None,
    };
    let bad = MemoryUpdate {
        namespace: "guardrails.quiet".to_string(),
        key: "disable".to_string(),
        value: json!(true),
        ttl_seconds: None,
    };
    assert!(guard_namespaces(std::slice::from_ref(&good)).is_ok());
    let violation = guard_namespaces(&[good, bad]).unwrap_err();
    assert_eq!(violation.namespace, "guardrails.quiet");

    for namespace in ["scoring", "guardrails.x", "execution.mode", "scenario.v", "other"] {
        let update = MemoryUpdate {
            namespace: namespace.to_string(),
            key: "k".to_string(),
            value: json!(1),
            ttl_seconds: None,
        };
        assert!(guard_namespaces(&[update]).is_err(), "{namespace} must be rejected");
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn decisions_are_byte_equal_with_and_without_learners() {
    // Two isolated engines so learner writes cannot bleed across runs.
    let silent_engine = demo_engine();
    let noisy_engine = demo_engine();
    {
        let mut learners = noisy_engine.learners.write().await;
        learners.register(Arc::new(CrashingLearner));
        learners.register(Arc::new(EscalatingLearner));
        learners.register(Arc::new(FloodingLearner {
            writes: 50,
        }));
    }

    let request = || {
        notification_request(vec![
            notification_action("send-now", "immediate"),
            notification_action("delay-1h", "delayed"),
        ])
    };
    let silent = silent_engine.decide(request()).await.expect("silent decide");
    let noisy = noisy_engine.decide(request()).await.expect("noisy decide");

    // decision + state subtrees must match byte-for-byte once the random
    // decision identifier is removed.
    let strip = |response: &ade_core::DecisionResponse| {
        let mut decision = serde_json::to_value(&response.decision).expect("decision json");
        if let Value::Object(map) = &mut decision {
            map.remove("decision_id");
        }
        let state = serde_json::to_value(&response.state).expect("state json");
        serde_json::to_vec(&json!({"decision": decision, "state": state})).expect("bytes")
    };
    assert_eq!(strip(&silent), strip(&noisy));
}
