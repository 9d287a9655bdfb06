// crates/ade-core/tests/comparator.rs
// ============================================================================
// Module: Replay Comparator Tests
// Description: Criticality partitioning of response differences.
// ============================================================================
//! Determinism verdicts across identifier churn, score jitter, and state
//! drift.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

use std::collections::BTreeMap;

use ade_core::DecisionResponse;
use ade_core::DeterminismVerdict;
use ade_core::HashDigest;
use ade_core::RankedOption;
use ade_core::core::hashing::HashAlgorithm;
use ade_core::core::hashing::hash_bytes;
use ade_core::core::response::AuditSection;
use ade_core::core::response::DecisionPayload;
use ade_core::core::response::DecisionSection;
use ade_core::core::response::ExecutionSection;
use ade_core::core::response::MetaSection;
use ade_core::core::response::ValidationStatus;
use ade_core::core::state::ExecutionCapabilities;
use ade_core::core::state::UserState;
use ade_core::ExecutionMode;
use ade_core::runtime::compare_responses;
use serde_json::json;

/// Builds a response fixture with fixed critical fields.
fn response(decision_id: &str) -> DecisionResponse {
    let hash: HashDigest = hash_bytes(HashAlgorithm::Sha256, b"scenario");
    let core: BTreeMap<String, serde_json::Value> =
        [("engagement_score".to_string(), json!(0.5))].into_iter().collect();
    DecisionResponse {
        decision: DecisionSection {
            decision_id: decision_id.into(),
            selected_action: "send-now".into(),
            payload: DecisionPayload {
                rationale: "A calm moment works well for this.".to_string(),
                display_title: None,
                display_parameters: BTreeMap::new(),
            },
            ranked_options: vec![
                RankedOption {
                    action_id: "send-now".into(),
                    rank: 1,
                    score: 0.9,
                    score_breakdown: None,
                },
                RankedOption {
                    action_id: "defer".into(),
                    rank: 2,
                    score: 0.7,
                    score_breakdown: None,
                },
            ],
        },
        state: UserState {
            core,
            scenario_extensions: BTreeMap::new(),
            capabilities: ExecutionCapabilities::default(),
            inputs_hash: hash_bytes(HashAlgorithm::Sha256, b"inputs"),
        },
        execution: ExecutionSection {
            execution_mode: ExecutionMode::DeterministicOnly,
            skill_id: "template-basic".into(),
            skill_version: "1.0.0".to_string(),
            validation_status: ValidationStatus::Passed,
            fallback_used: false,
            fallback_reason_code: None,
        },
        guardrails_applied: vec!["GR-NIGHT".into()],
        audit: AuditSection {
            decision_id: decision_id.into(),
            replay_token: format!("rpl_{decision_id}"),
            scenario_id: "reminder".into(),
            scenario_version: "1.0.0".to_string(),
            scenario_hash: hash,
            trace_id: format!("trc_{decision_id}").into(),
        },
        meta: MetaSection {
            request_id: decision_id.to_string(),
            timestamp: "2026-03-02T14:00:00Z".to_string(),
            total_duration_ms: 12,
            api_version: "v1".to_string(),
        },
    }
}

#[test]
fn identifier_and_timing_churn_is_ignored() {
    let original = response("decision-a");
    let mut replay = response("decision-b");
    replay.meta.total_duration_ms = 99;
    replay.meta.timestamp = "2026-03-02T15:00:00Z".to_string();
    let comparison = compare_responses(&original, &replay);
    assert_eq!(comparison.verdict, DeterminismVerdict::Verified);
    assert!(comparison.critical.is_empty(), "critical: {:?}", comparison.critical);
}

#[test]
fn selected_action_change_is_critical() {
    let original = response("decision-a");
    let mut replay = response("decision-a");
    replay.decision.selected_action = "defer".into();
    let comparison = compare_responses(&original, &replay);
    assert_eq!(comparison.verdict, DeterminismVerdict::Failed);
    assert!(comparison.critical.iter().any(|diff| diff.path == "decision.selected_action"));
}

#[test]
fn score_jitter_within_tolerance_passes() {
    let original = response("decision-a");
    let mut replay = response("decision-a");
    replay.decision.ranked_options[0].score = 0.900_05;
    let comparison = compare_responses(&original, &replay);
    assert_eq!(comparison.verdict, DeterminismVerdict::Verified);
}

#[test]
fn score_drift_beyond_tolerance_is_critical() {
    let original = response("decision-a");
    let mut replay = response("decision-a");
    replay.decision.ranked_options[0].score = 0.91;
    let comparison = compare_responses(&original, &replay);
    assert_eq!(comparison.verdict, DeterminismVerdict::Failed);
}

#[test]
fn rank_swap_is_critical() {
    let original = response("decision-a");
    let mut replay = response("decision-a");
    replay.decision.ranked_options.swap(0, 1);
    let comparison = compare_responses(&original, &replay);
    assert_eq!(comparison.verdict, DeterminismVerdict::Failed);
}

#[test]
fn guardrail_set_is_compared_without_order() {
    let mut original = response("decision-a");
    original.guardrails_applied = vec!["GR-A".into(), "GR-B".into()];
    let mut replay = response("decision-a");
    replay.guardrails_applied = vec!["GR-B".into(), "GR-A".into()];
    let comparison = compare_responses(&original, &replay);
    assert_eq!(comparison.verdict, DeterminismVerdict::Verified);

    replay.guardrails_applied = vec!["GR-B".into()];
    let comparison = compare_responses(&original, &replay);
    assert_eq!(comparison.verdict, DeterminismVerdict::Failed);
}

#[test]
fn state_drift_is_critical() {
    let original = response("decision-a");
    let mut replay = response("decision-a");
    replay.state.core.insert("engagement_score".to_string(), json!(0.6));
    let comparison = compare_responses(&original, &replay);
    assert_eq!(comparison.verdict, DeterminismVerdict::Failed);
    assert!(
        comparison
            .critical
            .iter()
            .any(|diff| diff.path.starts_with("state.core"))
    );
}

#[test]
fn payload_wording_changes_are_minor() {
    let original = response("decision-a");
    let mut replay = response("decision-a");
    replay.decision.payload.rationale = "A different calm phrasing.".to_string();
    let comparison = compare_responses(&original, &replay);
    assert_eq!(comparison.verdict, DeterminismVerdict::Verified);
    assert!(!comparison.minor.is_empty());
}
