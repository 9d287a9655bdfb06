// crates/ade-core/src/core/trace.rs
// ============================================================================
// Module: ADE Audit Trace
// Description: Immutable, replayable record of one decision.
// Purpose: Capture the full per-stage history needed for offline replay
// verification.
// Dependencies: crate::core::{hashing, identifiers, request, response, time},
// serde, serde_json
// ============================================================================

//! ## Overview
//! The audit trace is the projection of a completed envelope. Exactly one
//! trace is stored per decision that reaches Stage 9, and stores must treat
//! the trace as frozen: deep-copied on write and on read so no later
//! envelope or caller mutation can alter history.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::hashing::HashDigest;
use crate::core::identifiers::DecisionId;
use crate::core::identifiers::ScenarioId;
use crate::core::identifiers::SnapshotId;
use crate::core::identifiers::TraceId;
use crate::core::request::DecisionRequest;
use crate::core::response::DecisionResponse;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Determinism Verdict
// ============================================================================

/// Tri-state determinism verification status for a stored trace.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeterminismVerdict {
    /// No replay verification has run.
    #[default]
    Unknown,
    /// Replay produced no critical difference.
    Verified,
    /// Replay produced at least one critical difference.
    Failed,
}

// ============================================================================
// SECTION: Audit Trace
// ============================================================================

/// Immutable audit trace for one decision.
///
/// # Invariants
/// - `stage_artifacts` keys are stable stage labels (`stage_1_ingest`, ...).
/// - Stored traces never change except for `determinism_verified`, updated
///   through the store's verification entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditTrace {
    /// Decision identifier.
    pub decision_id: DecisionId,
    /// Scenario identifier.
    pub scenario_id: ScenarioId,
    /// Scenario version.
    pub scenario_version: String,
    /// Scenario content hash.
    pub scenario_hash: HashDigest,
    /// Engine version string bound to the build.
    pub engine_version: String,
    /// Commit timestamp.
    pub committed_at: Timestamp,
    /// Original request as received.
    pub request: DecisionRequest,
    /// Per-stage artifact map.
    pub stage_artifacts: BTreeMap<String, Value>,
    /// Final response projection.
    pub final_response: DecisionResponse,
    /// Total pipeline duration in milliseconds.
    pub total_duration_ms: u64,
    /// Determinism verification status.
    #[serde(default)]
    pub determinism_verified: DeterminismVerdict,
    /// Replay token for token-addressed retrieval.
    pub replay_token: String,
    /// Trace identifier.
    pub trace_id: TraceId,
    /// Memory snapshot pinned for learner replay, when one was captured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_snapshot_id: Option<SnapshotId>,
}

impl AuditTrace {
    /// Returns the stable artifact key for a stage number.
    #[must_use]
    pub const fn stage_key(stage: u8) -> &'static str {
        match stage {
            1 => "stage_1_ingest",
            2 => "stage_2_derive_state",
            3 => "stage_3_guardrails",
            4 => "stage_4_score_rank",
            5 => "stage_5_resolve_skills",
            6 => "stage_6_execute_skill",
            7 => "stage_7_validate_output",
            8 => "stage_8_fallback",
            _ => "stage_9_audit_replay",
        }
    }
}
