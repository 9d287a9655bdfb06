// crates/ade-core/src/core/response.rs
// ============================================================================
// Module: ADE Decision Response
// Description: Wire-stable response projected from a completed envelope.
// Purpose: Define the decision, execution, audit, and meta sections returned
// to callers and compared by the replay verifier.
// Dependencies: crate::core::{hashing, identifiers, scenario, state}, serde, serde_json
// ============================================================================

//! ## Overview
//! The response is the caller-facing projection of one pipeline run. Its
//! field partitioning matters: the replay comparator treats the decision and
//! state subtrees as critical, audit identifiers as ignored, and the rest as
//! minor.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::hashing::HashDigest;
use crate::core::identifiers::ActionId;
use crate::core::identifiers::DecisionId;
use crate::core::identifiers::RuleId;
use crate::core::identifiers::ScenarioId;
use crate::core::identifiers::SkillId;
use crate::core::identifiers::TraceId;
use crate::core::scenario::ExecutionMode;
use crate::core::state::UserState;

// ============================================================================
// SECTION: Ranked Options
// ============================================================================

/// One entry of the ranked option list.
///
/// # Invariants
/// - `rank` is 1-based and dense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedOption {
    /// Action identifier.
    pub action_id: ActionId,
    /// 1-based rank.
    pub rank: u32,
    /// Final score after weighting and penalties.
    pub score: f64,
    /// Optional per-objective breakdown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_breakdown: Option<BTreeMap<String, f64>>,
}

// ============================================================================
// SECTION: Decision Payload
// ============================================================================

/// Human-readable payload attached to the selected action.
///
/// # Invariants
/// - `rationale` is non-empty with length in `[5, 500]` after validation or
///   fallback synthesis.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DecisionPayload {
    /// Human-readable rationale text.
    pub rationale: String,
    /// Optional display title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_title: Option<String>,
    /// Optional display parameters for client rendering.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub display_parameters: BTreeMap<String, Value>,
}

// ============================================================================
// SECTION: Response Sections
// ============================================================================

/// Decision section: the selected action and ranked alternatives.
///
/// # Invariants
/// - `selected_action` equals the rank-1 entry of `ranked_options`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionSection {
    /// Server-minted decision identifier.
    pub decision_id: DecisionId,
    /// Selected action identifier.
    pub selected_action: ActionId,
    /// Payload attached to the selection.
    pub payload: DecisionPayload,
    /// Ranked options in descending score order.
    pub ranked_options: Vec<RankedOption>,
}

/// Validation outcome label for the execution section.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    /// All four validation phases passed.
    Passed,
    /// At least one validation phase failed; fallback was used.
    Failed,
    /// Validation did not run (fallback path before Stage 7 output).
    Skipped,
}

/// Execution section: how the payload was produced.
///
/// # Invariants
/// - `fallback_reason_code` is present iff `fallback_used` is true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSection {
    /// Effective execution mode.
    pub execution_mode: ExecutionMode,
    /// Resolved skill identifier.
    pub skill_id: SkillId,
    /// Resolved skill version.
    pub skill_version: String,
    /// Validation outcome.
    pub validation_status: ValidationStatus,
    /// Whether the payload came from the deterministic fallback.
    pub fallback_used: bool,
    /// Reason code for the fallback, when used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason_code: Option<String>,
}

/// Audit section: replay coordinates for the decision.
///
/// # Invariants
/// - `replay_token` decodes back to `(decision_id, scenario_hash)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditSection {
    /// Decision identifier (repeated for standalone audit consumers).
    pub decision_id: DecisionId,
    /// URL-safe replay token with the `rpl_` prefix.
    pub replay_token: String,
    /// Scenario identifier.
    pub scenario_id: ScenarioId,
    /// Scenario version.
    pub scenario_version: String,
    /// Scenario content hash.
    pub scenario_hash: HashDigest,
    /// Stored trace identifier.
    pub trace_id: TraceId,
}

/// Meta section: request bookkeeping.
///
/// # Invariants
/// - `request_id` equals the decision identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaSection {
    /// Request identifier (equal to the decision identifier).
    pub request_id: String,
    /// Response timestamp (RFC 3339).
    pub timestamp: String,
    /// Total pipeline duration in milliseconds.
    pub total_duration_ms: u64,
    /// API version label.
    pub api_version: String,
}

// ============================================================================
// SECTION: Decision Response
// ============================================================================

/// Complete response returned by `POST /v1/decide`.
///
/// # Invariants
/// - Field partitioning (critical/ignored/minor) is stable for the replay
///   comparator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionResponse {
    /// Decision section.
    pub decision: DecisionSection,
    /// Derived user state.
    pub state: UserState,
    /// Execution section.
    pub execution: ExecutionSection,
    /// Identifiers of guardrail rules that triggered.
    pub guardrails_applied: Vec<RuleId>,
    /// Audit section.
    pub audit: AuditSection,
    /// Meta section.
    pub meta: MetaSection,
}
