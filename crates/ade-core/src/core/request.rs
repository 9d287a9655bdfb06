// crates/ade-core/src/core/request.rs
// ============================================================================
// Module: ADE Decision Request
// Description: Per-request input accepted by the decision pipeline.
// Purpose: Define the wire-stable request shape with normalization defaults.
// Dependencies: crate::core::{action, identifiers, scenario}, serde, serde_json
// ============================================================================

//! ## Overview
//! A decision request names a scenario and user, offers candidate actions,
//! and supplies signals plus context. Requests are untrusted: Stage 1
//! rejects structurally invalid requests, and any client-supplied decision
//! identifier is discarded in favor of a server-minted one.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::action::ActionCandidate;
use crate::core::identifiers::ScenarioId;
use crate::core::identifiers::UserId;
use crate::core::scenario::ExecutionMode;

// ============================================================================
// SECTION: Request Context
// ============================================================================

/// Request context carrying decision-relevant environment values.
///
/// # Invariants
/// - `current_time` is RFC 3339 text and is required by Stage 1.
/// - `extra` holds additional context keys readable as `context.<name>`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RequestContext {
    /// Caller-supplied current time (RFC 3339).
    #[serde(default)]
    pub current_time: Option<String>,
    /// Optional IANA timezone label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    /// Optional platform constraints for capability derivation.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub platform_constraints: BTreeMap<String, Value>,
    /// Additional context values readable by formulas.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

// ============================================================================
// SECTION: Request Options
// ============================================================================

/// Per-request presentation and execution options.
///
/// # Invariants
/// - Options never change which action is selected, only how the response is
///   shaped and which executor path runs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RequestOptions {
    /// Execution mode override, honored only when the scenario allows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_mode_override: Option<ExecutionMode>,
    /// Whether to include the rationale in the response payload.
    #[serde(default = "default_true")]
    pub include_rationale: bool,
    /// Whether to include per-objective score breakdowns.
    #[serde(default)]
    pub include_score_breakdown: bool,
    /// Optional cap on the number of ranked options returned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_ranked_options: Option<usize>,
}

/// Returns `true`; serde default helper.
const fn default_true() -> bool {
    true
}

// ============================================================================
// SECTION: Decision Request
// ============================================================================

/// Decision request accepted by `POST /v1/decide`.
///
/// # Invariants
/// - `decision_id`, when present, is ignored; the server mints its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRequest {
    /// Target scenario identifier.
    pub scenario_id: ScenarioId,
    /// User identifier.
    pub user_id: UserId,
    /// Candidate actions; the engine selects exactly one.
    #[serde(default)]
    pub actions: Vec<ActionCandidate>,
    /// Observed signals keyed by name.
    #[serde(default)]
    pub signals: BTreeMap<String, Value>,
    /// Request context.
    #[serde(default)]
    pub context: RequestContext,
    /// Presentation and execution options.
    #[serde(default)]
    pub options: RequestOptions,
    /// Client-supplied decision identifier; never authoritative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_id: Option<String>,
    /// Optional platform label scoping the user's memory record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}
