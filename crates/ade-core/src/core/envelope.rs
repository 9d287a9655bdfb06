// crates/ade-core/src/core/envelope.rs
// ============================================================================
// Module: ADE Decision Envelope
// Description: Per-run accumulator with the mechanical selection lock.
// Purpose: Carry stage artifacts through the pipeline and make the locked
// selection immutable beyond Stage 4.
// Dependencies: crate::core::{action, hashing, identifiers, request, response,
// scenario, state, time}, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The envelope is owned by exactly one pipeline run and mutated only by the
//! currently-executing stage. The three selection fields live inside a
//! private [`LockedSelection`] record that is settable exactly once via
//! [`DecisionEnvelope::lock_selection`]; no public surface can rewrite them
//! afterwards, which is what makes the selection lock mechanical rather than
//! conventional.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::action::ActionCandidate;
use crate::core::hashing::HashDigest;
use crate::core::identifiers::ActionId;
use crate::core::identifiers::DecisionId;
use crate::core::identifiers::RuleId;
use crate::core::identifiers::ScenarioId;
use crate::core::identifiers::SkillId;
use crate::core::identifiers::SnapshotId;
use crate::core::identifiers::TraceId;
use crate::core::request::DecisionRequest;
use crate::core::response::DecisionPayload;
use crate::core::response::RankedOption;
use crate::core::scenario::ExecutionMode;
use crate::core::state::UserState;
use crate::core::time::Timestamp;
use crate::core::validation::ValidationReport;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Envelope mutation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The selection was already locked by an earlier stage.
    #[error("selection already locked for decision {0}")]
    AlreadyLocked(DecisionId),
    /// A locked-selection read was attempted before Stage 4.
    #[error("selection not locked for decision {0}")]
    NotLocked(DecisionId),
}

// ============================================================================
// SECTION: Stage Records
// ============================================================================

/// Per-stage timing record.
///
/// # Invariants
/// - `ended_at >= started_at` once the stage completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTiming {
    /// Stage number (1-9).
    pub stage: u8,
    /// Stage start time.
    pub started_at: Timestamp,
    /// Stage end time, set when the stage returns.
    pub ended_at: Option<Timestamp>,
}

impl StageTiming {
    /// Returns the stage duration in milliseconds, zero while running.
    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        self.ended_at.map_or(0, |ended| self.started_at.millis_until(ended))
    }
}

/// Outcome record for one guardrail rule evaluation.
///
/// # Invariants
/// - Emitted for every rule regardless of trigger state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardrailResult {
    /// Rule identifier.
    pub rule_id: RuleId,
    /// Whether the rule condition held.
    pub triggered: bool,
    /// Stable effect label (`block_action`, `force_action`, ...).
    pub effect: String,
    /// Actions removed from the eligible set by this rule.
    pub blocked_action_ids: Vec<ActionId>,
}

/// Skill resolution record from Stage 5.
///
/// # Invariants
/// - `resolution_reason` is one of `primary`, `fallback_unavailable`,
///   `mode_override`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSkill {
    /// Resolved skill identifier.
    pub skill_id: SkillId,
    /// Resolved skill version.
    pub skill_version: String,
    /// Effective execution mode.
    pub execution_mode: ExecutionMode,
    /// Why this skill was chosen.
    pub resolution_reason: String,
}

// ============================================================================
// SECTION: Locked Selection
// ============================================================================

/// Selection fields frozen by Stage 4.
///
/// Fields are private; the envelope exposes read accessors only, so no later
/// stage can rewrite the selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockedSelection {
    /// Selected action identifier.
    selected_action: ActionId,
    /// Ranked options at lock time.
    ranked_options: Vec<RankedOption>,
    /// Lock timestamp.
    locked_at: Timestamp,
}

impl LockedSelection {
    /// Returns the selected action identifier.
    #[must_use]
    pub fn selected_action(&self) -> &ActionId {
        &self.selected_action
    }

    /// Returns the ranked options frozen at lock time.
    #[must_use]
    pub fn ranked_options(&self) -> &[RankedOption] {
        &self.ranked_options
    }

    /// Returns the lock timestamp.
    #[must_use]
    pub const fn locked_at(&self) -> Timestamp {
        self.locked_at
    }
}

// ============================================================================
// SECTION: Decision Envelope
// ============================================================================

/// Accumulator passed through all nine pipeline stages.
///
/// # Invariants
/// - Created at pipeline start; mutated only by the currently-executing stage.
/// - `selection` is settable exactly once; the locked fields are immutable
///   afterwards.
/// - Projected into an audit trace and discarded after Stage 9.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionEnvelope {
    /// Server-minted decision identifier.
    pub decision_id: DecisionId,
    /// Scenario identifier.
    pub scenario_id: ScenarioId,
    /// Scenario version.
    pub scenario_version: String,
    /// Scenario content hash.
    pub scenario_hash: HashDigest,
    /// Envelope creation time.
    pub created_at: Timestamp,
    /// Per-stage timing records.
    pub stage_timings: Vec<StageTiming>,
    /// Original request as received.
    pub request: DecisionRequest,
    /// Normalized candidate actions from Stage 1.
    pub normalized_actions: Vec<ActionCandidate>,
    /// Derived user state from Stage 2.
    pub user_state: Option<UserState>,
    /// Per-rule guardrail results from Stage 3.
    pub guardrail_results: Vec<GuardrailResult>,
    /// Surviving eligible action identifiers after Stage 3.
    pub eligible_actions: Vec<ActionId>,
    /// Forced action identifier set by a triggered force rule.
    pub forced_action: Option<ActionId>,
    /// Selection margin (top score minus runner-up, 1.0 for a single option).
    pub selection_margin: Option<f64>,
    /// Skill resolution from Stage 5.
    pub resolved_skill: Option<ResolvedSkill>,
    /// Raw skill output from Stage 6, pending validation.
    pub skill_output: Option<Value>,
    /// Token count reported by the executor.
    pub skill_token_count: Option<u32>,
    /// Skill execution duration in milliseconds.
    pub skill_execution_ms: Option<u64>,
    /// Four-phase validation report from Stage 7.
    pub validation: Option<ValidationReport>,
    /// Whether a non-terminal failure routed the run to Stage 8.
    pub fallback_triggered: bool,
    /// Stable reason code for the fallback route.
    pub fallback_reason_code: Option<String>,
    /// Payload synthesized by Stage 8.
    pub fallback_payload: Option<DecisionPayload>,
    /// Validated (or fallback) payload chosen for the response.
    pub final_payload: Option<DecisionPayload>,
    /// Replay token computed by Stage 9.
    pub replay_token: Option<String>,
    /// Trace identifier computed by Stage 9.
    pub trace_id: Option<TraceId>,
    /// Memory snapshot pinned by Stage 9 for learner dispatch.
    pub memory_snapshot_id: Option<SnapshotId>,
    /// Locked selection; private record set exactly once.
    selection: Option<LockedSelection>,
}

impl DecisionEnvelope {
    /// Creates an envelope for one pipeline run, minting the decision id.
    #[must_use]
    pub fn create(
        request: DecisionRequest,
        scenario_id: ScenarioId,
        scenario_version: impl Into<String>,
        scenario_hash: HashDigest,
    ) -> Self {
        Self {
            decision_id: DecisionId::mint(),
            scenario_id,
            scenario_version: scenario_version.into(),
            scenario_hash,
            created_at: Timestamp::now(),
            stage_timings: Vec::new(),
            request,
            normalized_actions: Vec::new(),
            user_state: None,
            guardrail_results: Vec::new(),
            eligible_actions: Vec::new(),
            forced_action: None,
            selection_margin: None,
            resolved_skill: None,
            skill_output: None,
            skill_token_count: None,
            skill_execution_ms: None,
            validation: None,
            fallback_triggered: false,
            fallback_reason_code: None,
            fallback_payload: None,
            final_payload: None,
            replay_token: None,
            trace_id: None,
            memory_snapshot_id: None,
            selection: None,
        }
    }

    /// Locks the selection; callable exactly once per envelope.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::AlreadyLocked`] when a selection is present.
    pub fn lock_selection(
        &mut self,
        selected_action: ActionId,
        ranked_options: Vec<RankedOption>,
    ) -> Result<(), EnvelopeError> {
        if self.selection.is_some() {
            return Err(EnvelopeError::AlreadyLocked(self.decision_id.clone()));
        }
        self.selection = Some(LockedSelection {
            selected_action,
            ranked_options,
            locked_at: Timestamp::now(),
        });
        Ok(())
    }

    /// Returns true once the selection is locked.
    #[must_use]
    pub const fn selection_locked(&self) -> bool {
        self.selection.is_some()
    }

    /// Returns the locked selection record.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::NotLocked`] before Stage 4 locks.
    pub fn selection(&self) -> Result<&LockedSelection, EnvelopeError> {
        self.selection
            .as_ref()
            .ok_or_else(|| EnvelopeError::NotLocked(self.decision_id.clone()))
    }

    /// Returns the selected action identifier once locked.
    #[must_use]
    pub fn selected_action(&self) -> Option<&ActionId> {
        self.selection.as_ref().map(LockedSelection::selected_action)
    }

    /// Returns the ranked options once locked.
    #[must_use]
    pub fn ranked_options(&self) -> Option<&[RankedOption]> {
        self.selection.as_ref().map(LockedSelection::ranked_options)
    }

    /// Returns the lock timestamp once locked.
    #[must_use]
    pub fn selection_locked_at(&self) -> Option<Timestamp> {
        self.selection.as_ref().map(LockedSelection::locked_at)
    }

    /// Returns true iff the selection is locked and equals `expected`.
    #[must_use]
    pub fn verify_selection_integrity(&self, expected: &ActionId) -> bool {
        self.selection
            .as_ref()
            .is_some_and(|selection| selection.selected_action() == expected)
    }

    /// Returns the normalized candidate matching the locked selection.
    #[must_use]
    pub fn selected_candidate(&self) -> Option<&ActionCandidate> {
        let selected = self.selected_action()?;
        self.normalized_actions.iter().find(|candidate| &candidate.action_id == selected)
    }

    /// Returns the identifiers of guardrail rules that triggered.
    #[must_use]
    pub fn triggered_guardrails(&self) -> Vec<RuleId> {
        self.guardrail_results
            .iter()
            .filter(|result| result.triggered)
            .map(|result| result.rule_id.clone())
            .collect()
    }
}
