// crates/ade-core/src/runtime/stage.rs
// ============================================================================
// Module: ADE Stage Contract
// Description: Stage handler trait, shared context, errors, and cancellation.
// Purpose: Define the surface every pipeline stage implements and the
// resources the orchestrator hands to it.
// Dependencies: crate::core, async-trait, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Stages are registered by number and run in strictly increasing order.
//! Each stage receives the mutable envelope plus a read-only context and
//! returns an artifacts record for the audit trace. Error disposition is the
//! orchestrator's job: stage errors from 1-5 and 9 are terminal, while 6-7
//! route to the deterministic fallback.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::core::envelope::DecisionEnvelope;
use crate::core::identifiers::ActionId;
use crate::core::identifiers::RuleId;
use crate::core::memory::MemoryRecord;
use crate::core::scenario::Scenario;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Stage execution errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - [`StageError::code`] values match the engine's wire error codes.
#[derive(Debug, Error)]
pub enum StageError {
    /// Request is structurally invalid (Stage 1).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Request names an undeclared action type (Stage 1).
    #[error("invalid action type: {0}")]
    InvalidActionType(String),
    /// Guardrails removed every candidate (Stage 3) or ranking found none
    /// (Stage 4).
    #[error("no eligible actions remain")]
    NoEligibleActions {
        /// Guardrail rules that triggered.
        triggered_rules: Vec<RuleId>,
        /// Actions removed from the eligible set.
        blocked_actions: Vec<ActionId>,
    },
    /// Skill execution exceeded its budget (Stage 6, non-terminal).
    #[error("skill execution timed out after {0}ms")]
    SkillTimeout(u64),
    /// Skill execution failed (Stage 6, non-terminal).
    #[error("skill execution failed: {0}")]
    ExecutionError(String),
    /// Skill output failed validation (Stage 7, non-terminal).
    #[error("skill output validation failed: {0}")]
    ValidationFailed(String),
    /// Unexpected internal failure (terminal).
    #[error("internal error: {0}")]
    Internal(String),
}

impl StageError {
    /// Returns the stable wire code for the error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::InvalidActionType(_) => "INVALID_ACTION_TYPE",
            Self::NoEligibleActions { .. } => "NO_ELIGIBLE_ACTIONS",
            Self::SkillTimeout(_) => "SKILL_TIMEOUT",
            Self::ExecutionError(_) => "EXECUTION_ERROR",
            Self::ValidationFailed(_) => "SKILL_VALIDATION_FAILED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

// ============================================================================
// SECTION: Cancellation
// ============================================================================

/// Cooperative cancellation token checked between stages and at suspension
/// points.
///
/// # Invariants
/// - Cancellation is sticky; once set it never clears.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    /// Shared cancellation flag.
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates an uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation has been signaled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

// ============================================================================
// SECTION: Stage Context
// ============================================================================

/// Read-only context handed to every stage.
///
/// # Invariants
/// - The scenario is immutable for the whole run.
/// - `memory_override`, when set, replaces live memory reads (replay).
#[derive(Clone)]
pub struct StageContext {
    /// Scenario resolved for the run.
    pub scenario: Arc<Scenario>,
    /// Pipeline start instant for budget accounting.
    pub run_started: Instant,
    /// Cooperative cancellation token.
    pub cancel: CancelToken,
    /// Pinned memory record for replay verification runs.
    pub memory_override: Option<Arc<MemoryRecord>>,
    /// Whether per-stage artifacts are recorded into the trace.
    pub trace_enabled: bool,
}

impl StageContext {
    /// Returns the remaining total-decision budget in milliseconds.
    #[must_use]
    pub fn remaining_budget_ms(&self) -> u64 {
        let total = self.scenario.execution.timeouts.total_decision_ms;
        let elapsed = u64::try_from(self.run_started.elapsed().as_millis()).unwrap_or(u64::MAX);
        total.saturating_sub(elapsed)
    }
}

// ============================================================================
// SECTION: Stage Handler
// ============================================================================

/// One pipeline stage registered by number.
#[async_trait]
pub trait StageHandler: Send + Sync {
    /// Returns the stage number (1-9).
    fn number(&self) -> u8;

    /// Runs the stage, mutating the envelope and returning trace artifacts.
    ///
    /// # Errors
    ///
    /// Returns [`StageError`]; disposition (terminal versus fallback) is the
    /// orchestrator's responsibility.
    async fn run(
        &self,
        envelope: &mut DecisionEnvelope,
        ctx: &StageContext,
    ) -> Result<Value, StageError>;
}
