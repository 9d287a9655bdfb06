// crates/ade-core/src/learners/mod.rs
// ============================================================================
// Module: ADE Learner Subsystem
// Description: Post-decision evidence writers with hard namespace and
// temporal guards.
// Purpose: Let learners accumulate evidence without ever influencing a
// decision or corrupting committed audit.
// Dependencies: crate::{core, interfaces}, async-trait, serde, serde_json,
// thiserror, tokio
// ============================================================================

//! ## Overview
//! Learners run only after Stage 9 commits, on a snapshot of the committed
//! trace, never on the request path. Two hard guards apply before and after
//! `process`: the input guard refuses any invocation whose input lacks the
//! committed-audit markers, and the namespace guard atomically rejects a
//! result when any update's namespace falls outside `learned.` or begins
//! with a forbidden prefix. Each learner runs in its own task, so a crash,
//! flood, or escalation attempt in one can never starve another.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::identifiers::DecisionId;
use crate::core::identifiers::LearnerId;
use crate::core::identifiers::ScenarioId;
use crate::core::identifiers::SnapshotId;
use crate::core::identifiers::UserId;
use crate::core::memory::MemoryUpdate;
use crate::core::time::Timestamp;
use crate::core::trace::AuditTrace;
use crate::interfaces::MemoryStore;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Namespace prefix every learner write must carry.
pub const LEARNED_NAMESPACE_PREFIX: &str = "learned";
/// Namespace prefixes no learner write may ever carry.
pub const FORBIDDEN_NAMESPACE_PREFIXES: [&str; 4] =
    ["scoring", "guardrails", "execution", "scenario"];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Learner processing errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum LearnerError {
    /// Learner reported a failure.
    #[error("learner failed: {0}")]
    Failed(String),
}

/// Input-guard violations; raised before `process` is ever called.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputGuardError {
    /// Input lacks the decision identifier.
    #[error("learner input lacks decision_id")]
    MissingDecisionId,
    /// Input lacks the finalized decision projection.
    #[error("learner input lacks finalized audit.final_decision")]
    MissingFinalDecision,
    /// Input lacks the audit commit timestamp.
    #[error("learner input lacks audit.timestamp")]
    MissingAuditTimestamp,
    /// Input lacks the pinned memory snapshot identifier.
    #[error("learner input lacks memory_snapshot_id")]
    MissingSnapshotId,
}

/// Namespace-guard violation; rejects the entire learner result.
///
/// # Invariants
/// - Carries the first offending namespace for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("namespace {namespace} is outside the learned.* boundary")]
pub struct NamespaceViolation {
    /// Offending namespace.
    pub namespace: String,
}

// ============================================================================
// SECTION: Learner Contract
// ============================================================================

/// Input snapshot handed to a learner after commit.
///
/// # Invariants
/// - All marker fields are required by the input guard; optional typing
///   exists so the guard has something real to refuse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerInput {
    /// Committed decision identifier.
    pub decision_id: Option<DecisionId>,
    /// Finalized decision projection from the committed trace.
    pub final_decision: Option<Value>,
    /// Audit commit timestamp.
    pub audit_timestamp: Option<Timestamp>,
    /// Pinned memory snapshot identifier.
    pub memory_snapshot_id: Option<SnapshotId>,
    /// Scenario the decision ran against.
    pub scenario_id: Option<ScenarioId>,
    /// User the decision served.
    pub user_id: Option<UserId>,
}

impl LearnerInput {
    /// Projects a committed trace into learner input.
    #[must_use]
    pub fn from_trace(trace: &AuditTrace) -> Self {
        let final_decision = serde_json::to_value(&trace.final_response.decision).ok();
        Self {
            decision_id: Some(trace.decision_id.clone()),
            final_decision,
            audit_timestamp: Some(trace.committed_at),
            memory_snapshot_id: trace.memory_snapshot_id.clone(),
            scenario_id: Some(trace.scenario_id.clone()),
            user_id: Some(trace.request.user_id.clone()),
        }
    }
}

/// Result proposed by a learner.
///
/// # Invariants
/// - Applied atomically: one bad namespace rejects every update.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LearnerResult {
    /// Proposed memory updates.
    pub memory_updates: Vec<MemoryUpdate>,
    /// Optional learner metadata recorded in the outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// Post-decision, out-of-band evidence writer.
#[async_trait]
pub trait Learner: Send + Sync {
    /// Returns the learner identifier.
    fn learner_id(&self) -> LearnerId;

    /// Returns the learner version string.
    fn version(&self) -> String;

    /// Processes committed-decision input into proposed memory updates.
    ///
    /// # Errors
    ///
    /// Returns [`LearnerError`] on failure; failures are isolated per
    /// learner and never propagate.
    async fn process(&self, input: &LearnerInput) -> Result<LearnerResult, LearnerError>;
}

// ============================================================================
// SECTION: Guards
// ============================================================================

/// Hard input guard; refuses invocation on missing committed-audit markers.
///
/// # Errors
///
/// Returns the first [`InputGuardError`] found.
pub fn guard_input(input: &LearnerInput) -> Result<(), InputGuardError> {
    if input.decision_id.as_ref().is_none_or(|id| id.as_str().is_empty()) {
        return Err(InputGuardError::MissingDecisionId);
    }
    if input.final_decision.is_none() {
        return Err(InputGuardError::MissingFinalDecision);
    }
    if input.audit_timestamp.is_none() {
        return Err(InputGuardError::MissingAuditTimestamp);
    }
    if input
        .memory_snapshot_id
        .as_ref()
        .is_none_or(|id| id.as_str().is_empty())
    {
        return Err(InputGuardError::MissingSnapshotId);
    }
    Ok(())
}

/// Atomic namespace guard over a learner result.
///
/// # Errors
///
/// Returns [`NamespaceViolation`] for the first out-of-bounds namespace;
/// callers must then drop the entire result.
pub fn guard_namespaces(updates: &[MemoryUpdate]) -> Result<(), NamespaceViolation> {
    for update in updates {
        let namespace = update.namespace.as_str();
        let in_learned = namespace == LEARNED_NAMESPACE_PREFIX
            || namespace.starts_with(&format!("{LEARNED_NAMESPACE_PREFIX}."));
        let forbidden = FORBIDDEN_NAMESPACE_PREFIXES.iter().any(|prefix| {
            namespace == *prefix || namespace.starts_with(&format!("{prefix}."))
        });
        if !in_learned || forbidden {
            return Err(NamespaceViolation {
                namespace: update.namespace.clone(),
            });
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Per-learner dispatch status.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearnerStatus {
    /// Result accepted and applied.
    Succeeded,
    /// Input guard refused the invocation.
    InputRejected,
    /// Namespace guard rejected the result.
    NamespaceRejected,
    /// Learner errored or crashed.
    Failed,
}

/// Outcome record for one learner dispatch.
///
/// # Invariants
/// - `updates_applied` is zero unless `status` is `Succeeded`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerOutcome {
    /// Learner identifier.
    pub learner_id: LearnerId,
    /// Learner version.
    pub learner_version: String,
    /// Dispatch status.
    pub status: LearnerStatus,
    /// Number of memory updates applied.
    pub updates_applied: usize,
    /// Error detail for rejected or failed dispatches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// SECTION: Learner Registry
// ============================================================================

/// Registry dispatching learners after decision commit.
///
/// # Invariants
/// - Dispatch never runs on the request path.
/// - Each learner runs in its own task; one learner's crash or flood cannot
///   cause another to be skipped.
pub struct LearnerRegistry {
    /// Registered learners in registration order.
    learners: Vec<Arc<dyn Learner>>,
    /// Memory store receiving accepted updates.
    memory_store: Arc<dyn MemoryStore>,
}

impl LearnerRegistry {
    /// Creates an empty registry over a memory store.
    #[must_use]
    pub fn new(memory_store: Arc<dyn MemoryStore>) -> Self {
        Self {
            learners: Vec::new(),
            memory_store,
        }
    }

    /// Registers a learner.
    pub fn register(&mut self, learner: Arc<dyn Learner>) {
        self.learners.push(learner);
    }

    /// Returns the number of registered learners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.learners.len()
    }

    /// Returns true when no learners are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.learners.is_empty()
    }

    /// Dispatches every learner on a committed trace, isolated per learner.
    ///
    /// Returns per-learner outcomes in registration order.
    pub async fn dispatch(&self, trace: &AuditTrace) -> Vec<LearnerOutcome> {
        let input = LearnerInput::from_trace(trace);
        let platform = trace.request.platform.clone().unwrap_or_else(|| "default".to_string());
        let user_id = trace.request.user_id.clone();

        let mut handles = Vec::with_capacity(self.learners.len());
        for learner in &self.learners {
            let learner = Arc::clone(learner);
            let input = input.clone();
            let store = Arc::clone(&self.memory_store);
            let platform = platform.clone();
            let user_id = user_id.clone();
            handles.push((
                learner.learner_id(),
                learner.version(),
                tokio::spawn(async move {
                    run_one_learner(learner, input, store, platform, user_id).await
                }),
            ));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (learner_id, learner_version, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(join_error) => LearnerOutcome {
                    learner_id: learner_id.clone(),
                    learner_version: learner_version.clone(),
                    status: LearnerStatus::Failed,
                    updates_applied: 0,
                    error: Some(format!("learner task crashed: {join_error}")),
                },
            };
            outcomes.push(outcome);
        }
        outcomes
    }
}

/// Runs one learner through both guards and applies accepted updates.
async fn run_one_learner(
    learner: Arc<dyn Learner>,
    input: LearnerInput,
    store: Arc<dyn MemoryStore>,
    platform: String,
    user_id: UserId,
) -> LearnerOutcome {
    let learner_id = learner.learner_id();
    let learner_version = learner.version();

    if let Err(guard) = guard_input(&input) {
        return LearnerOutcome {
            learner_id,
            learner_version,
            status: LearnerStatus::InputRejected,
            updates_applied: 0,
            error: Some(guard.to_string()),
        };
    }

    let result = match learner.process(&input).await {
        Ok(result) => result,
        Err(error) => {
            return LearnerOutcome {
                learner_id,
                learner_version,
                status: LearnerStatus::Failed,
                updates_applied: 0,
                error: Some(error.to_string()),
            };
        }
    };

    if let Err(violation) = guard_namespaces(&result.memory_updates) {
        return LearnerOutcome {
            learner_id,
            learner_version,
            status: LearnerStatus::NamespaceRejected,
            updates_applied: 0,
            error: Some(violation.to_string()),
        };
    }

    match store.apply_updates(&platform, &user_id, &result.memory_updates).await {
        Ok(()) => LearnerOutcome {
            learner_id,
            learner_version,
            status: LearnerStatus::Succeeded,
            updates_applied: result.memory_updates.len(),
            error: None,
        },
        Err(error) => LearnerOutcome {
            learner_id,
            learner_version,
            status: LearnerStatus::Failed,
            updates_applied: 0,
            error: Some(error.to_string()),
        },
    }
}
