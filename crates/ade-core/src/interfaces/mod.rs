// crates/ade-core/src/interfaces/mod.rs
// ============================================================================
// Module: ADE Interfaces
// Description: Backend-agnostic interfaces for audit storage, memory, and
// skill execution.
// Purpose: Define the contract surfaces used by the ADE runtime.
// Dependencies: crate::core, async-trait, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Interfaces define how the engine integrates with external systems without
//! embedding backend-specific details. Audit stores must preserve trace
//! immutability (deep copy on write and on read); memory stores are
//! non-authoritative and read failures fall through to declared defaults;
//! skill executors are the pipeline's only model-facing suspension point.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::action::ActionCandidate;
use crate::core::identifiers::DecisionId;
use crate::core::identifiers::RuleId;
use crate::core::identifiers::SkillId;
use crate::core::identifiers::SnapshotId;
use crate::core::identifiers::UserId;
use crate::core::memory::MemoryRecord;
use crate::core::memory::MemorySnapshot;
use crate::core::memory::MemoryUpdate;
use crate::core::response::RankedOption;
use crate::core::scenario::ExecutionMode;
use crate::core::state::UserState;
use crate::core::trace::AuditTrace;
use crate::core::trace::DeterminismVerdict;

// ============================================================================
// SECTION: Audit Store
// ============================================================================

/// Audit store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum AuditStoreError {
    /// A trace already exists for the decision (write-once violation).
    #[error("audit trace already stored for decision {0}")]
    Duplicate(DecisionId),
    /// Stored trace bytes fail structural checks.
    #[error("audit store corruption: {0}")]
    Corrupt(String),
    /// Store backend reported an error.
    #[error("audit store error: {0}")]
    Store(String),
}

/// Audit trace store with replay-token addressing.
///
/// Implementations must deep-copy on write and on read so later envelope or
/// caller mutation cannot alter stored history.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Stores a trace exactly once per decision.
    ///
    /// # Errors
    ///
    /// Returns [`AuditStoreError::Duplicate`] for a second write under the
    /// same decision identifier.
    async fn store(&self, trace: &AuditTrace) -> Result<(), AuditStoreError>;

    /// Retrieves a trace by decision identifier.
    ///
    /// # Errors
    ///
    /// Returns [`AuditStoreError`] when retrieval fails.
    async fn retrieve(&self, decision_id: &DecisionId)
    -> Result<Option<AuditTrace>, AuditStoreError>;

    /// Retrieves a trace by its replay token.
    ///
    /// # Errors
    ///
    /// Returns [`AuditStoreError`] when retrieval fails.
    async fn retrieve_by_token(&self, token: &str) -> Result<Option<AuditTrace>, AuditStoreError>;

    /// Reports whether a trace exists for the decision.
    ///
    /// # Errors
    ///
    /// Returns [`AuditStoreError`] when the check fails.
    async fn exists(&self, decision_id: &DecisionId) -> Result<bool, AuditStoreError>;

    /// Records a determinism verification verdict for a stored trace.
    ///
    /// # Errors
    ///
    /// Returns [`AuditStoreError`] when the trace is unknown or the write
    /// fails.
    async fn store_verification(
        &self,
        decision_id: &DecisionId,
        verdict: DeterminismVerdict,
    ) -> Result<(), AuditStoreError>;
}

// ============================================================================
// SECTION: Memory Store
// ============================================================================

/// Memory store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Read failures never abort a decision; callers fall back to defaults.
#[derive(Debug, Error)]
pub enum MemoryStoreError {
    /// Stored record bytes fail structural checks.
    #[error("memory store corruption: {0}")]
    Corrupt(String),
    /// Store backend reported an error.
    #[error("memory store error: {0}")]
    Store(String),
    /// Unknown snapshot identifier.
    #[error("unknown memory snapshot: {0}")]
    UnknownSnapshot(SnapshotId),
}

/// Non-authoritative per-user memory store with snapshot pinning.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Loads the memory record for a platform and user.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryStoreError`] when the read fails; callers must treat
    /// this the same as an absent record.
    async fn load(
        &self,
        platform: &str,
        user_id: &UserId,
    ) -> Result<Option<MemoryRecord>, MemoryStoreError>;

    /// Applies namespaced updates with per-key read-modify-write semantics.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryStoreError`] when the write fails.
    async fn apply_updates(
        &self,
        platform: &str,
        user_id: &UserId,
        updates: &[MemoryUpdate],
    ) -> Result<(), MemoryStoreError>;

    /// Persists an immutable snapshot under its content address.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryStoreError`] when the write fails.
    async fn store_snapshot(&self, snapshot: &MemorySnapshot) -> Result<(), MemoryStoreError>;

    /// Loads a snapshot by content address.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryStoreError`] when the read fails.
    async fn load_snapshot(
        &self,
        snapshot_id: &SnapshotId,
    ) -> Result<Option<MemorySnapshot>, MemoryStoreError>;
}

// ============================================================================
// SECTION: Skill Executor
// ============================================================================

/// Default output token ceiling handed to executors.
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 150;

/// Skill executor errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Every variant routes the pipeline to the deterministic fallback.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Execution exceeded the skill timeout budget.
    #[error("skill execution timed out after {0}ms")]
    Timeout(u64),
    /// Executor reported a failure.
    #[error("skill execution failed: {0}")]
    Failed(String),
    /// Executor is not available for this mode.
    #[error("executor unavailable: {0}")]
    Unavailable(String),
}

/// Decision context projected into skill input.
///
/// # Invariants
/// - `selected_action` reflects the locked selection; executors receive a
///   copy and cannot influence it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillDecisionContext {
    /// Decision identifier.
    pub decision_id: DecisionId,
    /// Locked selected action with its attributes.
    pub selected_action: ActionCandidate,
    /// Ranked options projection at lock time.
    pub ranked_options: Vec<RankedOption>,
    /// Identifiers of triggered guardrail rules.
    pub triggered_guardrails: Vec<RuleId>,
}

/// Skill invocation configuration.
///
/// # Invariants
/// - `max_output_tokens` defaults to [`DEFAULT_MAX_OUTPUT_TOKENS`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillInvocationConfig {
    /// Skill identifier.
    pub skill_id: SkillId,
    /// Skill version.
    pub skill_version: String,
    /// Effective execution mode.
    pub execution_mode: ExecutionMode,
    /// Output token ceiling.
    pub max_output_tokens: u32,
    /// Skill execution timeout in milliseconds.
    pub timeout_ms: u64,
    /// Custom parameters from the scenario's skill declaration.
    pub params: BTreeMap<String, Value>,
}

/// Complete input envelope handed to a skill executor.
///
/// # Invariants
/// - Values are snapshots; executors must not expect mutation to propagate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillInputEnvelope {
    /// Decision context.
    pub decision: SkillDecisionContext,
    /// Derived user state.
    pub user_state: UserState,
    /// Invocation configuration.
    pub skill: SkillInvocationConfig,
}

/// Result of one executor invocation.
///
/// # Invariants
/// - `output` is present iff `success` is true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Whether execution produced output.
    pub success: bool,
    /// Raw skill output (`{payload, metadata}`) when successful.
    pub output: Option<Value>,
    /// Error description when unsuccessful.
    pub error: Option<String>,
    /// Execution duration in milliseconds.
    pub execution_ms: u64,
    /// Token count attributed to the output.
    pub token_count: u32,
}

/// Skill executor bound to one execution mode.
#[async_trait]
pub trait SkillExecutor: Send + Sync {
    /// Returns the execution mode this executor serves.
    fn executor_mode(&self) -> ExecutionMode;

    /// Reports whether the executor can currently serve requests.
    fn is_available(&self) -> bool;

    /// Returns a latency estimate in milliseconds for scheduling decisions.
    fn latency_estimate_ms(&self) -> u64;

    /// Executes a skill under the supplied timeout budget.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError`] on failure or timeout; the pipeline converts
    /// every executor error into a deterministic fallback.
    async fn execute(
        &self,
        input: &SkillInputEnvelope,
        timeout_ms: u64,
    ) -> Result<ExecutionResult, ExecutorError>;
}
