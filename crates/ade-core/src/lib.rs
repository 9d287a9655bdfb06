// crates/ade-core/src/lib.rs
// ============================================================================
// Module: ADE Core
// Description: Deterministic policy runtime core for the Adaptive Decision
// Engine.
// Purpose: Select exactly one action per request, attach a validated
// rationale, and emit a cryptographically replayable audit trace.
// Dependencies: async-trait, base64, regex, serde, serde_jcs, serde_json,
// sha2, thiserror, time, tokio, uuid
// ============================================================================

//! ## Overview
//! ADE core implements the nine-stage decision pipeline with its two
//! load-bearing invariants: the selection lock (after ranking, the chosen
//! action is immutable) and the authority boundary (skill enrichment may
//! explain, never select, with a four-phase validator and a deterministic
//! fallback that always succeeds). Around the pipeline it provides the
//! scenario registry with hash immutability, the expression sublanguage,
//! versioned governance tables, audit storage interfaces with an in-memory
//! adapter, the replay comparator, and the governed learner subsystem.
//!
//! Security posture: requests, scenarios, skill output, and learner results
//! are untrusted; every surface fails closed into validation errors or the
//! deterministic fallback.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod expr;
pub mod governance;
pub mod interfaces;
pub mod learners;
pub mod registry;
pub mod runtime;
pub mod stores;
pub mod telemetry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::ActionCandidate;
pub use crate::core::ActionId;
pub use crate::core::ActionTypeId;
pub use crate::core::AuditTrace;
pub use crate::core::DecisionEnvelope;
pub use crate::core::DecisionId;
pub use crate::core::DecisionPayload;
pub use crate::core::DecisionRequest;
pub use crate::core::DecisionResponse;
pub use crate::core::DeterminismVerdict;
pub use crate::core::ExecutionMode;
pub use crate::core::HashDigest;
pub use crate::core::Intensity;
pub use crate::core::LearnerId;
pub use crate::core::MemoryRecord;
pub use crate::core::MemorySnapshot;
pub use crate::core::MemoryUpdate;
pub use crate::core::RankedOption;
pub use crate::core::RuleId;
pub use crate::core::Scenario;
pub use crate::core::ScenarioId;
pub use crate::core::SkillId;
pub use crate::core::SnapshotId;
pub use crate::core::Timestamp;
pub use crate::core::TraceId;
pub use crate::core::UserId;
pub use crate::core::UserState;
pub use crate::core::ValidationReport;
pub use interfaces::AuditStore;
pub use interfaces::AuditStoreError;
pub use interfaces::ExecutionResult;
pub use interfaces::ExecutorError;
pub use interfaces::MemoryStore;
pub use interfaces::MemoryStoreError;
pub use interfaces::SkillExecutor;
pub use interfaces::SkillInputEnvelope;
pub use learners::Learner;
pub use learners::LearnerInput;
pub use learners::LearnerOutcome;
pub use learners::LearnerRegistry;
pub use learners::LearnerResult;
pub use registry::RegistryError;
pub use registry::ScenarioRegistry;
pub use runtime::CancelToken;
pub use runtime::DecisionPipeline;
pub use runtime::EngineError;
pub use runtime::ExecutorRegistry;
pub use runtime::PipelineOutcome;
pub use runtime::RunOptions;
pub use stores::InMemoryAuditStore;
pub use stores::InMemoryMemoryStore;
