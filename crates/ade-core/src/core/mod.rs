// crates/ade-core/src/core/mod.rs
// ============================================================================
// Module: ADE Core Data Model
// Description: Identifiers, time, hashing, and the decision data model.
// Purpose: Provide the canonical types shared by every pipeline stage.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The core module tree defines the data model of the Adaptive Decision
//! Engine: identifiers, timestamps, canonical hashing, scenarios, candidate
//! actions, the decision envelope with its mechanical selection lock, audit
//! traces, and the non-authoritative memory model.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod action;
pub mod envelope;
pub mod hashing;
pub mod identifiers;
pub mod memory;
pub mod request;
pub mod response;
pub mod scenario;
pub mod state;
pub mod time;
pub mod trace;
pub mod validation;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use action::ActionCandidate;
pub use action::Intensity;
pub use envelope::DecisionEnvelope;
pub use envelope::EnvelopeError;
pub use envelope::GuardrailResult;
pub use envelope::LockedSelection;
pub use envelope::ResolvedSkill;
pub use envelope::StageTiming;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use identifiers::ActionId;
pub use identifiers::ActionTypeId;
pub use identifiers::DecisionId;
pub use identifiers::LearnerId;
pub use identifiers::RuleId;
pub use identifiers::ScenarioId;
pub use identifiers::SkillId;
pub use identifiers::SnapshotId;
pub use identifiers::TraceId;
pub use identifiers::UserId;
pub use memory::InteractionEvent;
pub use memory::MemoryRecord;
pub use memory::MemorySnapshot;
pub use memory::MemoryUpdate;
pub use memory::MemoryValue;
pub use request::DecisionRequest;
pub use request::RequestContext;
pub use request::RequestOptions;
pub use response::AuditSection;
pub use response::DecisionPayload;
pub use response::DecisionResponse;
pub use response::DecisionSection;
pub use response::ExecutionSection;
pub use response::MetaSection;
pub use response::RankedOption;
pub use response::ValidationStatus;
pub use scenario::ActionSource;
pub use scenario::ActionTypeDef;
pub use scenario::ActionsConfig;
pub use scenario::AttributeDef;
pub use scenario::AttributeKind;
pub use scenario::Derivation;
pub use scenario::DerivationSource;
pub use scenario::DimensionDef;
pub use scenario::DimensionKind;
pub use scenario::ExecutionConfig;
pub use scenario::ExecutionMode;
pub use scenario::ExecutionRisk;
pub use scenario::GuardrailEffect;
pub use scenario::GuardrailRule;
pub use scenario::GuardrailsConfig;
pub use scenario::NumericRange;
pub use scenario::RiskFactor;
pub use scenario::RuleTarget;
pub use scenario::Scenario;
pub use scenario::ScenarioError;
pub use scenario::ScoringConfig;
pub use scenario::ScoringObjective;
pub use scenario::SkillDef;
pub use scenario::SkillMapping;
pub use scenario::SkillsConfig;
pub use scenario::StateSchema;
pub use scenario::TieBreaker;
pub use scenario::TimeoutBudgets;
pub use state::ExecutionCapabilities;
pub use state::UserState;
pub use time::TimeError;
pub use time::Timestamp;
pub use trace::AuditTrace;
pub use trace::DeterminismVerdict;
pub use validation::FirstFailure;
pub use validation::PhaseResult;
pub use validation::ValidationPhase;
pub use validation::ValidationReport;
pub use validation::ValidationViolation;
