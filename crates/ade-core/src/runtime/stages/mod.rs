// crates/ade-core/src/runtime/stages/mod.rs
// ============================================================================
// Module: ADE Pipeline Stages
// Description: The nine stage handlers of the decision pipeline.
// Purpose: Group stage implementations registered by the orchestrator.
// Dependencies: crate::runtime::stage
// ============================================================================

//! ## Overview
//! One module per stage, numbered 1-9: ingest, derive-state, guardrails,
//! score-and-rank (the selection locks there), resolve-skills, execute-skill,
//! validate-output, fallback, and audit-and-replay.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod derive;
pub mod execute;
pub mod fallback;
pub mod guardrails;
pub mod ingest;
pub mod ranking;
pub mod resolve;
pub mod validate;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditReplayStage;
pub use audit::decode_replay_token;
pub use audit::encode_replay_token;
pub use derive::DeriveStateStage;
pub use execute::ExecuteSkillStage;
pub use fallback::FallbackStage;
pub use guardrails::GuardrailsStage;
pub use ingest::IngestStage;
pub use ranking::ScoreRankStage;
pub use ranking::TIE_EPSILON;
pub use resolve::ResolveSkillsStage;
pub use validate::ValidateOutputStage;
