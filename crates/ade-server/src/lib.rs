// crates/ade-server/src/lib.rs
// ============================================================================
// Module: ADE Server
// Description: HTTP surface for the Adaptive Decision Engine.
// Purpose: Expose decide, replay, feedback, health, and scenario listing
// over axum.
// Dependencies: ade-core, axum, serde, serde_json, thiserror, tokio, tracing
// ============================================================================

//! ## Overview
//! This crate wires the ADE core into an HTTP service: one engine handle
//! owning the registry, pipeline, stores, and learner registry, plus an
//! axum router mapping the v1 surface. Terminal errors follow the wire
//! contract; non-terminal failures are already converted into fallback
//! responses by the pipeline and never become HTTP errors here.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod engine;
pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use engine::EngineHandle;
pub use server::ApiError;
pub use server::REPLAY_ONLY_HEADER;
pub use server::router;
pub use server::serve;
