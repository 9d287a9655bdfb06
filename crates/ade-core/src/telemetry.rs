// crates/ade-core/src/telemetry.rs
// ============================================================================
// Module: ADE Telemetry
// Description: Observability hooks for pipeline stages and decisions.
// Purpose: Provide metric events and latency buckets without hard deps.
// Dependencies: none
// ============================================================================

//! ## Overview
//! This module exposes a thin metrics interface for stage latencies and
//! decision outcomes. It is intentionally dependency-light so downstream
//! deployments can plug in Prometheus or OpenTelemetry without redesign.
//! Telemetry must never carry rationale text, signals, or memory values.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default latency buckets in milliseconds for stage histograms.
pub const STAGE_LATENCY_BUCKETS_MS: &[u64] =
    &[1, 2, 5, 10, 25, 50, 100, 250, 500, 1_000, 2_500, 5_000];

// ============================================================================
// SECTION: Metric Labels
// ============================================================================

/// Decision outcome classification for counters.
///
/// # Invariants
/// - Variants are stable for telemetry labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionOutcomeLabel {
    /// Pipeline completed with the skill payload.
    Completed,
    /// Pipeline completed through the deterministic fallback.
    CompletedFallback,
    /// Pipeline failed terminally.
    Failed,
}

impl DecisionOutcomeLabel {
    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::CompletedFallback => "completed_fallback",
            Self::Failed => "failed",
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Metrics sink for pipeline stages and decision outcomes.
pub trait EngineMetrics: Send + Sync {
    /// Records a stage latency observation.
    fn record_stage(&self, stage: u8, latency: Duration);

    /// Records a decision outcome with its total duration.
    fn record_decision(&self, outcome: DecisionOutcomeLabel, total: Duration);
}

/// No-op metrics sink.
///
/// # Invariants
/// - Metrics are intentionally discarded.
pub struct NoopMetrics;

impl EngineMetrics for NoopMetrics {
    fn record_stage(&self, _stage: u8, _latency: Duration) {}

    fn record_decision(&self, _outcome: DecisionOutcomeLabel, _total: Duration) {}
}
