// crates/ade-core/src/core/state.rs
// ============================================================================
// Module: ADE User State
// Description: Derived per-decision user state with replay-stable input hashing.
// Purpose: Carry the state view consumed by guardrails, scoring, and skills.
// Dependencies: crate::core::hashing, serde, serde_json
// ============================================================================

//! ## Overview
//! Stage 2 derives a [`UserState`] from signals, context, and memory in
//! schema-declared order. The embedded `inputs_hash` covers the signals and
//! decision-relevant context so replay verification can prove it saw the
//! same inputs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::hashing::HashDigest;

// ============================================================================
// SECTION: Execution Capabilities
// ============================================================================

/// Execution capabilities derived from request platform constraints.
///
/// # Invariants
/// - Values are snapshots of the request; stages must not mutate them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExecutionCapabilities {
    /// Platform label when supplied by the caller.
    #[serde(default)]
    pub platform: Option<String>,
    /// Raw platform constraints from the request.
    #[serde(default)]
    pub constraints: BTreeMap<String, Value>,
}

// ============================================================================
// SECTION: User State
// ============================================================================

/// Derived user state for one decision.
///
/// # Invariants
/// - `core` and `scenario_extensions` hold every schema dimension, falling
///   back to declared defaults when sources are unavailable.
/// - `inputs_hash` is the canonical hash of the signals and relevant context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserState {
    /// Core dimension values keyed by dimension name.
    pub core: BTreeMap<String, Value>,
    /// Scenario extension dimension values keyed by dimension name.
    pub scenario_extensions: BTreeMap<String, Value>,
    /// Execution capabilities for skill input.
    pub capabilities: ExecutionCapabilities,
    /// Canonical hash of the derive-time inputs.
    pub inputs_hash: HashDigest,
}

impl UserState {
    /// Reads a core dimension as a float, when present and numeric.
    #[must_use]
    pub fn core_number(&self, name: &str) -> Option<f64> {
        self.core.get(name).and_then(Value::as_f64)
    }
}
