// crates/ade-core/src/runtime/validation.rs
// ============================================================================
// Module: ADE Output Validator
// Description: Four-phase validation of skill output against schema,
// invariants, and the governance tables.
// Purpose: Keep skills inside the authority boundary; any failure forces the
// deterministic fallback.
// Dependencies: crate::{core, governance}, serde_json
// ============================================================================

//! ## Overview
//! The validator runs the four phases in order (schema, invariants,
//! authority, prohibitions) over the raw skill output, always executing all
//! four so the report is complete. Pattern scans see the recursive string
//! extraction of the payload, so violations cannot hide in nested display
//! parameters.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;

use crate::core::envelope::DecisionEnvelope;
use crate::core::validation::MAX_OUTPUT_TOKEN_COUNT;
use crate::core::validation::PROHIBITED_SELECTION_KEYS;
use crate::core::validation::PhaseResult;
use crate::core::validation::RATIONALE_MAX_LEN;
use crate::core::validation::RATIONALE_MIN_LEN;
use crate::core::validation::ValidationPhase;
use crate::core::validation::ValidationReport;
use crate::core::validation::ValidationViolation;
use crate::governance::GovernanceTables;
use crate::governance::extract_text;

// ============================================================================
// SECTION: Output Validator
// ============================================================================

/// Four-phase output validator bound to compiled governance tables.
///
/// # Invariants
/// - Validation is pure over `(envelope, output)`; equal inputs yield equal
///   reports.
#[derive(Debug, Clone)]
pub struct OutputValidator {
    /// Compiled governance tables.
    tables: Arc<GovernanceTables>,
}

impl OutputValidator {
    /// Creates a validator over shared governance tables.
    #[must_use]
    pub const fn new(tables: Arc<GovernanceTables>) -> Self {
        Self {
            tables,
        }
    }

    /// Runs all four phases and assembles the composite report.
    #[must_use]
    pub fn validate(&self, envelope: &DecisionEnvelope, output: &Value) -> ValidationReport {
        let payload_text = output.get("payload").map_or_else(String::new, extract_text);
        let phases = vec![
            validate_schema(output),
            validate_invariants(envelope, output),
            self.validate_authority(&payload_text),
            self.validate_prohibitions(&payload_text),
        ];
        ValidationReport::assemble(phases)
    }

    /// Phase 3: authority-boundary pattern scan.
    fn validate_authority(&self, text: &str) -> PhaseResult {
        let violations = self
            .tables
            .authority
            .scan(text)
            .into_iter()
            .map(ValidationViolation::from)
            .collect();
        PhaseResult::new(ValidationPhase::Authority, violations)
    }

    /// Phase 4: universal prohibition and PII pattern scan.
    fn validate_prohibitions(&self, text: &str) -> PhaseResult {
        let violations = self
            .tables
            .prohibition
            .scan(text)
            .into_iter()
            .map(ValidationViolation::from)
            .collect();
        PhaseResult::new(ValidationPhase::Prohibitions, violations)
    }
}

// ============================================================================
// SECTION: Phase 1 — Schema
// ============================================================================

/// Checks required fields and rationale length bounds.
fn validate_schema(output: &Value) -> PhaseResult {
    let mut violations = Vec::new();
    let Some(object) = output.as_object() else {
        violations.push(ValidationViolation {
            check_id: "SCHEMA-NOT-OBJECT".to_string(),
            detail: "skill output must be a JSON object".to_string(),
            matched_text: None,
            pattern_version: None,
        });
        return PhaseResult::new(ValidationPhase::Schema, violations);
    };
    for required in ["payload", "metadata"] {
        if !object.contains_key(required) {
            violations.push(ValidationViolation {
                check_id: "SCHEMA-MISSING-FIELD".to_string(),
                detail: format!("required field missing: {required}"),
                matched_text: None,
                pattern_version: None,
            });
        }
    }
    if let Some(rationale) = object
        .get("payload")
        .and_then(|payload| payload.get("rationale"))
        .and_then(Value::as_str)
    {
        let length = rationale.chars().count();
        if length < RATIONALE_MIN_LEN || length > RATIONALE_MAX_LEN {
            violations.push(ValidationViolation {
                check_id: "SCHEMA-RATIONALE-LENGTH".to_string(),
                detail: format!(
                    "rationale length {length} outside [{RATIONALE_MIN_LEN}, {RATIONALE_MAX_LEN}]"
                ),
                matched_text: None,
                pattern_version: None,
            });
        }
    }
    PhaseResult::new(ValidationPhase::Schema, violations)
}

// ============================================================================
// SECTION: Phase 2 — Invariants
// ============================================================================

/// Checks the selection lock, prohibited keys, and the token ceiling.
fn validate_invariants(envelope: &DecisionEnvelope, output: &Value) -> PhaseResult {
    let mut violations = Vec::new();
    if !envelope.selection_locked() {
        violations.push(ValidationViolation {
            check_id: "INV-SELECTION-UNLOCKED".to_string(),
            detail: "selection must be locked before output validation".to_string(),
            matched_text: None,
            pattern_version: None,
        });
    }
    if let Some(key) = find_prohibited_key(output) {
        violations.push(ValidationViolation {
            check_id: "INV-PROHIBITED-KEY".to_string(),
            detail: format!("payload carries prohibited selection key: {key}"),
            matched_text: None,
            pattern_version: None,
        });
    }
    if let Some(token_count) = envelope.skill_token_count
        && token_count > MAX_OUTPUT_TOKEN_COUNT
    {
        violations.push(ValidationViolation {
            check_id: "INV-TOKEN-COUNT".to_string(),
            detail: format!("token count {token_count} exceeds {MAX_OUTPUT_TOKEN_COUNT}"),
            matched_text: None,
            pattern_version: None,
        });
    }
    PhaseResult::new(ValidationPhase::Invariants, violations)
}

/// Finds the first prohibited selection key anywhere in the value tree.
#[must_use]
pub fn find_prohibited_key(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                if PROHIBITED_SELECTION_KEYS.contains(&key.as_str()) {
                    return Some(key.clone());
                }
                if let Some(found) = find_prohibited_key(nested) {
                    return Some(found);
                }
            }
            None
        }
        Value::Array(items) => items.iter().find_map(find_prohibited_key),
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => None,
    }
}
