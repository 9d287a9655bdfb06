// crates/ade-core/src/runtime/comparator.rs
// ============================================================================
// Module: ADE Replay Comparator
// Description: Criticality-partitioned comparison of original and replayed
// responses.
// Purpose: Decide determinism verification outcomes from field-level
// differences.
// Dependencies: crate::core, serde, serde_json
// ============================================================================

//! ## Overview
//! The comparator partitions response fields by criticality. Critical fields
//! must match for determinism to verify: the selected action, ranked options
//! (identifier and rank exact, score within tolerance), triggered guardrails
//! as a set, and both derived-state subtrees. Identifier and timing fields
//! are ignored because they legitimately differ between runs; everything
//! else is reported as minor without affecting the verdict.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

use crate::core::response::DecisionResponse;
use crate::core::trace::DeterminismVerdict;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Absolute tolerance for ranked-option score comparison.
pub const SCORE_TOLERANCE: f64 = 1e-4;

/// Leaf paths ignored by the comparator (legitimately differ across runs).
const IGNORED_PREFIXES: &[&str] = &[
    "decision.decision_id",
    "audit.",
    "meta.request_id",
    "meta.timestamp",
    "meta.total_duration_ms",
];

/// Subtrees handled by dedicated critical comparisons.
const HANDLED_PREFIXES: &[&str] =
    &["decision.selected_action", "decision.ranked_options", "guardrails_applied"];

// ============================================================================
// SECTION: Comparison Records
// ============================================================================

/// Criticality of a differing field.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldCriticality {
    /// Difference fails determinism verification.
    Critical,
    /// Difference is reported but does not affect the verdict.
    Minor,
}

/// One field-level difference between original and replay.
///
/// # Invariants
/// - `path` is the dotted field path within the response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDifference {
    /// Dotted field path.
    pub path: String,
    /// Difference criticality.
    pub criticality: FieldCriticality,
    /// Value observed in the original response.
    pub original: Value,
    /// Value observed in the replayed response.
    pub replay: Value,
}

/// Comparator output with the determinism verdict.
///
/// # Invariants
/// - `verdict` is `Verified` iff `critical` is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayComparison {
    /// Determinism verdict.
    pub verdict: DeterminismVerdict,
    /// Critical differences.
    pub critical: Vec<FieldDifference>,
    /// Minor differences.
    pub minor: Vec<FieldDifference>,
}

// ============================================================================
// SECTION: Comparator
// ============================================================================

/// Compares two responses and partitions their differences by criticality.
#[must_use]
pub fn compare_responses(
    original: &DecisionResponse,
    replay: &DecisionResponse,
) -> ReplayComparison {
    let mut critical = Vec::new();
    let mut minor = Vec::new();

    compare_selection(original, replay, &mut critical);
    compare_ranked_options(original, replay, &mut critical);
    compare_guardrails(original, replay, &mut critical);
    compare_generic(original, replay, &mut critical, &mut minor);

    let verdict = if critical.is_empty() {
        DeterminismVerdict::Verified
    } else {
        DeterminismVerdict::Failed
    };
    ReplayComparison {
        verdict,
        critical,
        minor,
    }
}

/// Critical: selected action identity.
fn compare_selection(
    original: &DecisionResponse,
    replay: &DecisionResponse,
    critical: &mut Vec<FieldDifference>,
) {
    if original.decision.selected_action != replay.decision.selected_action {
        critical.push(FieldDifference {
            path: "decision.selected_action".to_string(),
            criticality: FieldCriticality::Critical,
            original: json!(original.decision.selected_action),
            replay: json!(replay.decision.selected_action),
        });
    }
}

/// Critical: ranked options with exact ids/ranks and tolerant scores.
fn compare_ranked_options(
    original: &DecisionResponse,
    replay: &DecisionResponse,
    critical: &mut Vec<FieldDifference>,
) {
    let lhs = &original.decision.ranked_options;
    let rhs = &replay.decision.ranked_options;
    if lhs.len() != rhs.len() {
        critical.push(FieldDifference {
            path: "decision.ranked_options.len".to_string(),
            criticality: FieldCriticality::Critical,
            original: json!(lhs.len()),
            replay: json!(rhs.len()),
        });
        return;
    }
    for (index, (left, right)) in lhs.iter().zip(rhs.iter()).enumerate() {
        if left.action_id != right.action_id || left.rank != right.rank {
            critical.push(FieldDifference {
                path: format!("decision.ranked_options[{index}]"),
                criticality: FieldCriticality::Critical,
                original: json!({"action_id": left.action_id, "rank": left.rank}),
                replay: json!({"action_id": right.action_id, "rank": right.rank}),
            });
            continue;
        }
        if (left.score - right.score).abs() > SCORE_TOLERANCE {
            critical.push(FieldDifference {
                path: format!("decision.ranked_options[{index}].score"),
                criticality: FieldCriticality::Critical,
                original: json!(left.score),
                replay: json!(right.score),
            });
        }
    }
}

/// Critical: triggered guardrail set equality.
fn compare_guardrails(
    original: &DecisionResponse,
    replay: &DecisionResponse,
    critical: &mut Vec<FieldDifference>,
) {
    let lhs: BTreeSet<&str> =
        original.guardrails_applied.iter().map(|rule| rule.as_str()).collect();
    let rhs: BTreeSet<&str> = replay.guardrails_applied.iter().map(|rule| rule.as_str()).collect();
    if lhs != rhs {
        critical.push(FieldDifference {
            path: "guardrails_applied".to_string(),
            criticality: FieldCriticality::Critical,
            original: json!(original.guardrails_applied),
            replay: json!(replay.guardrails_applied),
        });
    }
}

/// Walks the remaining response fields; state subtrees escalate to critical.
fn compare_generic(
    original: &DecisionResponse,
    replay: &DecisionResponse,
    critical: &mut Vec<FieldDifference>,
    minor: &mut Vec<FieldDifference>,
) {
    let lhs = serde_json::to_value(original).unwrap_or(Value::Null);
    let rhs = serde_json::to_value(replay).unwrap_or(Value::Null);
    let mut differences = Vec::new();
    walk_differences(String::new(), &lhs, &rhs, &mut differences);
    for difference in differences {
        match difference.criticality {
            FieldCriticality::Critical => critical.push(difference),
            FieldCriticality::Minor => minor.push(difference),
        }
    }
}

/// Recursively collects leaf differences outside handled/ignored subtrees.
fn walk_differences(
    path: String,
    original: &Value,
    replay: &Value,
    out: &mut Vec<FieldDifference>,
) {
    if is_ignored(&path) || is_handled(&path) {
        return;
    }
    match (original, replay) {
        (Value::Object(lhs), Value::Object(rhs)) => {
            let keys: BTreeSet<&String> = lhs.keys().chain(rhs.keys()).collect();
            for key in keys {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                let left = lhs.get(key).unwrap_or(&Value::Null);
                let right = rhs.get(key).unwrap_or(&Value::Null);
                walk_differences(child_path, left, right, out);
            }
        }
        _ => {
            if original != replay {
                out.push(FieldDifference {
                    path: path.clone(),
                    criticality: classify(&path),
                    original: original.clone(),
                    replay: replay.clone(),
                });
            }
        }
    }
}

/// State subtrees are critical; everything else left to the walk is minor.
fn classify(path: &str) -> FieldCriticality {
    if path.starts_with("state.core") || path.starts_with("state.scenario_extensions") {
        FieldCriticality::Critical
    } else {
        FieldCriticality::Minor
    }
}

/// Returns true for ignored paths.
fn is_ignored(path: &str) -> bool {
    IGNORED_PREFIXES.iter().any(|prefix| {
        path == prefix.trim_end_matches('.') || path.starts_with(prefix)
    })
}

/// Returns true for subtrees handled by dedicated comparisons.
fn is_handled(path: &str) -> bool {
    HANDLED_PREFIXES.iter().any(|prefix| path == *prefix || path.starts_with(*prefix))
}
