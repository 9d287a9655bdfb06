// crates/ade-core/src/core/validation.rs
// ============================================================================
// Module: ADE Validation Records
// Description: Four-phase validation results carried by envelopes and traces.
// Purpose: Record per-phase outcomes and the first-failure pointer with
// authority violations reported ahead of other categories.
// Dependencies: crate::governance, serde
// ============================================================================

//! ## Overview
//! Stage 7 runs four sequential validation phases over skill output: schema,
//! invariants, authority boundary, and prohibitions. Each phase produces a
//! result record; the composite first-failure pointer surfaces authority
//! violations ahead of every other category so operators always see the
//! highest-severity finding first.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::governance::PatternViolation;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Payload keys a skill may never emit; any occurrence forces fallback.
pub const PROHIBITED_SELECTION_KEYS: [&str; 4] =
    ["selected_action", "recommended_action", "alternative_action", "action_choice"];

/// Minimum accepted rationale length.
pub const RATIONALE_MIN_LEN: usize = 5;
/// Maximum accepted rationale length.
pub const RATIONALE_MAX_LEN: usize = 500;
/// Maximum accepted output token count.
pub const MAX_OUTPUT_TOKEN_COUNT: u32 = 500;

// ============================================================================
// SECTION: Phases
// ============================================================================

/// Validation phase label.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
/// - [`ValidationPhase::report_rank`] orders first-failure reporting, not
///   execution (phases always execute in declaration order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationPhase {
    /// Required fields and rationale length bounds.
    Schema,
    /// Selection lock, prohibited keys, and token ceiling.
    Invariants,
    /// Authority-boundary pattern scan.
    Authority,
    /// Universal prohibition and PII pattern scan.
    Prohibitions,
}

impl ValidationPhase {
    /// Returns the stable label for the phase.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Schema => "schema",
            Self::Invariants => "invariants",
            Self::Authority => "authority",
            Self::Prohibitions => "prohibitions",
        }
    }

    /// Returns the reporting rank; lower ranks surface first.
    #[must_use]
    pub const fn report_rank(self) -> u8 {
        match self {
            Self::Authority => 0,
            Self::Prohibitions => 1,
            Self::Schema => 2,
            Self::Invariants => 3,
        }
    }
}

// ============================================================================
// SECTION: Violations
// ============================================================================

/// One validation violation.
///
/// # Invariants
/// - `check_id` doubles as the fallback reason code for the first failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationViolation {
    /// Stable check identifier.
    pub check_id: String,
    /// Human-readable violation detail.
    pub detail: String,
    /// Matched text for pattern checks (redacted for PII).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_text: Option<String>,
    /// Pattern table version for pattern checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_version: Option<String>,
}

impl From<PatternViolation> for ValidationViolation {
    fn from(violation: PatternViolation) -> Self {
        Self {
            check_id: violation.check_id.clone(),
            detail: format!("pattern {} matched", violation.check_id),
            matched_text: Some(violation.matched_text),
            pattern_version: Some(violation.pattern_version),
        }
    }
}

/// Result of one validation phase.
///
/// # Invariants
/// - `passed` is true iff `violations` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseResult {
    /// Phase label.
    pub phase: ValidationPhase,
    /// Whether the phase passed.
    pub passed: bool,
    /// Violations found by the phase.
    pub violations: Vec<ValidationViolation>,
}

impl PhaseResult {
    /// Creates a result from found violations.
    #[must_use]
    pub fn new(phase: ValidationPhase, violations: Vec<ValidationViolation>) -> Self {
        Self {
            phase,
            passed: violations.is_empty(),
            violations,
        }
    }
}

/// First-failure pointer for the composite report.
///
/// # Invariants
/// - Points at a violation present in the owning report's phase results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirstFailure {
    /// Phase that produced the violation.
    pub phase: ValidationPhase,
    /// The violation itself.
    pub violation: ValidationViolation,
}

// ============================================================================
// SECTION: Report
// ============================================================================

/// Composite four-phase validation report.
///
/// # Invariants
/// - `passed` is true iff every phase passed.
/// - `first_failure` orders authority ahead of prohibitions ahead of schema
///   ahead of invariants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Per-phase results in execution order.
    pub phases: Vec<PhaseResult>,
    /// Whether every phase passed.
    pub passed: bool,
    /// Highest-severity failure, when any phase failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_failure: Option<FirstFailure>,
}

impl ValidationReport {
    /// Assembles a report, computing the overall flag and first failure.
    #[must_use]
    pub fn assemble(phases: Vec<PhaseResult>) -> Self {
        let passed = phases.iter().all(|phase| phase.passed);
        let first_failure = phases
            .iter()
            .filter(|result| !result.passed)
            .min_by_key(|result| result.phase.report_rank())
            .and_then(|result| {
                result.violations.first().map(|violation| FirstFailure {
                    phase: result.phase,
                    violation: violation.clone(),
                })
            });
        Self {
            phases,
            passed,
            first_failure,
        }
    }
}
