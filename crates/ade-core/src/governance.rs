// crates/ade-core/src/governance.rs
// ============================================================================
// Module: ADE Governance Tables
// Description: Versioned authority-boundary and prohibition pattern sets.
// Purpose: Detect skill output that claims decision authority or carries
// prohibited language, with auditable table versions.
// Dependencies: regex, serde, thiserror
// ============================================================================

//! ## Overview
//! Governance tables are authored as data (check id, severity, pattern
//! source, version) and compiled once at startup. All patterns are
//! case-insensitive word-boundary regexes. Every violation carries the table
//! version so operators can audit which ruleset flagged the text. PII
//! matches never echo the raw value; `matched_text` records `[REDACTED]`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use regex::Regex;
use regex::RegexBuilder;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Version label of the built-in authority pattern table.
pub const AUTHORITY_TABLE_VERSION: &str = "authority-v1";
/// Version label of the built-in prohibition pattern table.
pub const PROHIBITION_TABLE_VERSION: &str = "prohibition-v1";
/// Version label of the minimal table applied to fallback output.
pub const FALLBACK_TABLE_VERSION: &str = "fallback-minimal-v1";
/// Placeholder recorded instead of raw PII matches.
pub const REDACTED_PLACEHOLDER: &str = "[REDACTED]";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Governance table compilation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum GovernanceError {
    /// A pattern source failed to compile.
    #[error("pattern {check_id} failed to compile: {detail}")]
    InvalidPattern {
        /// Check identifier of the failing pattern.
        check_id: String,
        /// Compiler error detail.
        detail: String,
    },
}

// ============================================================================
// SECTION: Pattern Model
// ============================================================================

/// Violation severity.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Violation forces fallback.
    Error,
    /// Violation is recorded but does not force fallback.
    Warn,
}

/// Authored pattern definition.
///
/// # Invariants
/// - `source` is a regex body; compilation wraps it case-insensitively.
#[derive(Debug, Clone)]
pub struct PatternDef {
    /// Stable check identifier emitted with violations.
    pub check_id: &'static str,
    /// Violation severity.
    pub severity: Severity,
    /// Regex source (without flags).
    pub source: &'static str,
    /// Whether matches must be redacted in violation records.
    pub redact: bool,
}

/// One violation found by a table scan.
///
/// # Invariants
/// - `matched_text` is [`REDACTED_PLACEHOLDER`] for redacting patterns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternViolation {
    /// Check identifier of the matching pattern.
    pub check_id: String,
    /// Violation severity.
    pub severity: Severity,
    /// Matched text, redacted for PII patterns.
    pub matched_text: String,
    /// Version of the table that produced the violation.
    pub pattern_version: String,
}

/// Compiled pattern ready for scanning.
#[derive(Debug, Clone)]
struct CompiledPattern {
    /// Stable check identifier.
    check_id: &'static str,
    /// Violation severity.
    severity: Severity,
    /// Compiled case-insensitive regex.
    regex: Regex,
    /// Whether matches are redacted.
    redact: bool,
}

// ============================================================================
// SECTION: Pattern Table
// ============================================================================

/// Versioned, compiled pattern table.
///
/// # Invariants
/// - Read-only after compilation; safe for concurrent scans.
#[derive(Debug, Clone)]
pub struct PatternTable {
    /// Table version emitted with each violation.
    version: &'static str,
    /// Compiled patterns in authored order.
    patterns: Vec<CompiledPattern>,
}

impl PatternTable {
    /// Compiles a table from authored definitions.
    ///
    /// # Errors
    ///
    /// Returns [`GovernanceError::InvalidPattern`] when a source fails to
    /// compile.
    pub fn compile(version: &'static str, defs: &[PatternDef]) -> Result<Self, GovernanceError> {
        let mut patterns = Vec::with_capacity(defs.len());
        for def in defs {
            let regex = RegexBuilder::new(def.source)
                .case_insensitive(true)
                .build()
                .map_err(|err| GovernanceError::InvalidPattern {
                    check_id: def.check_id.to_string(),
                    detail: err.to_string(),
                })?;
            patterns.push(CompiledPattern {
                check_id: def.check_id,
                severity: def.severity,
                regex,
                redact: def.redact,
            });
        }
        Ok(Self {
            version,
            patterns,
        })
    }

    /// Returns the table version label.
    #[must_use]
    pub const fn version(&self) -> &'static str {
        self.version
    }

    /// Scans text and returns every violation in authored pattern order.
    #[must_use]
    pub fn scan(&self, text: &str) -> Vec<PatternViolation> {
        let mut violations = Vec::new();
        for pattern in &self.patterns {
            if let Some(found) = pattern.regex.find(text) {
                let matched_text = if pattern.redact {
                    REDACTED_PLACEHOLDER.to_string()
                } else {
                    found.as_str().to_string()
                };
                violations.push(PatternViolation {
                    check_id: pattern.check_id.to_string(),
                    severity: pattern.severity,
                    matched_text,
                    pattern_version: self.version.to_string(),
                });
            }
        }
        violations
    }
}

// ============================================================================
// SECTION: Built-in Tables
// ============================================================================

/// Authority-boundary pattern definitions (v1).
///
/// Skills explain; they never select, recommend, rank, or comment on
/// guardrails.
const AUTHORITY_PATTERNS_V1: &[PatternDef] = &[
    PatternDef {
        check_id: "AUTH-SELECTION-KEYWORD",
        severity: Severity::Error,
        source: r"\b(selected_action|recommended_action|alternative_action|action_choice)\b",
        redact: false,
    },
    PatternDef {
        check_id: "AUTH-RECOMMENDATION-LANGUAGE",
        severity: Severity::Error,
        source: r"\b(i recommend|you should|instead|alternatively)\b",
        redact: false,
    },
    PatternDef {
        check_id: "AUTH-SCORE-REFERENCE",
        severity: Severity::Error,
        source: r"\b(score|scores|scoring|ranked|ranking)\b",
        redact: false,
    },
    PatternDef {
        check_id: "AUTH-GUARDRAIL-COMMENTARY",
        severity: Severity::Error,
        source: r"\b(despite|bypassing)\b",
        redact: false,
    },
    PatternDef {
        check_id: "AUTH-DECISION-AGENCY",
        severity: Severity::Error,
        source: r"\b(i decided|we chose for you|i chose)\b",
        redact: false,
    },
];

/// Universal prohibition pattern definitions (v1), PII included.
const PROHIBITION_PATTERNS_V1: &[PatternDef] = &[
    PatternDef {
        check_id: "PROHIB-DECISION-OVERRIDE",
        severity: Severity::Error,
        source: r"\b(override the decision|change the selection|ignore the decision)\b",
        redact: false,
    },
    PatternDef {
        check_id: "PROHIB-PROFESSIONAL-CLAIM",
        severity: Severity::Error,
        source: r"\b(medical advice|legal advice|financial advice|diagnosis|guaranteed returns)\b",
        redact: false,
    },
    PatternDef {
        check_id: "PROHIB-URGENCY-MANIPULATION",
        severity: Severity::Error,
        source: r"\b(act now|last chance|limited time|before it's too late)\b",
        redact: false,
    },
    PatternDef {
        check_id: "PROHIB-NEGATIVE-FRAMING",
        severity: Severity::Error,
        source: r"\b(you failed|you're failing|falling behind|disappointing)\b",
        redact: false,
    },
    PatternDef {
        check_id: "PII-EMAIL",
        severity: Severity::Error,
        source: r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b",
        redact: true,
    },
    PatternDef {
        check_id: "PII-PHONE",
        severity: Severity::Error,
        source: r"\b\d{3}[-.\s]\d{3}[-.\s]\d{4}\b",
        redact: true,
    },
    PatternDef {
        check_id: "PII-SSN",
        severity: Severity::Error,
        source: r"\b\d{3}-\d{2}-\d{4}\b",
        redact: true,
    },
];

/// Minimal prohibition set applied to fallback-synthesized payloads.
const FALLBACK_PATTERNS_V1: &[PatternDef] = &[
    PatternDef {
        check_id: "PROHIB-DECISION-OVERRIDE",
        severity: Severity::Error,
        source: r"\b(override the decision|change the selection|ignore the decision)\b",
        redact: false,
    },
    PatternDef {
        check_id: "PII-EMAIL",
        severity: Severity::Error,
        source: r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b",
        redact: true,
    },
];

/// Compiled governance tables shared by validation and fallback.
///
/// # Invariants
/// - Read-only after construction; safe for concurrent use.
#[derive(Debug, Clone)]
pub struct GovernanceTables {
    /// Authority-boundary table.
    pub authority: PatternTable,
    /// Universal prohibition table (PII included).
    pub prohibition: PatternTable,
    /// Minimal table for fallback self-checks.
    pub fallback_minimal: PatternTable,
}

impl GovernanceTables {
    /// Compiles the built-in v1 tables.
    ///
    /// # Errors
    ///
    /// Returns [`GovernanceError`] when any built-in pattern fails to
    /// compile.
    pub fn v1() -> Result<Self, GovernanceError> {
        Ok(Self {
            authority: PatternTable::compile(AUTHORITY_TABLE_VERSION, AUTHORITY_PATTERNS_V1)?,
            prohibition: PatternTable::compile(
                PROHIBITION_TABLE_VERSION,
                PROHIBITION_PATTERNS_V1,
            )?,
            fallback_minimal: PatternTable::compile(
                FALLBACK_TABLE_VERSION,
                FALLBACK_PATTERNS_V1,
            )?,
        })
    }
}

// ============================================================================
// SECTION: Text Extraction
// ============================================================================

/// Recursively extracts and concatenates every string field of a JSON value.
///
/// Scanners see one newline-joined document so word-boundary patterns behave
/// consistently across fields.
#[must_use]
pub fn extract_text(value: &serde_json::Value) -> String {
    let mut parts = Vec::new();
    collect_strings(value, &mut parts);
    parts.join("\n")
}

/// Collects string leaves depth-first.
fn collect_strings(value: &serde_json::Value, parts: &mut Vec<String>) {
    match value {
        serde_json::Value::String(text) => parts.push(text.clone()),
        serde_json::Value::Array(items) => {
            for item in items {
                collect_strings(item, parts);
            }
        }
        serde_json::Value::Object(map) => {
            for item in map.values() {
                collect_strings(item, parts);
            }
        }
        serde_json::Value::Null | serde_json::Value::Bool(_) | serde_json::Value::Number(_) => {}
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
