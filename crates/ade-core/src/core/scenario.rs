// crates/ade-core/src/core/scenario.rs
// ============================================================================
// Module: ADE Scenario Model
// Description: Declarative scenario documents: state schema, actions, guardrails,
// scoring, skills, and execution config.
// Purpose: Define the immutable policy document evaluated by the pipeline.
// Dependencies: crate::core::{action, hashing, identifiers}, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A scenario is a versioned, hash-addressed policy document. Scenarios enter
//! the engine as already-parsed in-memory objects; the registry hashes their
//! canonical JSON form and rejects re-registration under a different hash.
//! [`Scenario::validate`] enforces the structural invariants: objective
//! weights sum to the declared total, every referenced skill exists, action
//! attribute declarations are internally consistent, and dimension
//! derivations are acyclic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::action::Intensity;
use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashDigest;
use crate::core::hashing::HashError;
use crate::core::hashing::hash_canonical_json;
use crate::core::identifiers::ActionId;
use crate::core::identifiers::ActionTypeId;
use crate::core::identifiers::RuleId;
use crate::core::identifiers::ScenarioId;
use crate::core::identifiers::SkillId;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Tolerance applied when checking that objective weights sum to the total.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Scenario validation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// Objective weights do not sum to the declared total.
    #[error("objective weights sum to {actual}, expected {expected}")]
    WeightSum {
        /// Declared weight total.
        expected: f64,
        /// Observed weight sum.
        actual: f64,
    },
    /// A referenced skill is not declared in the available set.
    #[error("unknown skill reference: {0}")]
    UnknownSkill(SkillId),
    /// An attribute declaration is internally inconsistent.
    #[error("invalid attribute declaration on {type_id}: {detail}")]
    InvalidAttribute {
        /// Action type carrying the attribute.
        type_id: ActionTypeId,
        /// Human-readable inconsistency description.
        detail: String,
    },
    /// Dimension derivations contain a cycle.
    #[error("dimension derivation cycle involving: {0}")]
    DimensionCycle(String),
    /// A dimension derivation names an undeclared input.
    #[error("dimension {dimension} reads undeclared input: {input}")]
    UnknownDerivationInput {
        /// Dimension declaring the derivation.
        dimension: String,
        /// Input name that does not resolve.
        input: String,
    },
    /// Canonical hashing of the scenario failed.
    #[error("scenario hashing failed: {0}")]
    Hashing(#[from] HashError),
}

// ============================================================================
// SECTION: State Schema
// ============================================================================

/// Scalar type of a state dimension.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionKind {
    /// Floating-point dimension.
    Float,
    /// Integer dimension.
    Integer,
    /// Boolean dimension.
    Boolean,
    /// String dimension.
    String,
}

/// Inclusive numeric range used for clamping and attribute validation.
///
/// # Invariants
/// - `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericRange {
    /// Inclusive lower bound.
    pub min: f64,
    /// Inclusive upper bound.
    pub max: f64,
}

impl NumericRange {
    /// Clamps a value into the range.
    #[must_use]
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// Source feeding a dimension derivation.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivationSource {
    /// Read `signals.<name>` from the request.
    Signal,
    /// Read `context.<name>` from the request.
    Context,
    /// Evaluate a formula against previously derived dimensions.
    Computed,
    /// Read the user's non-authoritative memory.
    Memory,
}

/// Derivation rule for a state dimension.
///
/// # Invariants
/// - `formula` is required for computed derivations; other sources read the
///   name (or `key`) directly.
/// - `inputs` lists dimension names a computed formula reads; ordering checks
///   are topological over these names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Derivation {
    /// Derivation source.
    pub source: DerivationSource,
    /// Formula text for computed derivations.
    #[serde(default)]
    pub formula: Option<String>,
    /// Declared input dimension names for computed derivations.
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Optional override for the signal/context/memory key to read.
    #[serde(default)]
    pub key: Option<String>,
}

/// State dimension definition.
///
/// # Invariants
/// - `default` matches `kind` (enforced structurally at derive time: values
///   that do not coerce fall back to the default).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionDef {
    /// Dimension name.
    pub name: String,
    /// Scalar type.
    pub kind: DimensionKind,
    /// Optional clamp range for numeric dimensions.
    #[serde(default)]
    pub range: Option<NumericRange>,
    /// Default value when the source is unavailable.
    pub default: Value,
    /// Derivation rule.
    pub derivation: Derivation,
}

/// Ordered state schema with core and scenario-specific dimensions.
///
/// # Invariants
/// - Declaration order is evaluation order within each list.
/// - Core dimensions evaluate before scenario extensions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StateSchema {
    /// Core dimensions shared across scenarios.
    #[serde(default)]
    pub core_dimensions: Vec<DimensionDef>,
    /// Scenario-specific extension dimensions.
    #[serde(default)]
    pub scenario_dimensions: Vec<DimensionDef>,
}

// ============================================================================
// SECTION: Actions Config
// ============================================================================

/// Where candidate actions come from.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionSource {
    /// The request supplies the full candidate list.
    Static,
    /// Candidates may be produced by an upstream generator.
    Dynamic,
}

/// Scalar type of an action attribute.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    /// Floating-point attribute.
    Float,
    /// Integer attribute.
    Integer,
    /// Boolean attribute.
    Boolean,
    /// String attribute.
    String,
}

/// Attribute declaration on an action type.
///
/// # Invariants
/// - `range` is only meaningful for numeric kinds.
/// - `allowed_values` entries must match `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDef {
    /// Attribute name.
    pub name: String,
    /// Scalar type.
    pub kind: AttributeKind,
    /// Optional numeric range.
    #[serde(default)]
    pub range: Option<NumericRange>,
    /// Optional enumeration of allowed values.
    #[serde(default)]
    pub allowed_values: Option<Vec<Value>>,
    /// Whether requests must supply the attribute.
    #[serde(default)]
    pub required: bool,
}

/// Action type declaration.
///
/// # Invariants
/// - `type_id` is unique within the scenario.
/// - `primary_skill` must exist in the skills config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionTypeDef {
    /// Action type identifier.
    pub type_id: ActionTypeId,
    /// Optional display name for rationale interpolation.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Attribute declarations.
    #[serde(default)]
    pub attributes: Vec<AttributeDef>,
    /// Primary skill enriching actions of this type.
    pub primary_skill: SkillId,
}

/// Actions configuration.
///
/// # Invariants
/// - Every request action's `type_id` must match a declared type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionsConfig {
    /// Candidate source.
    pub source: ActionSource,
    /// Declared action types.
    pub action_types: Vec<ActionTypeDef>,
}

impl ActionsConfig {
    /// Looks up an action type declaration by identifier.
    #[must_use]
    pub fn action_type(&self, type_id: &ActionTypeId) -> Option<&ActionTypeDef> {
        self.action_types.iter().find(|def| &def.type_id == type_id)
    }
}

// ============================================================================
// SECTION: Guardrails Config
// ============================================================================

/// Target selector for blocking effects.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleTarget {
    /// Match a specific action identifier.
    ActionId {
        /// Action identifier to match.
        action_id: ActionId,
    },
    /// Match every action of a type.
    ActionType {
        /// Action type to match.
        type_id: ActionTypeId,
    },
    /// Match actions whose attribute equals a value.
    Attribute {
        /// Attribute name to inspect.
        name: String,
        /// Value the attribute must equal.
        value: Value,
    },
}

/// Effect applied when a guardrail condition triggers.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GuardrailEffect {
    /// Remove matching actions from the eligible set.
    BlockAction {
        /// Target selector.
        target: RuleTarget,
    },
    /// Force selection of a specific action.
    ForceAction {
        /// Forced action identifier.
        action_id: ActionId,
    },
    /// Block actions whose intensity exceeds a ceiling.
    CapIntensity {
        /// Maximum allowed intensity.
        max_intensity: Intensity,
    },
    /// Block matching actions; the temporal window lives in the rule condition.
    RequireCooldown {
        /// Target selector.
        target: RuleTarget,
    },
}

/// Guardrail rule with priority ordering.
///
/// # Invariants
/// - Lower `priority` values evaluate first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardrailRule {
    /// Rule identifier.
    pub rule_id: RuleId,
    /// Ascending evaluation priority.
    pub priority: u32,
    /// Condition formula over `{state, signals, memory}`.
    pub condition: String,
    /// Effect applied when the condition triggers.
    pub effect: GuardrailEffect,
}

/// Guardrails configuration.
///
/// # Invariants
/// - Rule identifiers are unique within the scenario.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GuardrailsConfig {
    /// Ordered rule list (sorted by priority at evaluation time).
    #[serde(default)]
    pub rules: Vec<GuardrailRule>,
}

// ============================================================================
// SECTION: Scoring Config
// ============================================================================

/// Scoring objective with weight and formula.
///
/// # Invariants
/// - `weight` is non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringObjective {
    /// Objective identifier used in score breakdowns.
    pub objective_id: String,
    /// Weight applied to the clamped objective score.
    pub weight: f64,
    /// Formula over `{state, action}` yielding the objective score.
    pub formula: String,
}

/// Execution-risk penalty factor.
///
/// # Invariants
/// - `penalty` is non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    /// Factor identifier used in score breakdowns.
    pub factor_id: String,
    /// Condition formula over `{state, action}`.
    pub condition: String,
    /// Penalty accumulated when the condition holds.
    pub penalty: f64,
}

/// Execution-risk penalty configuration.
///
/// # Invariants
/// - Accumulated penalties are capped at `max_total_penalty` before weighting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRisk {
    /// Weight applied to the capped penalty total.
    pub weight: f64,
    /// Cap on the accumulated penalty total.
    pub max_total_penalty: f64,
    /// Penalty factors.
    pub factors: Vec<RiskFactor>,
}

/// Tie-breaker applied between near-equal scores.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreaker {
    /// Lexicographic ascending on `action_id`.
    ActionIdAsc,
    /// Ordinal ascending on intensity (missing treated as moderate).
    IntensityAsc,
    /// Ascending on duration minutes (missing treated as 30).
    DurationAsc,
}

/// Scoring configuration.
///
/// # Invariants
/// - Objective weights sum to `weight_total` within [`WEIGHT_SUM_TOLERANCE`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Scoring objectives.
    pub objectives: Vec<ScoringObjective>,
    /// Declared objective weight total (typically 1.0).
    #[serde(default = "default_weight_total")]
    pub weight_total: f64,
    /// Optional execution-risk penalty.
    #[serde(default)]
    pub execution_risk: Option<ExecutionRisk>,
    /// Ordered tie-breaker chain.
    #[serde(default)]
    pub tie_breakers: Vec<TieBreaker>,
}

/// Returns the default objective weight total.
const fn default_weight_total() -> f64 {
    1.0
}

// ============================================================================
// SECTION: Skills Config
// ============================================================================

/// Skill declaration.
///
/// # Invariants
/// - `skill_id` is unique within the scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillDef {
    /// Skill identifier.
    pub skill_id: SkillId,
    /// Skill version string.
    pub version: String,
    /// Optional output token ceiling override.
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
    /// Custom parameters handed to the executor.
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
}

/// Per-action-type skill mapping override.
///
/// # Invariants
/// - Referenced skills must exist in the available set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillMapping {
    /// Primary skill for the action type.
    pub primary: SkillId,
    /// Optional fallback override.
    #[serde(default)]
    pub fallback: Option<SkillId>,
}

/// Skills configuration.
///
/// # Invariants
/// - `default_fallback` must exist in the available set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillsConfig {
    /// Declared skills.
    pub available: Vec<SkillDef>,
    /// Per-action-type mapping overrides keyed by type identifier.
    #[serde(default)]
    pub mappings: BTreeMap<String, SkillMapping>,
    /// Scenario-wide fallback skill.
    pub default_fallback: SkillId,
}

impl SkillsConfig {
    /// Looks up a skill declaration by identifier.
    #[must_use]
    pub fn skill(&self, skill_id: &SkillId) -> Option<&SkillDef> {
        self.available.iter().find(|def| &def.skill_id == skill_id)
    }
}

// ============================================================================
// SECTION: Execution Config
// ============================================================================

/// Execution mode for skill enrichment.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Template rendering only; no model-backed executor.
    DeterministicOnly,
    /// Model-backed skill executor preferred.
    SkillEnhanced,
}

/// Timeout budgets in milliseconds.
///
/// # Invariants
/// - `skill_execution_ms <= total_decision_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutBudgets {
    /// Budget for the whole pipeline run.
    pub total_decision_ms: u64,
    /// Budget for a single skill execution.
    pub skill_execution_ms: u64,
    /// Budget advisory for individual learner dispatch.
    pub learner_dispatch_ms: u64,
}

impl Default for TimeoutBudgets {
    fn default() -> Self {
        Self {
            total_decision_ms: 5_000,
            skill_execution_ms: 2_000,
            learner_dispatch_ms: 1_000,
        }
    }
}

/// Execution configuration.
///
/// # Invariants
/// - `allow_mode_override` gates request-level mode overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Default execution mode.
    pub default_mode: ExecutionMode,
    /// Whether requests may override the execution mode.
    #[serde(default)]
    pub allow_mode_override: bool,
    /// Timeout budgets.
    #[serde(default)]
    pub timeouts: TimeoutBudgets,
}

// ============================================================================
// SECTION: Scenario
// ============================================================================

/// Versioned, hash-addressed policy scenario.
///
/// # Invariants
/// - Immutable once registered; the registry enforces hash-immutability.
/// - [`Scenario::validate`] holds for every registered scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario identifier.
    pub scenario_id: ScenarioId,
    /// Semantic version string.
    pub version: String,
    /// Optional human description.
    #[serde(default)]
    pub description: Option<String>,
    /// State schema.
    pub state_schema: StateSchema,
    /// Actions configuration.
    pub actions: ActionsConfig,
    /// Guardrails configuration.
    #[serde(default)]
    pub guardrails: GuardrailsConfig,
    /// Scoring configuration.
    pub scoring: ScoringConfig,
    /// Skills configuration.
    pub skills: SkillsConfig,
    /// Execution configuration.
    pub execution: ExecutionConfig,
}

impl Scenario {
    /// Computes the canonical content hash of the scenario.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Hashing`] when canonicalization fails.
    pub fn content_hash(&self) -> Result<HashDigest, ScenarioError> {
        Ok(hash_canonical_json(DEFAULT_HASH_ALGORITHM, self)?)
    }

    /// Validates the scenario's structural invariants.
    ///
    /// # Errors
    ///
    /// Returns the first [`ScenarioError`] found: weight-sum mismatch,
    /// unknown skill reference, inconsistent attribute declaration, unknown
    /// derivation input, or a dimension cycle.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        self.validate_weights()?;
        self.validate_skill_references()?;
        self.validate_attributes()?;
        self.validate_dimensions()
    }

    /// Checks that objective weights sum to the declared total.
    fn validate_weights(&self) -> Result<(), ScenarioError> {
        let actual: f64 = self.scoring.objectives.iter().map(|objective| objective.weight).sum();
        if (actual - self.scoring.weight_total).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ScenarioError::WeightSum {
                expected: self.scoring.weight_total,
                actual,
            });
        }
        Ok(())
    }

    /// Checks that every referenced skill is declared.
    fn validate_skill_references(&self) -> Result<(), ScenarioError> {
        let declared: BTreeSet<&SkillId> =
            self.skills.available.iter().map(|def| &def.skill_id).collect();
        if !declared.contains(&self.skills.default_fallback) {
            return Err(ScenarioError::UnknownSkill(self.skills.default_fallback.clone()));
        }
        for action_type in &self.actions.action_types {
            if !declared.contains(&action_type.primary_skill) {
                return Err(ScenarioError::UnknownSkill(action_type.primary_skill.clone()));
            }
        }
        for mapping in self.skills.mappings.values() {
            if !declared.contains(&mapping.primary) {
                return Err(ScenarioError::UnknownSkill(mapping.primary.clone()));
            }
            if let Some(fallback) = &mapping.fallback
                && !declared.contains(fallback)
            {
                return Err(ScenarioError::UnknownSkill(fallback.clone()));
            }
        }
        Ok(())
    }

    /// Checks attribute declarations for internal consistency.
    fn validate_attributes(&self) -> Result<(), ScenarioError> {
        for action_type in &self.actions.action_types {
            for attribute in &action_type.attributes {
                let numeric =
                    matches!(attribute.kind, AttributeKind::Float | AttributeKind::Integer);
                if attribute.range.is_some() && !numeric {
                    return Err(ScenarioError::InvalidAttribute {
                        type_id: action_type.type_id.clone(),
                        detail: format!("range declared on non-numeric attribute {}", attribute.name),
                    });
                }
                if let Some(range) = &attribute.range
                    && range.min > range.max
                {
                    return Err(ScenarioError::InvalidAttribute {
                        type_id: action_type.type_id.clone(),
                        detail: format!("inverted range on attribute {}", attribute.name),
                    });
                }
                if let Some(allowed) = &attribute.allowed_values {
                    for value in allowed {
                        if !value_matches_kind(value, attribute.kind) {
                            return Err(ScenarioError::InvalidAttribute {
                                type_id: action_type.type_id.clone(),
                                detail: format!(
                                    "allowed value {value} does not match {:?} on attribute {}",
                                    attribute.kind, attribute.name
                                ),
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Checks derivation inputs and rejects dimensional cycles.
    fn validate_dimensions(&self) -> Result<(), ScenarioError> {
        let dimensions: Vec<&DimensionDef> = self
            .state_schema
            .core_dimensions
            .iter()
            .chain(self.state_schema.scenario_dimensions.iter())
            .collect();
        let names: BTreeSet<&str> =
            dimensions.iter().map(|dimension| dimension.name.as_str()).collect();
        for dimension in &dimensions {
            if dimension.derivation.source != DerivationSource::Computed {
                continue;
            }
            for input in &dimension.derivation.inputs {
                if !names.contains(input.as_str()) {
                    return Err(ScenarioError::UnknownDerivationInput {
                        dimension: dimension.name.clone(),
                        input: input.clone(),
                    });
                }
            }
        }
        detect_cycle(&dimensions)
    }
}

/// Returns true when a JSON value matches the declared attribute kind.
fn value_matches_kind(value: &Value, kind: AttributeKind) -> bool {
    match kind {
        AttributeKind::Float => value.is_number(),
        AttributeKind::Integer => value.is_i64() || value.is_u64(),
        AttributeKind::Boolean => value.is_boolean(),
        AttributeKind::String => value.is_string(),
    }
}

/// Rejects cycles among computed-dimension input edges via Kahn's algorithm.
fn detect_cycle(dimensions: &[&DimensionDef]) -> Result<(), ScenarioError> {
    let mut indegree: BTreeMap<&str, usize> = BTreeMap::new();
    let mut edges: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for dimension in dimensions {
        indegree.entry(dimension.name.as_str()).or_insert(0);
        if dimension.derivation.source != DerivationSource::Computed {
            continue;
        }
        for input in &dimension.derivation.inputs {
            edges.entry(input.as_str()).or_default().push(dimension.name.as_str());
            *indegree.entry(dimension.name.as_str()).or_insert(0) += 1;
        }
    }
    let mut ready: Vec<&str> = indegree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(name, _)| *name)
        .collect();
    let mut resolved = 0usize;
    while let Some(name) = ready.pop() {
        resolved += 1;
        if let Some(successors) = edges.get(name) {
            for successor in successors {
                if let Some(degree) = indegree.get_mut(successor) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push(successor);
                    }
                }
            }
        }
    }
    if resolved == indegree.len() {
        Ok(())
    } else {
        let stuck: Vec<&str> = indegree
            .iter()
            .filter(|(_, degree)| **degree > 0)
            .map(|(name, _)| *name)
            .collect();
        Err(ScenarioError::DimensionCycle(stuck.join(", ")))
    }
}
