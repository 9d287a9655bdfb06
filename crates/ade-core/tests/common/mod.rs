// crates/ade-core/tests/common/mod.rs
// ============================================================================
// Module: Core Test Fixtures
// Description: Shared scenario builders and stub executors for core tests.
// Purpose: Keep pipeline-level tests focused on behavior, not setup.
// Dependencies: ade-core, async-trait, serde_json
// ============================================================================

#![allow(dead_code, reason = "Shared fixtures are reused across multiple test files.")]

use std::collections::BTreeMap;
use std::sync::Arc;

use ade_core::ActionCandidate;
use ade_core::DecisionRequest;
use ade_core::ExecutionMode;
use ade_core::ExecutionResult;
use ade_core::ExecutorError;
use ade_core::Scenario;
use ade_core::SkillExecutor;
use ade_core::SkillInputEnvelope;
use ade_core::core::request::RequestContext;
use ade_core::core::request::RequestOptions;
use ade_core::core::scenario::ActionSource;
use ade_core::core::scenario::ActionTypeDef;
use ade_core::core::scenario::ActionsConfig;
use ade_core::core::scenario::Derivation;
use ade_core::core::scenario::DerivationSource;
use ade_core::core::scenario::DimensionDef;
use ade_core::core::scenario::DimensionKind;
use ade_core::core::scenario::ExecutionConfig;
use ade_core::core::scenario::GuardrailEffect;
use ade_core::core::scenario::GuardrailRule;
use ade_core::core::scenario::GuardrailsConfig;
use ade_core::core::scenario::NumericRange;
use ade_core::core::scenario::RuleTarget;
use ade_core::core::scenario::ScoringConfig;
use ade_core::core::scenario::ScoringObjective;
use ade_core::core::scenario::SkillDef;
use ade_core::core::scenario::SkillsConfig;
use ade_core::core::scenario::StateSchema;
use ade_core::core::scenario::TieBreaker;
use ade_core::core::scenario::TimeoutBudgets;
use async_trait::async_trait;
use serde_json::Value;
use serde_json::json;

/// Builds a compact reminder scenario exercising every config section.
#[must_use]
pub fn reminder_scenario() -> Scenario {
    Scenario {
        scenario_id: "reminder".into(),
        version: "1.0.0".to_string(),
        description: Some("Compact reminder scenario for core tests".to_string()),
        state_schema: StateSchema {
            core_dimensions: vec![
                DimensionDef {
                    name: "engagement_score".to_string(),
                    kind: DimensionKind::Float,
                    range: Some(NumericRange {
                        min: 0.0,
                        max: 1.0,
                    }),
                    default: json!(0.5),
                    derivation: Derivation {
                        source: DerivationSource::Computed,
                        formula: Some("clamp(signals.interactions_7d / 10, 0, 1)".to_string()),
                        inputs: vec![],
                        key: None,
                    },
                },
                DimensionDef {
                    name: "churn_risk".to_string(),
                    kind: DimensionKind::Float,
                    range: Some(NumericRange {
                        min: 0.0,
                        max: 1.0,
                    }),
                    default: json!(0.2),
                    derivation: Derivation {
                        source: DerivationSource::Computed,
                        formula: Some("clamp(1 - state.core.engagement_score, 0, 1)".to_string()),
                        inputs: vec!["engagement_score".to_string()],
                        key: None,
                    },
                },
                DimensionDef {
                    name: "tenure_days".to_string(),
                    kind: DimensionKind::Float,
                    range: Some(NumericRange {
                        min: 0.0,
                        max: 10_000.0,
                    }),
                    default: json!(30.0),
                    derivation: Derivation {
                        source: DerivationSource::Signal,
                        formula: None,
                        inputs: vec![],
                        key: None,
                    },
                },
            ],
            scenario_dimensions: vec![DimensionDef {
                name: "local_hour".to_string(),
                kind: DimensionKind::Integer,
                range: Some(NumericRange {
                    min: 0.0,
                    max: 23.0,
                }),
                default: json!(12),
                derivation: Derivation {
                    source: DerivationSource::Context,
                    formula: None,
                    inputs: vec![],
                    key: None,
                },
            }],
        },
        actions: ActionsConfig {
            source: ActionSource::Static,
            action_types: vec![ActionTypeDef {
                type_id: "reminder".into(),
                display_name: Some("Reminder".to_string()),
                attributes: vec![],
                primary_skill: "reminder-writer".into(),
            }],
        },
        guardrails: GuardrailsConfig {
            rules: vec![GuardrailRule {
                rule_id: "GR-NIGHT".into(),
                priority: 10,
                condition: "state.scenario_extensions.local_hour < 7".to_string(),
                effect: GuardrailEffect::BlockAction {
                    target: RuleTarget::ActionId {
                        action_id: "ping-now".into(),
                    },
                },
            }],
        },
        scoring: ScoringConfig {
            objectives: vec![
                ScoringObjective {
                    objective_id: "immediacy".to_string(),
                    weight: 0.6,
                    formula: "if_else(action.attributes.delivery == 'immediate', 1, 0.4)"
                        .to_string(),
                },
                ScoringObjective {
                    objective_id: "engagement".to_string(),
                    weight: 0.4,
                    formula: "state.core.engagement_score".to_string(),
                },
            ],
            weight_total: 1.0,
            execution_risk: None,
            tie_breakers: vec![TieBreaker::ActionIdAsc],
        },
        skills: SkillsConfig {
            available: vec![
                SkillDef {
                    skill_id: "reminder-writer".into(),
                    version: "1.1.0".to_string(),
                    max_output_tokens: Some(120),
                    params: BTreeMap::new(),
                },
                SkillDef {
                    skill_id: "template-basic".into(),
                    version: "1.0.0".to_string(),
                    max_output_tokens: None,
                    params: BTreeMap::new(),
                },
            ],
            mappings: BTreeMap::new(),
            default_fallback: "template-basic".into(),
        },
        execution: ExecutionConfig {
            default_mode: ExecutionMode::SkillEnhanced,
            allow_mode_override: true,
            timeouts: TimeoutBudgets::default(),
        },
    }
}

/// Builds a two-action request against the reminder scenario.
#[must_use]
pub fn reminder_request() -> DecisionRequest {
    let mut ping = ActionCandidate::new("ping-now", "reminder");
    ping.attributes.insert("delivery".to_string(), json!("immediate"));
    let mut defer = ActionCandidate::new("defer", "reminder");
    defer.attributes.insert("delivery".to_string(), json!("delayed"));
    DecisionRequest {
        scenario_id: "reminder".into(),
        user_id: "user-1".into(),
        actions: vec![ping, defer],
        signals: [("interactions_7d".to_string(), json!(5))].into_iter().collect(),
        context: RequestContext {
            current_time: Some("2026-03-02T14:00:00-05:00".to_string()),
            timezone: Some("America/New_York".to_string()),
            platform_constraints: BTreeMap::new(),
            extra: BTreeMap::new(),
        },
        options: RequestOptions {
            execution_mode_override: Some(ExecutionMode::DeterministicOnly),
            include_rationale: true,
            include_score_breakdown: true,
            max_ranked_options: None,
        },
        decision_id: None,
        platform: None,
    }
}

/// Stub executor returning a fixed raw output for the skill-enhanced mode.
pub struct ScriptedExecutor {
    /// Output returned on every execution.
    pub output: Value,
}

#[async_trait]
impl SkillExecutor for ScriptedExecutor {
    fn executor_mode(&self) -> ExecutionMode {
        ExecutionMode::SkillEnhanced
    }

    fn is_available(&self) -> bool {
        true
    }

    fn latency_estimate_ms(&self) -> u64 {
        5
    }

    async fn execute(
        &self,
        _input: &SkillInputEnvelope,
        _timeout_ms: u64,
    ) -> Result<ExecutionResult, ExecutorError> {
        Ok(ExecutionResult {
            success: true,
            output: Some(self.output.clone()),
            error: None,
            execution_ms: 3,
            token_count: 42,
        })
    }
}

/// Stub executor that always errors.
pub struct FailingExecutor;

#[async_trait]
impl SkillExecutor for FailingExecutor {
    fn executor_mode(&self) -> ExecutionMode {
        ExecutionMode::SkillEnhanced
    }

    fn is_available(&self) -> bool {
        true
    }

    fn latency_estimate_ms(&self) -> u64 {
        5
    }

    async fn execute(
        &self,
        _input: &SkillInputEnvelope,
        _timeout_ms: u64,
    ) -> Result<ExecutionResult, ExecutorError> {
        Err(ExecutorError::Failed("scripted failure".to_string()))
    }
}

/// Builds a well-formed skill output with the provided rationale.
#[must_use]
pub fn skill_output(rationale: &str) -> Value {
    json!({
        "payload": {
            "rationale": rationale,
            "display_title": "Reminder",
            "display_parameters": {"tone": "neutral"},
        },
        "metadata": {"source": "scripted"},
    })
}

/// Wraps an executor into an [`Arc`] for registry installation.
#[must_use]
pub fn arc_executor<E: SkillExecutor + 'static>(executor: E) -> Arc<dyn SkillExecutor> {
    Arc::new(executor)
}
