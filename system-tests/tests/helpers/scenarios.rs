// system-tests/tests/helpers/scenarios.rs
// ============================================================================
// Module: Demo Scenario Fixtures
// Description: Notification-timing and fitness-session scenarios plus
// request builders.
// Purpose: Exercise one codepath across unrelated policy domains.
// Dependencies: ade-core, serde_json
// ============================================================================

use std::collections::BTreeMap;

use ade_core::ActionCandidate;
use ade_core::DecisionRequest;
use ade_core::ExecutionMode;
use ade_core::Scenario;
use ade_core::core::request::RequestContext;
use ade_core::core::request::RequestOptions;
use ade_core::core::scenario::ActionSource;
use ade_core::core::scenario::ActionTypeDef;
use ade_core::core::scenario::ActionsConfig;
use ade_core::core::scenario::AttributeDef;
use ade_core::core::scenario::AttributeKind;
use ade_core::core::scenario::Derivation;
use ade_core::core::scenario::DerivationSource;
use ade_core::core::scenario::DimensionDef;
use ade_core::core::scenario::DimensionKind;
use ade_core::core::scenario::ExecutionConfig;
use ade_core::core::scenario::ExecutionRisk;
use ade_core::core::scenario::GuardrailEffect;
use ade_core::core::scenario::GuardrailRule;
use ade_core::core::scenario::GuardrailsConfig;
use ade_core::core::scenario::NumericRange;
use ade_core::core::scenario::RiskFactor;
use ade_core::core::scenario::RuleTarget;
use ade_core::core::scenario::ScoringConfig;
use ade_core::core::scenario::ScoringObjective;
use ade_core::core::scenario::SkillDef;
use ade_core::core::scenario::SkillsConfig;
use ade_core::core::scenario::StateSchema;
use ade_core::core::scenario::TieBreaker;
use ade_core::core::scenario::TimeoutBudgets;
use ade_core::Intensity;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Dimension Builders
// ============================================================================

/// Float dimension read from a signal of the same name.
fn signal_dimension(name: &str, min: f64, max: f64, default: Value) -> DimensionDef {
    DimensionDef {
        name: name.to_string(),
        kind: DimensionKind::Float,
        range: Some(NumericRange {
            min,
            max,
        }),
        default,
        derivation: Derivation {
            source: DerivationSource::Signal,
            formula: None,
            inputs: vec![],
            key: None,
        },
    }
}

/// Computed dimension over previously derived state and signals.
fn computed_dimension(name: &str, formula: &str, inputs: &[&str], default: Value) -> DimensionDef {
    DimensionDef {
        name: name.to_string(),
        kind: DimensionKind::Float,
        range: Some(NumericRange {
            min: 0.0,
            max: 1.0,
        }),
        default,
        derivation: Derivation {
            source: DerivationSource::Computed,
            formula: Some(formula.to_string()),
            inputs: inputs.iter().map(ToString::to_string).collect(),
            key: None,
        },
    }
}

// ============================================================================
// SECTION: Notification Timing
// ============================================================================

/// Builds the notification-timing demo scenario.
#[must_use]
pub fn notification_timing() -> Scenario {
    Scenario {
        scenario_id: "notification-timing".into(),
        version: "1.0.0".to_string(),
        description: Some("When, whether, and how to notify a user".to_string()),
        state_schema: StateSchema {
            core_dimensions: vec![
                computed_dimension(
                    "engagement_score",
                    "clamp(signals.interactions_7d / 10, 0, 1)",
                    &[],
                    json!(0.5),
                ),
                computed_dimension(
                    "churn_risk",
                    "clamp(1 - state.core.engagement_score, 0, 1)",
                    &["engagement_score"],
                    json!(0.2),
                ),
                signal_dimension("tenure_days", 0.0, 10_000.0, json!(30.0)),
            ],
            scenario_dimensions: vec![
                DimensionDef {
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
                },
                signal_dimension("notifications_sent_24h", 0.0, 50.0, json!(0.0)),
                signal_dimension("hours_since_last_notification", 0.0, 168.0, json!(24.0)),
                DimensionDef {
                    name: "content_relevance".to_string(),
                    kind: DimensionKind::Float,
                    range: Some(NumericRange {
                        min: 0.0,
                        max: 1.0,
                    }),
                    default: json!(0.5),
                    derivation: Derivation {
                        source: DerivationSource::Signal,
                        formula: None,
                        inputs: vec![],
                        key: Some("content_relevance_score".to_string()),
                    },
                },
            ],
        },
        actions: ActionsConfig {
            source: ActionSource::Static,
            action_types: vec![ActionTypeDef {
                type_id: "notification".into(),
                display_name: Some("Notification".to_string()),
                attributes: vec![AttributeDef {
                    name: "delivery".to_string(),
                    kind: AttributeKind::String,
                    range: None,
                    allowed_values: Some(vec![json!("immediate"), json!("delayed"), json!("none")]),
                    required: false,
                }],
                primary_skill: "notification-copywriter".into(),
            }],
        },
        guardrails: GuardrailsConfig {
            rules: vec![
                GuardrailRule {
                    rule_id: "GR-QUIET-HOURS".into(),
                    priority: 10,
                    condition: "state.scenario_extensions.local_hour < 7 || \
                                state.scenario_extensions.local_hour >= 22"
                        .to_string(),
                    effect: GuardrailEffect::BlockAction {
                        target: RuleTarget::ActionId {
                            action_id: "send-now".into(),
                        },
                    },
                },
                GuardrailRule {
                    rule_id: "GR-MAX-DAILY".into(),
                    priority: 20,
                    condition: "state.scenario_extensions.notifications_sent_24h >= 3".to_string(),
                    effect: GuardrailEffect::ForceAction {
                        action_id: "suppress".into(),
                    },
                },
                GuardrailRule {
                    rule_id: "GR-COOLDOWN".into(),
                    priority: 30,
                    condition: "state.scenario_extensions.hours_since_last_notification < 2"
                        .to_string(),
                    effect: GuardrailEffect::RequireCooldown {
                        target: RuleTarget::ActionId {
                            action_id: "send-now".into(),
                        },
                    },
                },
            ],
        },
        scoring: ScoringConfig {
            objectives: vec![
                ScoringObjective {
                    objective_id: "delivery_value".to_string(),
                    weight: 0.5,
                    formula: "if_else(action.attributes.delivery == 'immediate', 1, \
                              if_else(action.attributes.delivery == 'delayed', 0.6, 0.2))"
                        .to_string(),
                },
                ScoringObjective {
                    objective_id: "relevance".to_string(),
                    weight: 0.3,
                    formula: "state.scenario_extensions.content_relevance".to_string(),
                },
                ScoringObjective {
                    objective_id: "frequency_guard".to_string(),
                    weight: 0.2,
                    formula: "clamp(1 - state.scenario_extensions.notifications_sent_24h / 5, 0, 1)"
                        .to_string(),
                },
            ],
            weight_total: 1.0,
            execution_risk: None,
            tie_breakers: vec![TieBreaker::ActionIdAsc],
        },
        skills: SkillsConfig {
            available: vec![
                SkillDef {
                    skill_id: "notification-copywriter".into(),
                    version: "1.2.0".to_string(),
                    max_output_tokens: Some(150),
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

/// Builds a notification action with a delivery attribute.
#[must_use]
pub fn notification_action(action_id: &str, delivery: &str) -> ActionCandidate {
    let mut action = ActionCandidate::new(action_id, "notification");
    action.attributes.insert("delivery".to_string(), json!(delivery));
    action
}

/// Baseline notification request: 14:00 local, healthy engagement signals.
#[must_use]
pub fn notification_request(actions: Vec<ActionCandidate>) -> DecisionRequest {
    DecisionRequest {
        scenario_id: "notification-timing".into(),
        user_id: "user-42".into(),
        actions,
        signals: [
            ("interactions_7d".to_string(), json!(5)),
            ("notifications_sent_24h".to_string(), json!(1)),
            ("hours_since_last_notification".to_string(), json!(4)),
            ("content_relevance_score".to_string(), json!(0.8)),
        ]
        .into_iter()
        .collect(),
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

// ============================================================================
// SECTION: Fitness Session
// ============================================================================

/// Builds the fitness-session demo scenario.
#[must_use]
pub fn fitness_session() -> Scenario {
    Scenario {
        scenario_id: "fitness-session".into(),
        version: "1.0.0".to_string(),
        description: Some("Which workout session to offer next".to_string()),
        state_schema: StateSchema {
            core_dimensions: vec![
                computed_dimension(
                    "engagement_score",
                    "clamp(signals.sessions_7d / 7, 0, 1)",
                    &[],
                    json!(0.5),
                ),
                signal_dimension("fatigue", 0.0, 1.0, json!(0.3)),
                signal_dimension("tenure_days", 0.0, 10_000.0, json!(30.0)),
            ],
            scenario_dimensions: vec![DimensionDef {
                name: "variety_preference".to_string(),
                kind: DimensionKind::Float,
                range: Some(NumericRange {
                    min: 0.0,
                    max: 1.0,
                }),
                default: json!(0.5),
                derivation: Derivation {
                    source: DerivationSource::Memory,
                    formula: None,
                    inputs: vec![],
                    key: Some("learned.variety_boost".to_string()),
                },
            }],
        },
        actions: ActionsConfig {
            source: ActionSource::Static,
            action_types: vec![ActionTypeDef {
                type_id: "workout".into(),
                display_name: Some("Workout".to_string()),
                attributes: vec![
                    AttributeDef {
                        name: "intensity".to_string(),
                        kind: AttributeKind::String,
                        range: None,
                        allowed_values: Some(vec![json!("low"), json!("moderate"), json!("high")]),
                        required: false,
                    },
                    AttributeDef {
                        name: "duration_minutes".to_string(),
                        kind: AttributeKind::Float,
                        range: Some(NumericRange {
                            min: 5.0,
                            max: 120.0,
                        }),
                        allowed_values: None,
                        required: false,
                    },
                ],
                primary_skill: "coach-notes".into(),
            }],
        },
        guardrails: GuardrailsConfig {
            rules: vec![GuardrailRule {
                rule_id: "GR-FATIGUE-CAP".into(),
                priority: 10,
                condition: "state.core.fatigue > 0.7".to_string(),
                effect: GuardrailEffect::CapIntensity {
                    max_intensity: Intensity::Moderate,
                },
            }],
        },
        scoring: ScoringConfig {
            objectives: vec![
                ScoringObjective {
                    objective_id: "readiness_match".to_string(),
                    weight: 0.6,
                    formula: "if_else(action.attributes.intensity == 'high', \
                              1 - state.core.fatigue, \
                              if_else(action.attributes.intensity == 'moderate', 0.8, 0.6))"
                        .to_string(),
                },
                ScoringObjective {
                    objective_id: "variety".to_string(),
                    weight: 0.4,
                    formula: "state.scenario_extensions.variety_preference".to_string(),
                },
            ],
            weight_total: 1.0,
            execution_risk: Some(ExecutionRisk {
                weight: 0.5,
                max_total_penalty: 0.4,
                factors: vec![RiskFactor {
                    factor_id: "long_session".to_string(),
                    condition: "action.attributes.duration_minutes > 60".to_string(),
                    penalty: 0.2,
                }],
            }),
            tie_breakers: vec![
                TieBreaker::IntensityAsc,
                TieBreaker::DurationAsc,
                TieBreaker::ActionIdAsc,
            ],
        },
        skills: SkillsConfig {
            available: vec![
                SkillDef {
                    skill_id: "coach-notes".into(),
                    version: "0.9.0".to_string(),
                    max_output_tokens: Some(150),
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

/// Builds a workout action with intensity and duration attributes.
#[must_use]
pub fn workout_action(action_id: &str, intensity: &str, duration_minutes: f64) -> ActionCandidate {
    let mut action = ActionCandidate::new(action_id, "workout");
    action.attributes.insert("intensity".to_string(), json!(intensity));
    action
        .attributes
        .insert("duration_minutes".to_string(), json!(duration_minutes));
    action
}

/// Baseline fitness request: rested user, mid-morning.
#[must_use]
pub fn fitness_request(actions: Vec<ActionCandidate>) -> DecisionRequest {
    DecisionRequest {
        scenario_id: "fitness-session".into(),
        user_id: "athlete-7".into(),
        actions,
        signals: [
            ("sessions_7d".to_string(), json!(3)),
            ("fatigue".to_string(), json!(0.3)),
        ]
        .into_iter()
        .collect(),
        context: RequestContext {
            current_time: Some("2026-03-02T09:30:00-05:00".to_string()),
            timezone: Some("America/New_York".to_string()),
            platform_constraints: BTreeMap::new(),
            extra: BTreeMap::new(),
        },
        options: RequestOptions {
            execution_mode_override: Some(ExecutionMode::DeterministicOnly),
            include_rationale: true,
            include_score_breakdown: false,
            max_ranked_options: None,
        },
        decision_id: None,
        platform: None,
    }
}
