// crates/ade-core/src/runtime/stages/guardrails.rs
// ============================================================================
// Module: Stage 3 — Evaluate Guardrails
// Description: Priority-ordered rule evaluation over state, signals, and
// memory.
// Purpose: Block, force, or constrain candidate actions before ranking.
// Dependencies: crate::{core, expr, interfaces, runtime::stage}, async-trait,
// serde_json
// ============================================================================

//! ## Overview
//! Rules evaluate in ascending priority order against `{state, signals,
//! memory}`. Blocking effects shrink the eligible set; the first triggered
//! force rule in priority order wins; intensity caps block every action above
//! the ceiling; cooldown rules are block rules whose temporal window lives in
//! their own condition. A per-rule result record is emitted regardless of
//! trigger state, and an emptied eligible set is a terminal error carrying
//! the triggered rules and blocked actions.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use serde_json::json;

use crate::core::action::ActionCandidate;
use crate::core::envelope::DecisionEnvelope;
use crate::core::envelope::GuardrailResult;
use crate::core::identifiers::ActionId;
use crate::core::scenario::GuardrailEffect;
use crate::core::scenario::GuardrailRule;
use crate::core::scenario::RuleTarget;
use crate::expr::EvalOptions;
use crate::expr::EvalScope;
use crate::expr::eval_bool;
use crate::interfaces::MemoryStore;
use crate::runtime::stage::StageContext;
use crate::runtime::stage::StageError;
use crate::runtime::stage::StageHandler;

// ============================================================================
// SECTION: Stage Handler
// ============================================================================

/// Stage 3 handler bound to the memory store.
#[derive(Clone)]
pub struct GuardrailsStage {
    /// Non-authoritative memory store for rule conditions.
    memory_store: Arc<dyn MemoryStore>,
}

impl GuardrailsStage {
    /// Creates the stage over a memory store.
    #[must_use]
    pub fn new(memory_store: Arc<dyn MemoryStore>) -> Self {
        Self {
            memory_store,
        }
    }
}

#[async_trait]
impl StageHandler for GuardrailsStage {
    fn number(&self) -> u8 {
        3
    }

    async fn run(
        &self,
        envelope: &mut DecisionEnvelope,
        ctx: &StageContext,
    ) -> Result<Value, StageError> {
        let platform = envelope.request.platform.as_deref().unwrap_or("default");
        let memory_view: BTreeMap<String, Value> = if let Some(pinned) = &ctx.memory_override {
            pinned.formula_view()
        } else {
            match self.memory_store.load(platform, &envelope.request.user_id).await {
                Ok(Some(record)) => record.formula_view(),
                Ok(None) | Err(_) => BTreeMap::new(),
            }
        };

        let state = envelope
            .user_state
            .as_ref()
            .ok_or_else(|| StageError::Internal("user state missing before guardrails".to_string()))?;
        let signals = envelope.request.signals.clone();
        let scope = EvalScope {
            state_core: Some(&state.core),
            state_extensions: Some(&state.scenario_extensions),
            signals: Some(&signals),
            context: None,
            action: None,
            memory: Some(&memory_view),
        };
        let options = EvalOptions::for_guardrail();

        let mut rules: Vec<&GuardrailRule> = ctx.scenario.guardrails.rules.iter().collect();
        rules.sort_by_key(|rule| rule.priority);

        let mut eligible: Vec<ActionCandidate> = envelope.normalized_actions.clone();
        let mut results: Vec<GuardrailResult> = Vec::with_capacity(rules.len());
        let mut forced: Option<ActionId> = None;
        let mut all_blocked: Vec<ActionId> = Vec::new();

        for rule in rules {
            let triggered = eval_bool(&rule.condition, &scope, &options);
            let mut blocked_ids: Vec<ActionId> = Vec::new();
            if triggered {
                match &rule.effect {
                    GuardrailEffect::BlockAction {
                        target,
                    }
                    | GuardrailEffect::RequireCooldown {
                        target,
                    } => {
                        eligible.retain(|candidate| {
                            let matched = target_matches(target, candidate);
                            if matched {
                                blocked_ids.push(candidate.action_id.clone());
                            }
                            !matched
                        });
                    }
                    GuardrailEffect::ForceAction {
                        action_id,
                    } => {
                        // Lowest priority number wins; later force rules lose.
                        if forced.is_none() {
                            forced = Some(action_id.clone());
                        }
                    }
                    GuardrailEffect::CapIntensity {
                        max_intensity,
                    } => {
                        let ceiling = max_intensity.ordinal();
                        eligible.retain(|candidate| {
                            let over = candidate.intensity_ordinal() > ceiling;
                            if over {
                                blocked_ids.push(candidate.action_id.clone());
                            }
                            !over
                        });
                    }
                }
            }
            all_blocked.extend(blocked_ids.iter().cloned());
            results.push(GuardrailResult {
                rule_id: rule.rule_id.clone(),
                triggered,
                effect: effect_label(&rule.effect).to_string(),
                blocked_action_ids: blocked_ids,
            });
        }

        envelope.guardrail_results = results;
        envelope.forced_action = forced;
        envelope.eligible_actions =
            eligible.iter().map(|candidate| candidate.action_id.clone()).collect();

        if envelope.eligible_actions.is_empty() {
            return Err(StageError::NoEligibleActions {
                triggered_rules: envelope.triggered_guardrails(),
                blocked_actions: all_blocked,
            });
        }

        Ok(json!({
            "rules_evaluated": envelope.guardrail_results.len(),
            "triggered": envelope.triggered_guardrails(),
            "eligible": envelope.eligible_actions,
            "forced_action": envelope.forced_action,
        }))
    }
}

// ============================================================================
// SECTION: Target Matching
// ============================================================================

/// Returns true when a blocking target matches a candidate.
fn target_matches(target: &RuleTarget, candidate: &ActionCandidate) -> bool {
    match target {
        RuleTarget::ActionId {
            action_id,
        } => &candidate.action_id == action_id,
        RuleTarget::ActionType {
            type_id,
        } => &candidate.type_id == type_id,
        RuleTarget::Attribute {
            name,
            value,
        } => candidate.attributes.get(name) == Some(value),
    }
}

/// Returns the stable label for an effect.
const fn effect_label(effect: &GuardrailEffect) -> &'static str {
    match effect {
        GuardrailEffect::BlockAction { .. } => "block_action",
        GuardrailEffect::ForceAction { .. } => "force_action",
        GuardrailEffect::CapIntensity { .. } => "cap_intensity",
        GuardrailEffect::RequireCooldown { .. } => "require_cooldown",
    }
}
