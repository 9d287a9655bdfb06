// crates/ade-core/src/runtime/stages/execute.rs
// ============================================================================
// Module: Stage 6 — Execute Skill
// Description: Executor invocation under the skill timeout budget.
// Purpose: Produce raw skill output for validation; every failure routes to
// the deterministic fallback, never to the caller.
// Dependencies: crate::{core, interfaces, runtime::{executor, stage,
// validation}}, async-trait, serde_json, tokio
// ============================================================================

//! ## Overview
//! The stage builds the skill input envelope from the locked selection,
//! derived state, and skill config, then invokes the resolved executor under
//! `min(skill_execution_ms, remaining pipeline budget)`. Before accepting
//! output it re-checks the must-hold conditions: the selection is locked and
//! the output carries no prohibited selection key. Executor errors,
//! timeouts, and must-hold failures set the fallback route with a stable
//! reason code and never fail the request.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use serde_json::json;

use crate::core::envelope::DecisionEnvelope;
use crate::interfaces::DEFAULT_MAX_OUTPUT_TOKENS;
use crate::interfaces::ExecutorError;
use crate::interfaces::SkillDecisionContext;
use crate::interfaces::SkillInputEnvelope;
use crate::interfaces::SkillInvocationConfig;
use crate::runtime::executor::ExecutorRegistry;
use crate::runtime::stage::StageContext;
use crate::runtime::stage::StageError;
use crate::runtime::stage::StageHandler;
use crate::runtime::validation::find_prohibited_key;

// ============================================================================
// SECTION: Reason Codes
// ============================================================================

/// Fallback reason code for executor timeouts.
pub const REASON_SKILL_TIMEOUT: &str = "SKILL_TIMEOUT";
/// Fallback reason code for executor failures.
pub const REASON_EXECUTION_ERROR: &str = "EXECUTION_ERROR";
/// Fallback reason code for prohibited keys in raw output.
pub const REASON_PROHIBITED_KEY: &str = "INV-PROHIBITED-KEY";
/// Fallback reason code when no executor serves the resolved mode.
pub const REASON_EXECUTOR_UNAVAILABLE: &str = "EXECUTOR_UNAVAILABLE";

// ============================================================================
// SECTION: Stage Handler
// ============================================================================

/// Stage 6 handler bound to the executor registry.
#[derive(Debug, Clone)]
pub struct ExecuteSkillStage {
    /// Executor registry for mode routing.
    executors: ExecutorRegistry,
}

impl ExecuteSkillStage {
    /// Creates the stage over an executor registry.
    #[must_use]
    pub const fn new(executors: ExecutorRegistry) -> Self {
        Self {
            executors,
        }
    }
}

#[async_trait]
impl StageHandler for ExecuteSkillStage {
    fn number(&self) -> u8 {
        6
    }

    async fn run(
        &self,
        envelope: &mut DecisionEnvelope,
        ctx: &StageContext,
    ) -> Result<Value, StageError> {
        if envelope.fallback_triggered {
            return Ok(json!({"executed": false, "skipped": "fallback already routed"}));
        }
        if !envelope.selection_locked() {
            return Err(StageError::Internal(
                "selection must be locked before skill execution".to_string(),
            ));
        }
        let resolved = envelope
            .resolved_skill
            .clone()
            .ok_or_else(|| StageError::Internal("skill unresolved before execution".to_string()))?;
        let selected = envelope
            .selected_candidate()
            .cloned()
            .ok_or_else(|| StageError::Internal("selected candidate not found".to_string()))?;
        let state = envelope
            .user_state
            .clone()
            .ok_or_else(|| StageError::Internal("user state missing before execution".to_string()))?;
        let ranked = envelope
            .ranked_options()
            .map(<[_]>::to_vec)
            .ok_or_else(|| StageError::Internal("ranked options missing".to_string()))?;

        let skill_def = ctx.scenario.skills.skill(&resolved.skill_id);
        let skill_budget = ctx.scenario.execution.timeouts.skill_execution_ms;
        let timeout_ms = skill_budget.min(ctx.remaining_budget_ms().max(1));
        let input = SkillInputEnvelope {
            decision: SkillDecisionContext {
                decision_id: envelope.decision_id.clone(),
                selected_action: selected,
                ranked_options: ranked,
                triggered_guardrails: envelope.triggered_guardrails(),
            },
            user_state: state,
            skill: SkillInvocationConfig {
                skill_id: resolved.skill_id.clone(),
                skill_version: resolved.skill_version.clone(),
                execution_mode: resolved.execution_mode,
                max_output_tokens: skill_def
                    .and_then(|def| def.max_output_tokens)
                    .unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS),
                timeout_ms,
                params: skill_def.map(|def| def.params.clone()).unwrap_or_default(),
            },
        };

        let Some(executor) = self.executors.get(resolved.execution_mode) else {
            route_to_fallback(envelope, REASON_EXECUTOR_UNAVAILABLE);
            return Ok(json!({"executed": false, "reason": REASON_EXECUTOR_UNAVAILABLE}));
        };

        let outcome = tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            executor.execute(&input, timeout_ms),
        )
        .await;

        match outcome {
            Err(_) => {
                route_to_fallback(envelope, REASON_SKILL_TIMEOUT);
                Ok(json!({"executed": false, "reason": REASON_SKILL_TIMEOUT}))
            }
            Ok(Err(err)) => {
                let reason = match err {
                    ExecutorError::Timeout(_) => REASON_SKILL_TIMEOUT,
                    ExecutorError::Failed(_) | ExecutorError::Unavailable(_) => {
                        REASON_EXECUTION_ERROR
                    }
                };
                route_to_fallback(envelope, reason);
                Ok(json!({"executed": false, "reason": reason, "error": err.to_string()}))
            }
            Ok(Ok(result)) => {
                envelope.skill_execution_ms = Some(result.execution_ms);
                envelope.skill_token_count = Some(result.token_count);
                if !result.success {
                    route_to_fallback(envelope, REASON_EXECUTION_ERROR);
                    return Ok(json!({
                        "executed": false,
                        "reason": REASON_EXECUTION_ERROR,
                        "error": result.error,
                    }));
                }
                let Some(output) = result.output else {
                    route_to_fallback(envelope, REASON_EXECUTION_ERROR);
                    return Ok(json!({"executed": false, "reason": REASON_EXECUTION_ERROR}));
                };
                if let Some(key) = find_prohibited_key(&output) {
                    route_to_fallback(envelope, REASON_PROHIBITED_KEY);
                    return Ok(json!({
                        "executed": true,
                        "accepted": false,
                        "reason": REASON_PROHIBITED_KEY,
                        "prohibited_key": key,
                    }));
                }
                envelope.skill_output = Some(output);
                Ok(json!({
                    "executed": true,
                    "accepted": true,
                    "execution_ms": result.execution_ms,
                    "token_count": result.token_count,
                }))
            }
        }
    }
}

/// Marks the envelope for the deterministic fallback route.
fn route_to_fallback(envelope: &mut DecisionEnvelope, reason: &str) {
    envelope.fallback_triggered = true;
    if envelope.fallback_reason_code.is_none() {
        envelope.fallback_reason_code = Some(reason.to_string());
    }
}
