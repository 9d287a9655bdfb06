// crates/ade-core/src/runtime/stages/ranking.rs
// ============================================================================
// Module: Stage 4 — Score and Rank
// Description: Objective scoring, risk penalties, tie-breaking, and the
// selection lock.
// Purpose: Produce the ranked option list and lock the selection; this is
// the last stage allowed to influence which action wins.
// Dependencies: crate::{core, expr, runtime::stage}, async-trait, serde_json
// ============================================================================

//! ## Overview
//! A triggered force rule whose target survives the eligible set short-cuts
//! to a one-entry ranked list with score 1.0. Otherwise every eligible
//! action is scored per objective (each clamped to [0,1], then weighted),
//! execution-risk penalties are accumulated, capped, weighted, and
//! subtracted, and the list sorts descending by score with a stable sort.
//! Scores within 1e-3 are tied; an adjacent-pair post-pass applies the
//! scenario's tie-breaker chain. The selection locks here and nothing after
//! this stage can change it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use serde_json::json;

use crate::core::action::ActionCandidate;
use crate::core::envelope::DecisionEnvelope;
use crate::core::response::RankedOption;
use crate::core::scenario::Scenario;
use crate::core::scenario::TieBreaker;
use crate::core::state::UserState;
use crate::expr::EvalOptions;
use crate::expr::EvalScope;
use crate::expr::eval_bool;
use crate::expr::eval_number;
use crate::runtime::stage::StageContext;
use crate::runtime::stage::StageError;
use crate::runtime::stage::StageHandler;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Two scores are tied when they differ by less than this.
pub const TIE_EPSILON: f64 = 1e-3;
/// Objective score fallback when a formula is invalid or non-numeric.
const OBJECTIVE_FALLBACK: f64 = 0.5;

// ============================================================================
// SECTION: Stage Handler
// ============================================================================

/// Stage 4 handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreRankStage;

#[async_trait]
impl StageHandler for ScoreRankStage {
    fn number(&self) -> u8 {
        4
    }

    async fn run(
        &self,
        envelope: &mut DecisionEnvelope,
        ctx: &StageContext,
    ) -> Result<Value, StageError> {
        let state = envelope
            .user_state
            .clone()
            .ok_or_else(|| StageError::Internal("user state missing before ranking".to_string()))?;
        let eligible: Vec<ActionCandidate> = envelope
            .normalized_actions
            .iter()
            .filter(|candidate| envelope.eligible_actions.contains(&candidate.action_id))
            .cloned()
            .collect();
        if eligible.is_empty() {
            return Err(StageError::NoEligibleActions {
                triggered_rules: envelope.triggered_guardrails(),
                blocked_actions: Vec::new(),
            });
        }

        // A surviving forced action short-cuts scoring entirely.
        if let Some(forced) = envelope.forced_action.clone()
            && eligible.iter().any(|candidate| candidate.action_id == forced)
        {
            let ranked = vec![RankedOption {
                action_id: forced.clone(),
                rank: 1,
                score: 1.0,
                score_breakdown: Some(BTreeMap::new()),
            }];
            envelope.selection_margin = Some(1.0);
            envelope
                .lock_selection(forced.clone(), ranked.clone())
                .map_err(|err| StageError::Internal(err.to_string()))?;
            return Ok(json!({
                "forced": true,
                "selected_action": forced,
                "ranked_count": 1,
            }));
        }

        let mut scored: Vec<(ActionCandidate, f64, BTreeMap<String, f64>)> = eligible
            .into_iter()
            .map(|candidate| {
                let (score, breakdown) = score_candidate(&ctx.scenario, &state, &candidate);
                (candidate, score, breakdown)
            })
            .collect();

        // Stable descending sort preserves request order for exact ties.
        scored.sort_by(|left, right| {
            right.1.partial_cmp(&left.1).unwrap_or(Ordering::Equal)
        });
        apply_tie_breakers(&mut scored, &ctx.scenario.scoring.tie_breakers);

        let ranked: Vec<RankedOption> = scored
            .iter()
            .enumerate()
            .map(|(index, (candidate, score, breakdown))| RankedOption {
                action_id: candidate.action_id.clone(),
                rank: u32::try_from(index + 1).unwrap_or(u32::MAX),
                score: *score,
                score_breakdown: Some(breakdown.clone()),
            })
            .collect();

        let margin = if ranked.len() >= 2 {
            ranked[0].score - ranked[1].score
        } else {
            1.0
        };
        let selected = ranked[0].action_id.clone();
        envelope.selection_margin = Some(margin);
        envelope
            .lock_selection(selected.clone(), ranked.clone())
            .map_err(|err| StageError::Internal(err.to_string()))?;

        Ok(json!({
            "forced": false,
            "selected_action": selected,
            "selection_margin": margin,
            "ranked_count": ranked.len(),
        }))
    }
}

// ============================================================================
// SECTION: Scoring
// ============================================================================

/// Scores one candidate: weighted objectives minus capped risk penalties.
fn score_candidate(
    scenario: &Scenario,
    state: &UserState,
    candidate: &ActionCandidate,
) -> (f64, BTreeMap<String, f64>) {
    let scope = EvalScope {
        state_core: Some(&state.core),
        state_extensions: Some(&state.scenario_extensions),
        signals: None,
        context: None,
        action: Some(candidate),
        memory: None,
    };
    let options = EvalOptions::for_scoring();

    let mut breakdown = BTreeMap::new();
    let mut weighted_sum = 0.0;
    for objective in &scenario.scoring.objectives {
        let raw = eval_number(&objective.formula, &scope, &options, OBJECTIVE_FALLBACK);
        let clamped = raw.clamp(0.0, 1.0);
        breakdown.insert(objective.objective_id.clone(), clamped);
        weighted_sum += clamped * objective.weight;
    }

    let mut final_score = weighted_sum;
    if let Some(risk) = &scenario.scoring.execution_risk {
        let guard_options = EvalOptions::for_guardrail();
        let mut total_penalty = 0.0;
        for factor in &risk.factors {
            if eval_bool(&factor.condition, &scope, &guard_options) {
                total_penalty += factor.penalty;
            }
        }
        let capped = total_penalty.min(risk.max_total_penalty);
        let applied = capped * risk.weight;
        if applied > 0.0 {
            breakdown.insert("execution_risk".to_string(), -applied);
        }
        final_score -= applied;
    }

    (final_score.clamp(0.0, 1.0), breakdown)
}

// ============================================================================
// SECTION: Tie-Breaking
// ============================================================================

/// Applies the tie-breaker chain to adjacent tied pairs until stable.
fn apply_tie_breakers(
    scored: &mut [(ActionCandidate, f64, BTreeMap<String, f64>)],
    breakers: &[TieBreaker],
) {
    if breakers.is_empty() || scored.len() < 2 {
        return;
    }
    loop {
        let mut swapped = false;
        for index in 0 .. scored.len() - 1 {
            let tied = (scored[index].1 - scored[index + 1].1).abs() < TIE_EPSILON;
            if tied
                && tie_break(&scored[index].0, &scored[index + 1].0, breakers)
                    == Ordering::Greater
            {
                scored.swap(index, index + 1);
                swapped = true;
            }
        }
        if !swapped {
            break;
        }
    }
}

/// Compares two tied candidates through the breaker chain.
fn tie_break(
    left: &ActionCandidate,
    right: &ActionCandidate,
    breakers: &[TieBreaker],
) -> Ordering {
    for breaker in breakers {
        let ordering = match breaker {
            TieBreaker::ActionIdAsc => left.action_id.cmp(&right.action_id),
            TieBreaker::IntensityAsc => left.intensity_ordinal().cmp(&right.intensity_ordinal()),
            TieBreaker::DurationAsc => left
                .duration_minutes()
                .partial_cmp(&right.duration_minutes())
                .unwrap_or(Ordering::Equal),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
