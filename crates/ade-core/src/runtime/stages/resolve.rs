// crates/ade-core/src/runtime/stages/resolve.rs
// ============================================================================
// Module: Stage 5 — Resolve Skills
// Description: Skill and execution-mode resolution for the locked selection.
// Purpose: Pick the executor path without ever touching the selection.
// Dependencies: crate::{core, runtime::{executor, stage}}, async-trait,
// serde_json
// ============================================================================

//! ## Overview
//! Resolution starts from the selected action's type: the per-type mapping
//! override wins over the type's declared primary skill and the scenario's
//! default fallback. The effective mode honors a request override only when
//! the scenario allows it. Deterministic-only mode always resolves to the
//! fallback (template) skill; otherwise the primary skill is used when its
//! executor reports available.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use serde_json::Value;
use serde_json::json;

use crate::core::envelope::DecisionEnvelope;
use crate::core::envelope::ResolvedSkill;
use crate::core::identifiers::SkillId;
use crate::core::scenario::ExecutionMode;
use crate::runtime::executor::ExecutorRegistry;
use crate::runtime::stage::StageContext;
use crate::runtime::stage::StageError;
use crate::runtime::stage::StageHandler;

// ============================================================================
// SECTION: Stage Handler
// ============================================================================

/// Stage 5 handler bound to the executor registry.
#[derive(Debug, Clone)]
pub struct ResolveSkillsStage {
    /// Executor registry for availability checks.
    executors: ExecutorRegistry,
}

impl ResolveSkillsStage {
    /// Creates the stage over an executor registry.
    #[must_use]
    pub const fn new(executors: ExecutorRegistry) -> Self {
        Self {
            executors,
        }
    }
}

#[async_trait]
impl StageHandler for ResolveSkillsStage {
    fn number(&self) -> u8 {
        5
    }

    async fn run(
        &self,
        envelope: &mut DecisionEnvelope,
        ctx: &StageContext,
    ) -> Result<Value, StageError> {
        let candidate = envelope
            .selected_candidate()
            .cloned()
            .ok_or_else(|| StageError::Internal("selection missing before resolve".to_string()))?;
        let action_type = ctx
            .scenario
            .actions
            .action_type(&candidate.type_id)
            .ok_or_else(|| {
                StageError::Internal(format!("undeclared action type {}", candidate.type_id))
            })?;

        // Per-action-type mapping overrides the declared primary/fallback.
        let mapping = ctx.scenario.skills.mappings.get(candidate.type_id.as_str());
        let primary: SkillId = mapping
            .map_or_else(|| action_type.primary_skill.clone(), |entry| entry.primary.clone());
        let fallback: SkillId = mapping
            .and_then(|entry| entry.fallback.clone())
            .unwrap_or_else(|| ctx.scenario.skills.default_fallback.clone());

        let requested = envelope.request.options.execution_mode_override;
        let effective_mode = match requested {
            Some(mode) if ctx.scenario.execution.allow_mode_override => mode,
            _ => ctx.scenario.execution.default_mode,
        };

        let (skill_id, execution_mode, reason) = match effective_mode {
            ExecutionMode::DeterministicOnly => {
                (fallback, ExecutionMode::DeterministicOnly, "mode_override")
            }
            ExecutionMode::SkillEnhanced => {
                let available = self
                    .executors
                    .get(ExecutionMode::SkillEnhanced)
                    .is_some_and(|executor| executor.is_available());
                if available {
                    (primary, ExecutionMode::SkillEnhanced, "primary")
                } else {
                    (fallback, ExecutionMode::DeterministicOnly, "fallback_unavailable")
                }
            }
        };

        let skill_version = ctx
            .scenario
            .skills
            .skill(&skill_id)
            .map_or_else(|| "0.0.0".to_string(), |def| def.version.clone());

        envelope.resolved_skill = Some(ResolvedSkill {
            skill_id: skill_id.clone(),
            skill_version: skill_version.clone(),
            execution_mode,
            resolution_reason: reason.to_string(),
        });

        Ok(json!({
            "skill_id": skill_id,
            "skill_version": skill_version,
            "execution_mode": execution_mode,
            "resolution_reason": reason,
        }))
    }
}
