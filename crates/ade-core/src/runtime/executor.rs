// crates/ade-core/src/runtime/executor.rs
// ============================================================================
// Module: ADE Executor Registry
// Description: Execution-mode routing and the built-in template executor.
// Purpose: Map execution modes to skill executors and guarantee a
// deterministic executor is always present.
// Dependencies: crate::{core, interfaces, runtime::templates}, async-trait,
// serde_json
// ============================================================================

//! ## Overview
//! The registry maps each [`ExecutionMode`] to at most one executor.
//! `get_best_available` prefers skill-enhanced over deterministic-only. The
//! built-in [`TemplateExecutor`] renders the same priority ladder as Stage 8
//! and reports itself always available, which is what makes fallback
//! resolution total.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::core::scenario::ExecutionMode;
use crate::interfaces::ExecutionResult;
use crate::interfaces::ExecutorError;
use crate::interfaces::SkillExecutor;
use crate::interfaces::SkillInputEnvelope;
use crate::runtime::templates::render_template;
use crate::runtime::templates::select_template;

// ============================================================================
// SECTION: Executor Registry
// ============================================================================

/// Registry mapping execution modes to executors.
///
/// # Invariants
/// - Read-only after construction; safe for concurrent use.
#[derive(Clone, Default)]
pub struct ExecutorRegistry {
    /// Deterministic-only executor slot.
    deterministic: Option<Arc<dyn SkillExecutor>>,
    /// Skill-enhanced executor slot.
    enhanced: Option<Arc<dyn SkillExecutor>>,
}

impl ExecutorRegistry {
    /// Creates a registry with the built-in template executor installed.
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::default();
        registry.register(Arc::new(TemplateExecutor::new()));
        registry
    }

    /// Installs an executor under its own mode, replacing any previous one.
    pub fn register(&mut self, executor: Arc<dyn SkillExecutor>) {
        match executor.executor_mode() {
            ExecutionMode::DeterministicOnly => self.deterministic = Some(executor),
            ExecutionMode::SkillEnhanced => self.enhanced = Some(executor),
        }
    }

    /// Returns the executor for a mode.
    #[must_use]
    pub fn get(&self, mode: ExecutionMode) -> Option<Arc<dyn SkillExecutor>> {
        match mode {
            ExecutionMode::DeterministicOnly => self.deterministic.clone(),
            ExecutionMode::SkillEnhanced => self.enhanced.clone(),
        }
    }

    /// Returns the best available executor, preferring skill-enhanced.
    #[must_use]
    pub fn get_best_available(&self) -> Option<Arc<dyn SkillExecutor>> {
        if let Some(enhanced) = &self.enhanced
            && enhanced.is_available()
        {
            return Some(Arc::clone(enhanced));
        }
        self.deterministic
            .as_ref()
            .filter(|executor| executor.is_available())
            .map(Arc::clone)
    }
}

impl std::fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorRegistry")
            .field("deterministic", &self.deterministic.is_some())
            .field("enhanced", &self.enhanced.is_some())
            .finish()
    }
}

// ============================================================================
// SECTION: Template Executor
// ============================================================================

/// Built-in deterministic executor rendering fallback templates.
///
/// # Invariants
/// - Always available; never errors or times out.
/// - Output never carries prohibited selection keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateExecutor;

impl TemplateExecutor {
    /// Creates the template executor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SkillExecutor for TemplateExecutor {
    fn executor_mode(&self) -> ExecutionMode {
        ExecutionMode::DeterministicOnly
    }

    fn is_available(&self) -> bool {
        true
    }

    fn latency_estimate_ms(&self) -> u64 {
        1
    }

    async fn execute(
        &self,
        input: &SkillInputEnvelope,
        _timeout_ms: u64,
    ) -> Result<ExecutionResult, ExecutorError> {
        let template = select_template(Some(&input.user_state));
        let action_name = input.decision.selected_action.display_name();
        let payload = render_template(template, action_name);
        let token_count = estimate_tokens(&payload.rationale);
        let output = json!({
            "payload": payload,
            "metadata": {
                "template": template.as_str(),
                "skill_id": input.skill.skill_id,
                "skill_version": input.skill.skill_version,
            },
        });
        Ok(ExecutionResult {
            success: true,
            output: Some(output),
            error: None,
            execution_ms: 0,
            token_count,
        })
    }
}

/// Rough whitespace-based token estimate for template output.
fn estimate_tokens(text: &str) -> u32 {
    u32::try_from(text.split_whitespace().count()).unwrap_or(u32::MAX)
}
