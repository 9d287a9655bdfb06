// crates/ade-core/src/runtime/stages/fallback.rs
// ============================================================================
// Module: Stage 8 — Fallback
// Description: Deterministic payload synthesis for routed failures.
// Purpose: Guarantee a valid payload for every decision that reaches the
// fallback route; this stage may never fail.
// Dependencies: crate::{core, governance, runtime::{stage, templates}},
// async-trait, serde_json
// ============================================================================

//! ## Overview
//! A no-op unless the fallback route is set. Synthesis selects a template by
//! the state priority ladder and interpolates the locked selection's display
//! name; it never reads from the failed skill output. The rendered payload
//! is self-checked against the minimal prohibition table, and a constant
//! default template is the last rung, so synthesis is total.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use serde_json::json;

use crate::core::envelope::DecisionEnvelope;
use crate::governance::GovernanceTables;
use crate::runtime::stage::StageContext;
use crate::runtime::stage::StageError;
use crate::runtime::stage::StageHandler;
use crate::runtime::templates::FallbackTemplate;
use crate::runtime::templates::render_template;
use crate::runtime::templates::select_template;

// ============================================================================
// SECTION: Stage Handler
// ============================================================================

/// Stage 8 handler bound to the governance tables.
#[derive(Debug, Clone)]
pub struct FallbackStage {
    /// Minimal prohibition table for self-checks.
    tables: Arc<GovernanceTables>,
}

impl FallbackStage {
    /// Creates the stage over shared governance tables.
    #[must_use]
    pub const fn new(tables: Arc<GovernanceTables>) -> Self {
        Self {
            tables,
        }
    }
}

#[async_trait]
impl StageHandler for FallbackStage {
    fn number(&self) -> u8 {
        8
    }

    async fn run(
        &self,
        envelope: &mut DecisionEnvelope,
        _ctx: &StageContext,
    ) -> Result<Value, StageError> {
        if !envelope.fallback_triggered {
            return Ok(json!({"triggered": false}));
        }

        let action_name = envelope
            .selected_candidate()
            .map(|candidate| candidate.display_name().to_string())
            .or_else(|| {
                envelope.selected_action().map(|action| action.as_str().to_string())
            })
            .unwrap_or_else(|| "this option".to_string());

        let template = select_template(envelope.user_state.as_ref());
        let mut payload = render_template(template, &action_name);

        // Self-check; the constant default template is the safe last rung.
        if !self.tables.fallback_minimal.scan(&payload.rationale).is_empty() {
            payload = render_template(FallbackTemplate::Default, "this option");
        }

        envelope.fallback_payload = Some(payload.clone());
        envelope.final_payload = Some(payload);

        Ok(json!({
            "triggered": true,
            "template": template.as_str(),
            "reason": envelope.fallback_reason_code,
        }))
    }
}
