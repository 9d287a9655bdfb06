// crates/ade-core/src/runtime/stages/ingest.rs
// ============================================================================
// Module: Stage 1 — Ingest
// Description: Request validation and candidate normalization.
// Purpose: Reject structurally invalid requests and discard client-supplied
// decision identifiers.
// Dependencies: crate::{core, runtime::stage}, async-trait, serde_json
// ============================================================================

//! ## Overview
//! Ingest rejects requests lacking a user, candidate actions, or a parseable
//! `context.current_time`, normalizes each candidate (attributes default to
//! empty), and rejects any action type the scenario does not declare. The
//! server-minted decision identifier is authoritative; a client-supplied one
//! is recorded as ignored.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use serde_json::Value;
use serde_json::json;

use crate::core::envelope::DecisionEnvelope;
use crate::core::time::Timestamp;
use crate::runtime::stage::StageContext;
use crate::runtime::stage::StageError;
use crate::runtime::stage::StageHandler;

// ============================================================================
// SECTION: Stage Handler
// ============================================================================

/// Stage 1 handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestStage;

#[async_trait]
impl StageHandler for IngestStage {
    fn number(&self) -> u8 {
        1
    }

    async fn run(
        &self,
        envelope: &mut DecisionEnvelope,
        ctx: &StageContext,
    ) -> Result<Value, StageError> {
        let request = &envelope.request;
        if request.user_id.as_str().is_empty() {
            return Err(StageError::InvalidRequest("user_id is required".to_string()));
        }
        if request.actions.is_empty() {
            return Err(StageError::InvalidRequest("actions[] must be non-empty".to_string()));
        }
        let Some(current_time) = request.context.current_time.as_deref() else {
            return Err(StageError::InvalidRequest(
                "context.current_time is required".to_string(),
            ));
        };
        if Timestamp::parse_rfc3339(current_time).is_err() {
            return Err(StageError::InvalidRequest(format!(
                "context.current_time is not RFC 3339: {current_time}"
            )));
        }

        let mut normalized = Vec::with_capacity(request.actions.len());
        for action in &request.actions {
            if action.action_id.as_str().is_empty() {
                return Err(StageError::InvalidRequest("action_id is required".to_string()));
            }
            if ctx.scenario.actions.action_type(&action.type_id).is_none() {
                return Err(StageError::InvalidActionType(format!(
                    "action {} declares unknown type {}",
                    action.action_id, action.type_id
                )));
            }
            normalized.push(action.clone());
        }

        let client_decision_id_ignored = envelope.request.decision_id.is_some();
        envelope.normalized_actions = normalized;

        Ok(json!({
            "action_count": envelope.normalized_actions.len(),
            "client_decision_id_ignored": client_decision_id_ignored,
        }))
    }
}
