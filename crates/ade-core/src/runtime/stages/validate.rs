// crates/ade-core/src/runtime/stages/validate.rs
// ============================================================================
// Module: Stage 7 — Validate Output
// Description: Four-phase validation of the raw skill output.
// Purpose: Accept the skill payload only when schema, invariants, authority,
// and prohibition phases all pass.
// Dependencies: crate::{core, runtime::{stage, validation}}, async-trait,
// serde_json
// ============================================================================

//! ## Overview
//! With a fallback already routed (or no output to validate) the stage
//! records a skipped result. Otherwise it runs the four-phase validator,
//! stores the full report on the envelope, and on any failure routes to
//! Stage 8 with the first violation's check id as the reason code. On
//! success the skill payload is projected into the final decision payload.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use serde_json::json;

use crate::core::envelope::DecisionEnvelope;
use crate::core::response::DecisionPayload;
use crate::runtime::stage::StageContext;
use crate::runtime::stage::StageError;
use crate::runtime::stage::StageHandler;
use crate::runtime::validation::OutputValidator;

// ============================================================================
// SECTION: Stage Handler
// ============================================================================

/// Stage 7 handler bound to the output validator.
#[derive(Debug, Clone)]
pub struct ValidateOutputStage {
    /// Four-phase validator over the governance tables.
    validator: OutputValidator,
}

impl ValidateOutputStage {
    /// Creates the stage over a validator.
    #[must_use]
    pub const fn new(validator: OutputValidator) -> Self {
        Self {
            validator,
        }
    }
}

#[async_trait]
impl StageHandler for ValidateOutputStage {
    fn number(&self) -> u8 {
        7
    }

    async fn run(
        &self,
        envelope: &mut DecisionEnvelope,
        _ctx: &StageContext,
    ) -> Result<Value, StageError> {
        if envelope.fallback_triggered {
            return Ok(json!({"validated": false, "skipped": "fallback already routed"}));
        }
        let Some(output) = envelope.skill_output.clone() else {
            envelope.fallback_triggered = true;
            envelope.fallback_reason_code = Some("MISSING_SKILL_OUTPUT".to_string());
            return Ok(json!({"validated": false, "skipped": "no skill output"}));
        };

        let report = self.validator.validate(envelope, &output);
        let passed = report.passed;
        let first_failure = report.first_failure.clone();
        let report_artifact = serde_json::to_value(&report).unwrap_or(Value::Null);
        envelope.validation = Some(report);

        if passed {
            let payload = project_payload(&output);
            // Schema tolerates an absent rationale; the response contract
            // does not, so an empty projection still routes to Stage 8.
            if payload.rationale.is_empty() {
                envelope.fallback_triggered = true;
                envelope.fallback_reason_code = Some("MISSING_RATIONALE".to_string());
                return Ok(json!({"validated": true, "passed": true, "reason": "MISSING_RATIONALE"}));
            }
            envelope.final_payload = Some(payload);
            return Ok(json!({"validated": true, "passed": true, "report": report_artifact}));
        }

        let reason = first_failure.map_or_else(
            || "VALIDATION_FAILED".to_string(),
            |failure| failure.violation.check_id,
        );
        envelope.fallback_triggered = true;
        envelope.fallback_reason_code = Some(reason.clone());
        Ok(json!({
            "validated": true,
            "passed": false,
            "reason": reason,
            "report": report_artifact,
        }))
    }
}

// ============================================================================
// SECTION: Payload Projection
// ============================================================================

/// Projects accepted skill output into the response payload shape.
fn project_payload(output: &Value) -> DecisionPayload {
    let payload = output.get("payload");
    let rationale = payload
        .and_then(|value| value.get("rationale"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let display_title = payload
        .and_then(|value| value.get("display_title"))
        .and_then(Value::as_str)
        .map(ToString::to_string);
    let display_parameters: BTreeMap<String, Value> = payload
        .and_then(|value| value.get("display_parameters"))
        .and_then(Value::as_object)
        .map(|map| map.iter().map(|(key, value)| (key.clone(), value.clone())).collect())
        .unwrap_or_default();
    DecisionPayload {
        rationale,
        display_title,
        display_parameters,
    }
}
