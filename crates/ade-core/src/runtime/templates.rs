// crates/ade-core/src/runtime/templates.rs
// ============================================================================
// Module: ADE Fallback Templates
// Description: Deterministic payload templates selected by user-state priority.
// Purpose: Synthesize a valid payload for Stage 8 and the built-in template
// executor; synthesis must always succeed.
// Dependencies: crate::core::{response, state}, serde, serde_json
// ============================================================================

//! ## Overview
//! Template selection walks a fixed priority ladder over the derived state:
//! `high_churn_risk > new_user > low_engagement > high_engagement > default`.
//! The selected action's display name is interpolated into authored text
//! that stays inside the authority boundary, so rendered payloads pass the
//! minimal prohibition check by construction.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::json;

use crate::core::response::DecisionPayload;
use crate::core::state::UserState;

// ============================================================================
// SECTION: Thresholds
// ============================================================================

/// Churn risk at or above which the gentle template applies.
pub const CHURN_RISK_THRESHOLD: f64 = 0.7;
/// Tenure in days under which the new-user template applies.
pub const NEW_USER_TENURE_DAYS: f64 = 7.0;
/// Engagement score under which the low-engagement template applies.
pub const LOW_ENGAGEMENT_THRESHOLD: f64 = 0.3;
/// Engagement score above which the high-engagement template applies.
pub const HIGH_ENGAGEMENT_THRESHOLD: f64 = 0.7;

// ============================================================================
// SECTION: Template Ladder
// ============================================================================

/// Fallback template identity, ordered by selection priority.
///
/// # Invariants
/// - Variants are stable for serialization and trace matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackTemplate {
    /// User shows elevated churn risk.
    HighChurnRisk,
    /// User signed up recently.
    NewUser,
    /// User engagement is low.
    LowEngagement,
    /// User engagement is high.
    HighEngagement,
    /// No state-specific template applies.
    Default,
}

impl FallbackTemplate {
    /// Returns the stable label for the template.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HighChurnRisk => "high_churn_risk",
            Self::NewUser => "new_user",
            Self::LowEngagement => "low_engagement",
            Self::HighEngagement => "high_engagement",
            Self::Default => "default",
        }
    }
}

/// Selects a template by walking the priority ladder over derived state.
#[must_use]
pub fn select_template(state: Option<&UserState>) -> FallbackTemplate {
    let Some(state) = state else {
        return FallbackTemplate::Default;
    };
    if state.core_number("churn_risk").is_some_and(|risk| risk >= CHURN_RISK_THRESHOLD) {
        return FallbackTemplate::HighChurnRisk;
    }
    if state
        .core_number("tenure_days")
        .is_some_and(|tenure| tenure < NEW_USER_TENURE_DAYS)
    {
        return FallbackTemplate::NewUser;
    }
    if let Some(engagement) = state.core_number("engagement_score") {
        if engagement < LOW_ENGAGEMENT_THRESHOLD {
            return FallbackTemplate::LowEngagement;
        }
        if engagement > HIGH_ENGAGEMENT_THRESHOLD {
            return FallbackTemplate::HighEngagement;
        }
    }
    FallbackTemplate::Default
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Renders a template into a payload, interpolating the action display name.
#[must_use]
pub fn render_template(template: FallbackTemplate, action_name: &str) -> DecisionPayload {
    let rationale = match template {
        FallbackTemplate::HighChurnRisk => {
            format!("No pressure today. {action_name} is available whenever it suits you.")
        }
        FallbackTemplate::NewUser => {
            format!("Welcome aboard. {action_name} is a gentle way to get started.")
        }
        FallbackTemplate::LowEngagement => {
            format!("Small steps count. {action_name} fits into a quiet moment.")
        }
        FallbackTemplate::HighEngagement => {
            format!("You are on a roll. {action_name} keeps the momentum going.")
        }
        FallbackTemplate::Default => {
            format!("Based on your current context, {action_name} fits this moment well.")
        }
    };
    let mut payload = DecisionPayload {
        rationale,
        display_title: Some(action_name.to_string()),
        display_parameters: std::collections::BTreeMap::new(),
    };
    payload
        .display_parameters
        .insert("template".to_string(), json!(template.as_str()));
    payload
}
