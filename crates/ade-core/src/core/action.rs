// crates/ade-core/src/core/action.rs
// ============================================================================
// Module: ADE Action Candidates
// Description: Candidate actions offered to the engine and their attributes.
// Purpose: Provide the per-request action model with ordinal intensity handling.
// Dependencies: crate::core::identifiers, serde, serde_json
// ============================================================================

//! ## Overview
//! A candidate action is an opaque `(action_id, type_id, attributes)` triple.
//! `action_id` is the only identity used in ordering and comparison. The
//! `intensity` attribute is ordinal (`low < moderate < high`) and the
//! `duration_minutes` attribute is numeric; both feed tie-breaking.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::ActionId;
use crate::core::identifiers::ActionTypeId;

// ============================================================================
// SECTION: Well-Known Attributes
// ============================================================================

/// Attribute key carrying the ordinal intensity of an action.
pub const ATTR_INTENSITY: &str = "intensity";
/// Attribute key carrying the duration of an action in minutes.
pub const ATTR_DURATION_MINUTES: &str = "duration_minutes";
/// Attribute key carrying the human-readable display name of an action.
pub const ATTR_DISPLAY_NAME: &str = "display_name";

/// Ordinal used when an action declares no intensity.
pub const DEFAULT_INTENSITY_ORDINAL: u8 = 2;
/// Duration in minutes assumed when an action declares none.
pub const DEFAULT_DURATION_MINUTES: f64 = 30.0;

// ============================================================================
// SECTION: Intensity
// ============================================================================

/// Ordinal action intensity.
///
/// # Invariants
/// - Ordering is `low < moderate < high`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intensity {
    /// Low intensity.
    Low,
    /// Moderate intensity.
    Moderate,
    /// High intensity.
    High,
}

impl Intensity {
    /// Returns the 1-based ordinal of the intensity.
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Moderate => 2,
            Self::High => 3,
        }
    }

    /// Parses an intensity label, returning `None` for unknown text.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "low" => Some(Self::Low),
            "moderate" => Some(Self::Moderate),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    /// Returns the stable label for the intensity.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
        }
    }
}

// ============================================================================
// SECTION: Action Candidate
// ============================================================================

/// Candidate action offered to the engine; the engine picks exactly one.
///
/// # Invariants
/// - `action_id` is locally unique within a request.
/// - `type_id` must be declared by the scenario's actions config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCandidate {
    /// Action identifier, the only ordering identity.
    pub action_id: ActionId,
    /// Declared action type.
    pub type_id: ActionTypeId,
    /// Attribute map; defaults to empty when absent from the request.
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
}

impl ActionCandidate {
    /// Creates a candidate with an empty attribute map.
    #[must_use]
    pub fn new(action_id: impl Into<ActionId>, type_id: impl Into<ActionTypeId>) -> Self {
        Self {
            action_id: action_id.into(),
            type_id: type_id.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Returns the declared intensity, if one is present and recognized.
    #[must_use]
    pub fn intensity(&self) -> Option<Intensity> {
        self.attributes
            .get(ATTR_INTENSITY)
            .and_then(Value::as_str)
            .and_then(Intensity::parse)
    }

    /// Returns the intensity ordinal, treating missing as moderate.
    #[must_use]
    pub fn intensity_ordinal(&self) -> u8 {
        self.intensity().map_or(DEFAULT_INTENSITY_ORDINAL, Intensity::ordinal)
    }

    /// Returns the declared duration in minutes, treating missing as 30.
    #[must_use]
    pub fn duration_minutes(&self) -> f64 {
        self.attributes
            .get(ATTR_DURATION_MINUTES)
            .and_then(Value::as_f64)
            .unwrap_or(DEFAULT_DURATION_MINUTES)
    }

    /// Returns the display name, falling back to the action identifier.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.attributes
            .get(ATTR_DISPLAY_NAME)
            .and_then(Value::as_str)
            .unwrap_or_else(|| self.action_id.as_str())
    }
}
