// crates/ade-core/src/runtime/stages/derive.rs
// ============================================================================
// Module: Stage 2 — Derive State
// Description: Dimension derivation from signals, context, formulas, and
// memory.
// Purpose: Produce the UserState with a replay-stable inputs hash.
// Dependencies: crate::{core, expr, interfaces, runtime::stage}, async-trait,
// serde_json
// ============================================================================

//! ## Overview
//! Dimensions evaluate in schema-declared order, core before scenario
//! extensions, so computed formulas see every previously-derived dimension.
//! Memory is non-authoritative: read failures resolve to declared defaults.
//! The context view is enriched with `local_hour` and `day_of_week` computed
//! from `context.current_time` so temporal guardrails can derive state from
//! the caller's clock rather than the server's.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use serde_json::json;

use crate::core::envelope::DecisionEnvelope;
use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::hash_canonical_json;
use crate::core::scenario::DerivationSource;
use crate::core::scenario::DimensionDef;
use crate::core::scenario::DimensionKind;
use crate::core::state::ExecutionCapabilities;
use crate::core::state::UserState;
use crate::core::time::local_hour_of;
use crate::core::time::weekday_of;
use crate::expr::EvalOptions;
use crate::expr::EvalScope;
use crate::expr::EvalValue;
use crate::expr::Formula;
use crate::interfaces::MemoryStore;
use crate::runtime::stage::StageContext;
use crate::runtime::stage::StageError;
use crate::runtime::stage::StageHandler;

// ============================================================================
// SECTION: Stage Handler
// ============================================================================

/// Stage 2 handler bound to the memory store.
#[derive(Clone)]
pub struct DeriveStateStage {
    /// Non-authoritative memory store.
    memory_store: Arc<dyn MemoryStore>,
}

impl DeriveStateStage {
    /// Creates the stage over a memory store.
    #[must_use]
    pub fn new(memory_store: Arc<dyn MemoryStore>) -> Self {
        Self {
            memory_store,
        }
    }
}

#[async_trait]
impl StageHandler for DeriveStateStage {
    fn number(&self) -> u8 {
        2
    }

    async fn run(
        &self,
        envelope: &mut DecisionEnvelope,
        ctx: &StageContext,
    ) -> Result<Value, StageError> {
        let request = &envelope.request;
        let platform = request.platform.as_deref().unwrap_or("default");

        // Memory reads must never abort a decision.
        let memory_view: BTreeMap<String, Value> = if let Some(pinned) = &ctx.memory_override {
            pinned.formula_view()
        } else {
            match self.memory_store.load(platform, &request.user_id).await {
                Ok(Some(record)) => record.formula_view(),
                Ok(None) | Err(_) => BTreeMap::new(),
            }
        };

        let context_view = build_context_view(envelope);
        let signals = request.signals.clone();

        let mut core = BTreeMap::new();
        let mut extensions = BTreeMap::new();
        for dimension in &ctx.scenario.state_schema.core_dimensions {
            let value =
                derive_dimension(dimension, &core, &extensions, &signals, &context_view, &memory_view);
            core.insert(dimension.name.clone(), value);
        }
        for dimension in &ctx.scenario.state_schema.scenario_dimensions {
            let value =
                derive_dimension(dimension, &core, &extensions, &signals, &context_view, &memory_view);
            extensions.insert(dimension.name.clone(), value);
        }

        let inputs_hash = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &json!({
            "signals": signals,
            "context": context_view,
        }))
        .map_err(|err| StageError::Internal(format!("inputs hash failed: {err}")))?;

        let capabilities = ExecutionCapabilities {
            platform: envelope.request.platform.clone(),
            constraints: envelope.request.context.platform_constraints.clone(),
        };

        envelope.user_state = Some(UserState {
            core,
            scenario_extensions: extensions,
            capabilities,
            inputs_hash: inputs_hash.clone(),
        });

        Ok(json!({
            "core_dimensions": ctx.scenario.state_schema.core_dimensions.len(),
            "scenario_dimensions": ctx.scenario.state_schema.scenario_dimensions.len(),
            "inputs_hash": inputs_hash,
            "memory_keys": memory_view.len(),
        }))
    }
}

// ============================================================================
// SECTION: Context View
// ============================================================================

/// Builds the formula-readable context map, enriched with temporal values.
fn build_context_view(envelope: &DecisionEnvelope) -> BTreeMap<String, Value> {
    let context = &envelope.request.context;
    let mut view: BTreeMap<String, Value> = context.extra.clone();
    if let Some(current_time) = &context.current_time {
        view.insert("current_time".to_string(), json!(current_time));
        if let Some(hour) = local_hour_of(current_time) {
            view.insert("local_hour".to_string(), json!(hour));
        }
        if let Some(day) = weekday_of(current_time) {
            view.insert("day_of_week".to_string(), json!(day));
        }
    }
    if let Some(timezone) = &context.timezone {
        view.insert("timezone".to_string(), json!(timezone));
    }
    view
}

// ============================================================================
// SECTION: Dimension Derivation
// ============================================================================

/// Derives one dimension value; total over every input.
fn derive_dimension(
    dimension: &DimensionDef,
    core: &BTreeMap<String, Value>,
    extensions: &BTreeMap<String, Value>,
    signals: &BTreeMap<String, Value>,
    context: &BTreeMap<String, Value>,
    memory: &BTreeMap<String, Value>,
) -> Value {
    let key = dimension.derivation.key.as_deref().unwrap_or(&dimension.name);
    let raw = match dimension.derivation.source {
        DerivationSource::Signal => signals.get(key).cloned(),
        DerivationSource::Context => context.get(key).cloned(),
        DerivationSource::Memory => memory.get(key).cloned(),
        DerivationSource::Computed => {
            compute_formula(dimension, core, extensions, signals, context, memory)
        }
    };
    coerce(dimension, raw)
}

/// Evaluates a computed derivation formula against prior dimensions.
fn compute_formula(
    dimension: &DimensionDef,
    core: &BTreeMap<String, Value>,
    extensions: &BTreeMap<String, Value>,
    signals: &BTreeMap<String, Value>,
    context: &BTreeMap<String, Value>,
    memory: &BTreeMap<String, Value>,
) -> Option<Value> {
    let source = dimension.derivation.formula.as_deref()?;
    let formula = Formula::parse(source).ok()?;
    let scope = EvalScope {
        state_core: Some(core),
        state_extensions: Some(extensions),
        signals: Some(signals),
        context: Some(context),
        action: None,
        memory: Some(memory),
    };
    let options = EvalOptions::for_derivation(EvalValue::from_json(&dimension.default));
    match formula.evaluate(&scope, &options) {
        EvalValue::Missing => None,
        EvalValue::Bool(flag) => Some(json!(flag)),
        EvalValue::Number(number) => Some(json!(number)),
        EvalValue::Str(text) => Some(json!(text)),
    }
}

/// Coerces a raw value to the dimension kind, clamping numeric ranges.
///
/// Values that do not coerce fall back to the declared default.
fn coerce(dimension: &DimensionDef, raw: Option<Value>) -> Value {
    let Some(raw) = raw else {
        return dimension.default.clone();
    };
    match dimension.kind {
        DimensionKind::Float => raw.as_f64().map_or_else(
            || dimension.default.clone(),
            |number| {
                let clamped = dimension.range.map_or(number, |range| range.clamp(number));
                json!(clamped)
            },
        ),
        DimensionKind::Integer => raw.as_f64().map_or_else(
            || dimension.default.clone(),
            |number| {
                let clamped = dimension.range.map_or(number, |range| range.clamp(number));
                json!(round_to_i64(clamped))
            },
        ),
        DimensionKind::Boolean => {
            raw.as_bool().map_or_else(|| dimension.default.clone(), |flag| json!(flag))
        }
        DimensionKind::String => {
            raw.as_str().map_or_else(|| dimension.default.clone(), |text| json!(text))
        }
    }
}

/// Rounds a finite float to the nearest representable `i64`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    reason = "The value is rounded and range-checked before the cast."
)]
fn round_to_i64(value: f64) -> i64 {
    let rounded = value.round();
    if !rounded.is_finite() {
        return 0;
    }
    if rounded >= i64::MAX as f64 {
        i64::MAX
    } else if rounded <= i64::MIN as f64 {
        i64::MIN
    } else {
        rounded as i64
    }
}
