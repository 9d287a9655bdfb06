// crates/ade-core/src/runtime/pipeline.rs
// ============================================================================
// Module: ADE Pipeline Orchestrator
// Description: Nine-stage walk with timing, error routing, trace assembly,
// and replay verification.
// Purpose: Drive one decision end to end and write exactly one audit trace
// per request that reaches Stage 9.
// Dependencies: crate::{core, governance, interfaces, registry, runtime,
// telemetry}, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The orchestrator resolves the scenario, builds the envelope, and walks
//! stages 1-9 in strictly increasing order. Stage failures from 1-5 and 9
//! are terminal; failures from 6-7 route to the deterministic fallback and
//! the walk continues. Pipeline-budget expiry and cancellation follow the
//! same split: after the selection lock they route through Stage 8 so a
//! trace with the locked selection is still persisted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::core::envelope::DecisionEnvelope;
use crate::core::envelope::ResolvedSkill;
use crate::core::envelope::StageTiming;
use crate::core::hashing::HashDigest;
use crate::core::identifiers::DecisionId;
use crate::core::memory::MemoryRecord;
use crate::core::request::DecisionRequest;
use crate::core::response::AuditSection;
use crate::core::response::DecisionResponse;
use crate::core::response::DecisionSection;
use crate::core::response::ExecutionSection;
use crate::core::response::MetaSection;
use crate::core::response::RankedOption;
use crate::core::response::ValidationStatus;
use crate::core::scenario::ExecutionMode;
use crate::core::time::Timestamp;
use crate::core::trace::AuditTrace;
use crate::core::trace::DeterminismVerdict;
use crate::governance::GovernanceError;
use crate::governance::GovernanceTables;
use crate::interfaces::AuditStore;
use crate::interfaces::MemoryStore;
use crate::registry::RegistryError;
use crate::registry::ScenarioRegistry;
use crate::runtime::comparator::ReplayComparison;
use crate::runtime::comparator::compare_responses;
use crate::runtime::executor::ExecutorRegistry;
use crate::runtime::stage::CancelToken;
use crate::runtime::stage::StageContext;
use crate::runtime::stage::StageError;
use crate::runtime::stage::StageHandler;
use crate::runtime::stages::AuditReplayStage;
use crate::runtime::stages::DeriveStateStage;
use crate::runtime::stages::ExecuteSkillStage;
use crate::runtime::stages::FallbackStage;
use crate::runtime::stages::GuardrailsStage;
use crate::runtime::stages::IngestStage;
use crate::runtime::stages::ResolveSkillsStage;
use crate::runtime::stages::ScoreRankStage;
use crate::runtime::stages::ValidateOutputStage;
use crate::runtime::validation::OutputValidator;
use crate::telemetry::DecisionOutcomeLabel;
use crate::telemetry::EngineMetrics;
use crate::telemetry::NoopMetrics;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// API version label emitted in response meta sections.
pub const API_VERSION: &str = "v1";
/// Engine version bound to the build.
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
/// Fallback reason code for pipeline-budget expiry during stages 6-7.
pub const REASON_PIPELINE_TIMEOUT: &str = "PIPELINE_TIMEOUT";
/// Fallback reason code for cancellation after the selection lock.
pub const REASON_CANCELLED: &str = "CANCELLED";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Terminal engine errors surfaced to callers.
///
/// # Invariants
/// - Variants are stable for programmatic handling; [`EngineError::code`]
///   values match the wire contract.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Request is structurally invalid.
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// Human-readable detail.
        message: String,
    },
    /// Scenario is unknown.
    #[error("invalid scenario: {message}")]
    InvalidScenario {
        /// Human-readable detail.
        message: String,
    },
    /// Request names an undeclared action type.
    #[error("invalid action type: {message}")]
    InvalidActionType {
        /// Human-readable detail.
        message: String,
    },
    /// Guardrails removed every candidate.
    #[error("no eligible actions: {message}")]
    NoEligibleActions {
        /// Human-readable detail.
        message: String,
        /// Triggered rules and blocked actions.
        details: Value,
    },
    /// Decision identifier is unknown (replay surfaces).
    #[error("unknown decision: {message}")]
    UnknownDecision {
        /// Human-readable detail.
        message: String,
    },
    /// Unexpected internal failure.
    #[error("internal error: {message}")]
    Internal {
        /// Human-readable detail.
        message: String,
    },
}

impl EngineError {
    /// Returns the stable wire code for the error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "INVALID_REQUEST",
            Self::InvalidScenario { .. } => "INVALID_SCENARIO",
            Self::InvalidActionType { .. } => "INVALID_ACTION_TYPE",
            Self::NoEligibleActions { .. } => "NO_ELIGIBLE_ACTIONS",
            Self::UnknownDecision { .. } => "UNKNOWN_DECISION",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Maps a terminal stage error into an engine error.
    fn from_stage(error: StageError) -> Self {
        match error {
            StageError::InvalidRequest(message) => Self::InvalidRequest {
                message,
            },
            StageError::InvalidActionType(message) => Self::InvalidActionType {
                message,
            },
            StageError::NoEligibleActions {
                triggered_rules,
                blocked_actions,
            } => Self::NoEligibleActions {
                message: "guardrails removed every candidate action".to_string(),
                details: json!({
                    "triggered_rules": triggered_rules,
                    "blocked_actions": blocked_actions,
                }),
            },
            StageError::SkillTimeout(_)
            | StageError::ExecutionError(_)
            | StageError::ValidationFailed(_) => Self::Internal {
                message: error.to_string(),
            },
            StageError::Internal(message) => Self::Internal {
                message,
            },
        }
    }
}

impl From<RegistryError> for EngineError {
    fn from(error: RegistryError) -> Self {
        match error {
            RegistryError::Unknown {
                scenario_id,
                version,
            } => Self::InvalidScenario {
                message: format!("unknown scenario: {scenario_id}@{version}"),
            },
            other => Self::Internal {
                message: other.to_string(),
            },
        }
    }
}

// ============================================================================
// SECTION: Run Options and Outcome
// ============================================================================

/// Per-run options; defaults describe a live caller-facing decision.
///
/// # Invariants
/// - `pinned_hash` and `memory_override` are set together by the replay
///   verifier.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Resolve the scenario by content hash instead of `"latest"`.
    pub pinned_hash: Option<HashDigest>,
    /// Pinned memory record replacing live memory reads.
    pub memory_override: Option<Arc<MemoryRecord>>,
    /// Cooperative cancellation token.
    pub cancel: Option<CancelToken>,
}

/// Result of one completed pipeline run.
///
/// # Invariants
/// - `trace` is the exact trace handed to the audit store.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// Caller-facing response.
    pub response: DecisionResponse,
    /// Committed audit trace.
    pub trace: AuditTrace,
}

// ============================================================================
// SECTION: Pipeline
// ============================================================================

/// Nine-stage decision pipeline.
///
/// # Invariants
/// - Stage handlers are read-only after construction.
/// - Exactly one audit write per request that reaches Stage 9.
pub struct DecisionPipeline {
    /// Scenario registry.
    registry: Arc<ScenarioRegistry>,
    /// Audit trace store.
    audit_store: Arc<dyn AuditStore>,
    /// Non-authoritative memory store.
    memory_store: Arc<dyn MemoryStore>,
    /// Compiled governance tables.
    governance: Arc<GovernanceTables>,
    /// Metrics sink.
    metrics: Arc<dyn EngineMetrics>,
    /// Stage handlers keyed by number.
    stages: BTreeMap<u8, Arc<dyn StageHandler>>,
    /// Engine version bound to traces.
    engine_version: String,
}

impl DecisionPipeline {
    /// Builds a pipeline with the standard nine stages installed.
    ///
    /// # Errors
    ///
    /// Returns [`GovernanceError`] when the built-in pattern tables fail to
    /// compile.
    pub fn new(
        registry: Arc<ScenarioRegistry>,
        executors: ExecutorRegistry,
        audit_store: Arc<dyn AuditStore>,
        memory_store: Arc<dyn MemoryStore>,
    ) -> Result<Self, GovernanceError> {
        let governance = Arc::new(GovernanceTables::v1()?);
        let validator = OutputValidator::new(Arc::clone(&governance));
        let mut stages: BTreeMap<u8, Arc<dyn StageHandler>> = BTreeMap::new();
        let handlers: Vec<Arc<dyn StageHandler>> = vec![
            Arc::new(IngestStage),
            Arc::new(DeriveStateStage::new(Arc::clone(&memory_store))),
            Arc::new(GuardrailsStage::new(Arc::clone(&memory_store))),
            Arc::new(ScoreRankStage),
            Arc::new(ResolveSkillsStage::new(executors.clone())),
            Arc::new(ExecuteSkillStage::new(executors)),
            Arc::new(ValidateOutputStage::new(validator)),
            Arc::new(FallbackStage::new(Arc::clone(&governance))),
            Arc::new(AuditReplayStage::new(Arc::clone(&memory_store))),
        ];
        for handler in handlers {
            stages.insert(handler.number(), handler);
        }
        Ok(Self {
            registry,
            audit_store,
            memory_store,
            governance,
            metrics: Arc::new(NoopMetrics),
            stages,
            engine_version: ENGINE_VERSION.to_string(),
        })
    }

    /// Replaces the metrics sink.
    pub fn set_metrics(&mut self, metrics: Arc<dyn EngineMetrics>) {
        self.metrics = metrics;
    }

    /// Returns the compiled governance tables.
    #[must_use]
    pub fn governance(&self) -> Arc<GovernanceTables> {
        Arc::clone(&self.governance)
    }

    /// Runs one decision with default options.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] for terminal failures; non-terminal failures
    /// surface as fallback responses, never errors.
    pub async fn run(&self, request: DecisionRequest) -> Result<PipelineOutcome, EngineError> {
        self.run_with(request, RunOptions::default()).await
    }

    /// Runs one decision with explicit options.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] for terminal failures.
    pub async fn run_with(
        &self,
        request: DecisionRequest,
        options: RunOptions,
    ) -> Result<PipelineOutcome, EngineError> {
        let registered = if let Some(hash) = &options.pinned_hash {
            self.registry
                .get_by_hash(hash)?
                .ok_or_else(|| EngineError::InvalidScenario {
                    message: format!("no scenario registered under hash {hash}"),
                })?
        } else {
            self.registry.get(&request.scenario_id, crate::registry::LATEST_VERSION)?
        };

        let mut envelope = DecisionEnvelope::create(
            request,
            registered.scenario.scenario_id.clone(),
            registered.scenario.version.clone(),
            registered.hash.clone(),
        );
        let ctx = StageContext {
            scenario: Arc::clone(&registered.scenario),
            run_started: Instant::now(),
            cancel: options.cancel.unwrap_or_default(),
            memory_override: options.memory_override,
            trace_enabled: true,
        };

        let mut artifacts: BTreeMap<String, Value> = BTreeMap::new();
        for number in 1u8 ..= 9 {
            if let Some(terminal) = self.preflight(&mut envelope, &ctx, number) {
                return Err(terminal);
            }
            let Some(stage) = self.stages.get(&number) else {
                if number == 8 {
                    continue;
                }
                return Err(EngineError::Internal {
                    message: format!("stage {number} is not registered"),
                });
            };
            let timing_index = envelope.stage_timings.len();
            envelope.stage_timings.push(StageTiming {
                stage: number,
                started_at: Timestamp::now(),
                ended_at: None,
            });
            let result = stage.run(&mut envelope, &ctx).await;
            let ended = Timestamp::now();
            if let Some(timing) = envelope.stage_timings.get_mut(timing_index) {
                timing.ended_at = Some(ended);
                self.metrics.record_stage(
                    number,
                    std::time::Duration::from_millis(timing.duration_ms()),
                );
            }
            match result {
                Ok(stage_artifacts) => {
                    if ctx.trace_enabled {
                        artifacts.insert(AuditTrace::stage_key(number).to_string(), stage_artifacts);
                    }
                }
                Err(error) => match number {
                    6 | 7 => {
                        envelope.fallback_triggered = true;
                        if envelope.fallback_reason_code.is_none() {
                            envelope.fallback_reason_code = Some(error.code().to_string());
                        }
                        artifacts.insert(
                            AuditTrace::stage_key(number).to_string(),
                            json!({"error": error.to_string(), "code": error.code()}),
                        );
                    }
                    _ => return Err(EngineError::from_stage(error)),
                },
            }
        }

        let total_ms =
            u64::try_from(ctx.run_started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let response = self.project_response(&envelope, &registered.scenario, total_ms)?;
        let trace = AuditTrace {
            decision_id: envelope.decision_id.clone(),
            scenario_id: envelope.scenario_id.clone(),
            scenario_version: envelope.scenario_version.clone(),
            scenario_hash: envelope.scenario_hash.clone(),
            engine_version: self.engine_version.clone(),
            committed_at: Timestamp::now(),
            request: envelope.request.clone(),
            stage_artifacts: artifacts,
            final_response: response.clone(),
            total_duration_ms: total_ms,
            determinism_verified: DeterminismVerdict::Unknown,
            replay_token: response.audit.replay_token.clone(),
            trace_id: response.audit.trace_id.clone(),
            memory_snapshot_id: envelope.memory_snapshot_id.clone(),
        };
        self.audit_store.store(&trace).await.map_err(|err| EngineError::Internal {
            message: format!("audit store write failed: {err}"),
        })?;

        let outcome_label = if envelope.fallback_triggered {
            DecisionOutcomeLabel::CompletedFallback
        } else {
            DecisionOutcomeLabel::Completed
        };
        self.metrics
            .record_decision(outcome_label, std::time::Duration::from_millis(total_ms));

        Ok(PipelineOutcome {
            response,
            trace,
        })
    }

    /// Budget and cancellation checks ahead of one stage.
    ///
    /// Returns a terminal error, or `None` to proceed; fallback routing for
    /// stages 6-7 happens by mutating the envelope.
    fn preflight(
        &self,
        envelope: &mut DecisionEnvelope,
        ctx: &StageContext,
        number: u8,
    ) -> Option<EngineError> {
        let budget_spent = ctx.remaining_budget_ms() == 0;
        let cancelled = ctx.cancel.is_cancelled();
        if !budget_spent && !cancelled {
            return None;
        }
        if envelope.selection_locked() {
            if (5 ..= 7).contains(&number) && !envelope.fallback_triggered {
                envelope.fallback_triggered = true;
                envelope.fallback_reason_code = Some(
                    if cancelled {
                        REASON_CANCELLED
                    } else {
                        REASON_PIPELINE_TIMEOUT
                    }
                    .to_string(),
                );
            }
            // Stages 8 and 9 still run so the trace is persisted.
            None
        } else if number <= 5 {
            Some(EngineError::Internal {
                message: if cancelled {
                    "decision cancelled before selection lock".to_string()
                } else {
                    "pipeline budget exhausted before selection lock".to_string()
                },
            })
        } else {
            None
        }
    }

    /// Projects the completed envelope into the wire response.
    fn project_response(
        &self,
        envelope: &DecisionEnvelope,
        scenario: &crate::core::scenario::Scenario,
        total_ms: u64,
    ) -> Result<DecisionResponse, EngineError> {
        let selection = envelope.selection().map_err(|err| EngineError::Internal {
            message: err.to_string(),
        })?;
        let options = &envelope.request.options;

        let mut ranked: Vec<RankedOption> = selection.ranked_options().to_vec();
        if let Some(cap) = options.max_ranked_options {
            ranked.truncate(cap.max(1));
        }
        if !options.include_score_breakdown {
            for option in &mut ranked {
                option.score_breakdown = None;
            }
        }

        let payload = envelope.final_payload.clone().ok_or_else(|| EngineError::Internal {
            message: "no final payload produced".to_string(),
        })?;

        let resolved = envelope.resolved_skill.clone().unwrap_or_else(|| ResolvedSkill {
            skill_id: scenario.skills.default_fallback.clone(),
            skill_version: "0.0.0".to_string(),
            execution_mode: ExecutionMode::DeterministicOnly,
            resolution_reason: "fallback_unavailable".to_string(),
        });
        let validation_status = envelope.validation.as_ref().map_or(
            ValidationStatus::Skipped,
            |report| {
                if report.passed {
                    ValidationStatus::Passed
                } else {
                    ValidationStatus::Failed
                }
            },
        );

        let user_state = envelope.user_state.clone().ok_or_else(|| EngineError::Internal {
            message: "user state missing at projection".to_string(),
        })?;
        let replay_token =
            envelope.replay_token.clone().ok_or_else(|| EngineError::Internal {
                message: "replay token missing at projection".to_string(),
            })?;
        let trace_id = envelope.trace_id.clone().ok_or_else(|| EngineError::Internal {
            message: "trace id missing at projection".to_string(),
        })?;

        Ok(DecisionResponse {
            decision: DecisionSection {
                decision_id: envelope.decision_id.clone(),
                selected_action: selection.selected_action().clone(),
                payload,
                ranked_options: ranked,
            },
            state: user_state,
            execution: ExecutionSection {
                execution_mode: resolved.execution_mode,
                skill_id: resolved.skill_id,
                skill_version: resolved.skill_version,
                validation_status,
                fallback_used: envelope.fallback_triggered,
                fallback_reason_code: envelope.fallback_reason_code.clone(),
            },
            guardrails_applied: envelope.triggered_guardrails(),
            audit: AuditSection {
                decision_id: envelope.decision_id.clone(),
                replay_token,
                scenario_id: envelope.scenario_id.clone(),
                scenario_version: envelope.scenario_version.clone(),
                scenario_hash: envelope.scenario_hash.clone(),
                trace_id,
            },
            meta: MetaSection {
                request_id: envelope.decision_id.as_str().to_string(),
                timestamp: Timestamp::now().to_rfc3339().unwrap_or_default(),
                total_duration_ms: total_ms,
                api_version: API_VERSION.to_string(),
            },
        })
    }

    /// Re-runs a committed decision and verifies determinism.
    ///
    /// The replay pins the scenario by stored hash and the memory snapshot
    /// captured at commit, compares critical fields, persists the verdict,
    /// and returns the comparison.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownDecision`] when no trace exists, and
    /// [`EngineError`] for replay failures.
    pub async fn verify_replay(
        &self,
        decision_id: &DecisionId,
    ) -> Result<ReplayComparison, EngineError> {
        let trace = self
            .audit_store
            .retrieve(decision_id)
            .await
            .map_err(|err| EngineError::Internal {
                message: err.to_string(),
            })?
            .ok_or_else(|| EngineError::UnknownDecision {
                message: format!("no trace stored for decision {decision_id}"),
            })?;

        let memory_override = match &trace.memory_snapshot_id {
            Some(snapshot_id) => self
                .memory_store
                .load_snapshot(snapshot_id)
                .await
                .ok()
                .flatten()
                .map(|snapshot| Arc::new(snapshot.record)),
            None => None,
        };

        let outcome = self
            .run_with(trace.request.clone(), RunOptions {
                pinned_hash: Some(trace.scenario_hash.clone()),
                memory_override,
                cancel: None,
            })
            .await?;

        let comparison = compare_responses(&trace.final_response, &outcome.response);
        self.audit_store
            .store_verification(decision_id, comparison.verdict)
            .await
            .map_err(|err| EngineError::Internal {
                message: err.to_string(),
            })?;
        Ok(comparison)
    }
}
