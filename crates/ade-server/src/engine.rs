// crates/ade-server/src/engine.rs
// ============================================================================
// Module: ADE Engine Handle
// Description: Shared engine state wiring registry, pipeline, stores, and
// learners for the HTTP surface.
// Purpose: Run decisions and dispatch learners strictly after the response
// is committed.
// Dependencies: ade-core, tokio, tracing
// ============================================================================

//! ## Overview
//! The engine handle owns every long-lived component: the scenario registry,
//! the decision pipeline, both stores, and the learner registry. `decide`
//! runs the pipeline, then dispatches learners on a spawned task against the
//! committed trace, so learners can never delay or influence the response.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use ade_core::AuditStore;
use ade_core::DecisionRequest;
use ade_core::DecisionResponse;
use ade_core::EngineError;
use ade_core::ExecutorRegistry;
use ade_core::InMemoryAuditStore;
use ade_core::InMemoryMemoryStore;
use ade_core::LearnerRegistry;
use ade_core::MemoryStore;
use ade_core::ScenarioRegistry;
use ade_core::runtime::DecisionPipeline;
use ade_core::runtime::ReplayComparison;
use tokio::sync::RwLock;
use tracing::debug;
use tracing::warn;

// ============================================================================
// SECTION: Engine Handle
// ============================================================================

/// Shared engine state behind the HTTP surface.
///
/// # Invariants
/// - Learners run only after the audit trace is committed.
pub struct EngineHandle {
    /// Scenario registry.
    pub registry: Arc<ScenarioRegistry>,
    /// Decision pipeline.
    pub pipeline: Arc<DecisionPipeline>,
    /// Audit trace store.
    pub audit_store: Arc<dyn AuditStore>,
    /// Memory store.
    pub memory_store: Arc<dyn MemoryStore>,
    /// Learner registry dispatched post-commit.
    pub learners: Arc<RwLock<LearnerRegistry>>,
}

impl EngineHandle {
    /// Builds an engine over in-memory stores and the built-in executor.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Internal`] when the governance tables fail to
    /// compile.
    pub fn in_memory() -> Result<Self, EngineError> {
        let registry = Arc::new(ScenarioRegistry::new());
        let audit_store: Arc<dyn AuditStore> = Arc::new(InMemoryAuditStore::new());
        let memory_store: Arc<dyn MemoryStore> = Arc::new(InMemoryMemoryStore::new());
        Self::new(
            registry,
            ExecutorRegistry::with_builtin(),
            audit_store,
            memory_store,
        )
    }

    /// Builds an engine over explicit components.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Internal`] when the governance tables fail to
    /// compile.
    pub fn new(
        registry: Arc<ScenarioRegistry>,
        executors: ExecutorRegistry,
        audit_store: Arc<dyn AuditStore>,
        memory_store: Arc<dyn MemoryStore>,
    ) -> Result<Self, EngineError> {
        let pipeline = DecisionPipeline::new(
            Arc::clone(&registry),
            executors,
            Arc::clone(&audit_store),
            Arc::clone(&memory_store),
        )
        .map_err(|err| EngineError::Internal {
            message: format!("governance tables failed to compile: {err}"),
        })?;
        let learners = LearnerRegistry::new(Arc::clone(&memory_store));
        Ok(Self {
            registry,
            pipeline: Arc::new(pipeline),
            audit_store,
            memory_store,
            learners: Arc::new(RwLock::new(learners)),
        })
    }

    /// Runs one decision and dispatches learners off the request path.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] for terminal pipeline failures.
    pub async fn decide(&self, request: DecisionRequest) -> Result<DecisionResponse, EngineError> {
        let outcome = self.pipeline.run(request).await?;
        let trace = outcome.trace;
        let learners = Arc::clone(&self.learners);
        tokio::spawn(async move {
            let registry = learners.read().await;
            if registry.is_empty() {
                return;
            }
            let outcomes = registry.dispatch(&trace).await;
            for outcome in &outcomes {
                debug!(
                    learner = %outcome.learner_id,
                    status = ?outcome.status,
                    applied = outcome.updates_applied,
                    "learner dispatch finished"
                );
                if outcome.error.is_some() {
                    warn!(
                        learner = %outcome.learner_id,
                        error = outcome.error.as_deref().unwrap_or(""),
                        "learner dispatch rejected or failed"
                    );
                }
            }
        });
        Ok(outcome.response)
    }

    /// Verifies determinism for a committed decision.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownDecision`] when no trace exists.
    pub async fn verify_replay(
        &self,
        decision_id: &ade_core::DecisionId,
    ) -> Result<ReplayComparison, EngineError> {
        self.pipeline.verify_replay(decision_id).await
    }
}
