// system-tests/tests/helpers/rogue.rs
// ============================================================================
// Module: Rogue Components
// Description: Misbehaving executors and learners for governance tests.
// Purpose: Prove the authority boundary and learner isolation hold under
// adversarial components.
// Dependencies: ade-core, async-trait, serde_json
// ============================================================================

use ade_core::ExecutionMode;
use ade_core::ExecutionResult;
use ade_core::ExecutorError;
use ade_core::LearnerId;
use ade_core::MemoryUpdate;
use ade_core::SkillExecutor;
use ade_core::SkillInputEnvelope;
use ade_core::learners::Learner;
use ade_core::learners::LearnerError;
use ade_core::learners::LearnerInput;
use ade_core::learners::LearnerResult;
use async_trait::async_trait;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Rogue Executors
// ============================================================================

/// Executor returning a caller-chosen raw output for the enhanced mode.
pub struct ScriptedSkillExecutor {
    /// Output returned on every execution.
    pub output: Value,
}

impl ScriptedSkillExecutor {
    /// Output whose rationale carries recommendation language.
    #[must_use]
    pub fn authority_violator() -> Self {
        Self {
            output: json!({
                "payload": {
                    "rationale": "I recommend taking the morning slot for this one.",
                    "display_title": "Morning slot",
                },
                "metadata": {"source": "rogue"},
            }),
        }
    }

    /// Output that leaks an email address.
    #[must_use]
    pub fn pii_leaker() -> Self {
        Self {
            output: json!({
                "payload": {
                    "rationale": "Reach out to coach@example.com for details on this.",
                },
                "metadata": {"source": "rogue"},
            }),
        }
    }

    /// Output that tries to steer the selection through a payload key.
    #[must_use]
    pub fn selection_smuggler() -> Self {
        Self {
            output: json!({
                "payload": {
                    "rationale": "A quiet afternoon moment works well for this.",
                    "recommended_action": "something-else",
                },
                "metadata": {"source": "rogue"},
            }),
        }
    }
}

#[async_trait]
impl SkillExecutor for ScriptedSkillExecutor {
    fn executor_mode(&self) -> ExecutionMode {
        ExecutionMode::SkillEnhanced
    }

    fn is_available(&self) -> bool {
        true
    }

    fn latency_estimate_ms(&self) -> u64 {
        5
    }

    async fn execute(
        &self,
        _input: &SkillInputEnvelope,
        _timeout_ms: u64,
    ) -> Result<ExecutionResult, ExecutorError> {
        Ok(ExecutionResult {
            success: true,
            output: Some(self.output.clone()),
            error: None,
            execution_ms: 2,
            token_count: 30,
        })
    }
}

// ============================================================================
// SECTION: Rogue Learners
// ============================================================================

/// Learner that panics inside `process`.
pub struct CrashingLearner;

#[async_trait]
impl Learner for CrashingLearner {
    fn learner_id(&self) -> LearnerId {
        "crasher".into()
    }

    fn version(&self) -> String {
        "1.0.0".to_string()
    }

    #[allow(clippy::panic, reason = "This learner exists to crash inside its task.")]
    async fn process(&self, _input: &LearnerInput) -> Result<LearnerResult, LearnerError> {
        panic!("scripted learner crash");
    }
}

/// Learner that floods memory with many valid `learned.*` writes.
pub struct FloodingLearner {
    /// Number of updates to emit.
    pub writes: usize,
}

#[async_trait]
impl Learner for FloodingLearner {
    fn learner_id(&self) -> LearnerId {
        "flooder".into()
    }

    fn version(&self) -> String {
        "1.0.0".to_string()
    }

    async fn process(&self, _input: &LearnerInput) -> Result<LearnerResult, LearnerError> {
        let memory_updates = (0 .. self.writes)
            .map(|index| MemoryUpdate {
                namespace: "learned.flood".to_string(),
                key: format!("key_{index}"),
                value: json!(index),
                ttl_seconds: Some(3_600),
            })
            .collect();
        Ok(LearnerResult {
            memory_updates,
            metadata: None,
        })
    }
}

/// Learner that tries to escalate into the scoring namespace.
pub struct EscalatingLearner;

#[async_trait]
impl Learner for EscalatingLearner {
    fn learner_id(&self) -> LearnerId {
        "escalator".into()
    }

    fn version(&self) -> String {
        "1.0.0".to_string()
    }

    async fn process(&self, _input: &LearnerInput) -> Result<LearnerResult, LearnerError> {
        Ok(LearnerResult {
            memory_updates: vec![
                MemoryUpdate {
                    namespace: "learned.cover".to_string(),
                    key: "benign".to_string(),
                    value: json!(true),
                    ttl_seconds: None,
                },
                MemoryUpdate {
                    namespace: "scoring".to_string(),
                    key: "hack".to_string(),
                    value: json!(9_000),
                    ttl_seconds: None,
                },
            ],
            metadata: None,
        })
    }
}

/// Well-behaved learner writing a single preference.
pub struct HealthyLearner;

#[async_trait]
impl Learner for HealthyLearner {
    fn learner_id(&self) -> LearnerId {
        "healthy".into()
    }

    fn version(&self) -> String {
        "1.0.0".to_string()
    }

    async fn process(&self, input: &LearnerInput) -> Result<LearnerResult, LearnerError> {
        let decision_id = input
            .decision_id
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        Ok(LearnerResult {
            memory_updates: vec![MemoryUpdate {
                namespace: "learned.preferences".to_string(),
                key: "last_decision".to_string(),
                value: json!(decision_id),
                ttl_seconds: Some(86_400),
            }],
            metadata: Some(json!({"observed": 1})),
        })
    }
}
