// crates/ade-core/src/runtime/stages/audit.rs
// ============================================================================
// Module: Stage 9 — Audit and Replay
// Description: Replay-token minting, trace identity, and memory snapshot
// pinning.
// Purpose: Give the decision its replay coordinates before the orchestrator
// assembles and persists the trace.
// Dependencies: crate::{core, interfaces, runtime::stage}, async-trait,
// base64, serde_json
// ============================================================================

//! ## Overview
//! The replay token is the URL-safe base64 (padding stripped) of
//! `<decision_id>:<scenario_hash>` with the `rpl_` prefix, so a token alone
//! recovers both coordinates of the decision. The stage also captures the
//! user's memory under a content address; learners receive that snapshot id,
//! never a live memory reference. Snapshot failures are recorded, not
//! raised: audit identity never depends on memory health.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::Value;
use serde_json::json;

use crate::core::envelope::DecisionEnvelope;
use crate::core::identifiers::TraceId;
use crate::core::memory::MemoryRecord;
use crate::core::memory::MemorySnapshot;
use crate::interfaces::MemoryStore;
use crate::runtime::stage::StageContext;
use crate::runtime::stage::StageError;
use crate::runtime::stage::StageHandler;

// ============================================================================
// SECTION: Replay Token
// ============================================================================

/// Prefix of every replay token.
pub const REPLAY_TOKEN_PREFIX: &str = "rpl_";

/// Encodes a replay token from decision coordinates.
#[must_use]
pub fn encode_replay_token(decision_id: &str, scenario_hash: &str) -> String {
    let raw = format!("{decision_id}:{scenario_hash}");
    format!("{REPLAY_TOKEN_PREFIX}{}", URL_SAFE_NO_PAD.encode(raw))
}

/// Decodes a replay token back into `(decision_id, scenario_hash)`.
#[must_use]
pub fn decode_replay_token(token: &str) -> Option<(String, String)> {
    let encoded = token.strip_prefix(REPLAY_TOKEN_PREFIX)?;
    let bytes = URL_SAFE_NO_PAD.decode(encoded).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    let (decision_id, scenario_hash) = text.split_once(':')?;
    Some((decision_id.to_string(), scenario_hash.to_string()))
}

// ============================================================================
// SECTION: Stage Handler
// ============================================================================

/// Stage 9 handler bound to the memory store for snapshot pinning.
#[derive(Clone)]
pub struct AuditReplayStage {
    /// Memory store used to capture and persist snapshots.
    memory_store: Arc<dyn MemoryStore>,
}

impl AuditReplayStage {
    /// Creates the stage over a memory store.
    #[must_use]
    pub fn new(memory_store: Arc<dyn MemoryStore>) -> Self {
        Self {
            memory_store,
        }
    }
}

#[async_trait]
impl StageHandler for AuditReplayStage {
    fn number(&self) -> u8 {
        9
    }

    async fn run(
        &self,
        envelope: &mut DecisionEnvelope,
        ctx: &StageContext,
    ) -> Result<Value, StageError> {
        let replay_token = encode_replay_token(
            envelope.decision_id.as_str(),
            &envelope.scenario_hash.to_string(),
        );
        let trace_id = TraceId::mint();

        // Pin the memory the decision saw; replays load this snapshot.
        let platform = envelope.request.platform.as_deref().unwrap_or("default");
        let record = if let Some(pinned) = &ctx.memory_override {
            Some(pinned.as_ref().clone())
        } else {
            match self.memory_store.load(platform, &envelope.request.user_id).await {
                Ok(found) => Some(found.unwrap_or_else(|| {
                    MemoryRecord::new(platform, envelope.request.user_id.clone())
                })),
                Err(_) => None,
            }
        };
        let mut snapshot_stored = false;
        if let Some(record) = record
            && let Ok(snapshot) = MemorySnapshot::capture(record)
        {
            snapshot_stored = self.memory_store.store_snapshot(&snapshot).await.is_ok();
            envelope.memory_snapshot_id = Some(snapshot.snapshot_id);
        }

        envelope.replay_token = Some(replay_token.clone());
        envelope.trace_id = Some(trace_id.clone());

        Ok(json!({
            "replay_token": replay_token,
            "trace_id": trace_id,
            "memory_snapshot_id": envelope.memory_snapshot_id,
            "memory_snapshot_stored": snapshot_stored,
        }))
    }
}
