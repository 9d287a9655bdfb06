// crates/ade-core/src/stores/mod.rs
// ============================================================================
// Module: ADE In-Memory Stores
// Description: In-memory adapters for the audit and memory store interfaces.
// Purpose: Provide reference store implementations with strict deep-copy
// semantics at the audit boundary.
// Dependencies: crate::{core, interfaces}, async-trait, serde_json
// ============================================================================

//! ## Overview
//! The in-memory audit store keeps traces as serialized JSON values: writes
//! serialize (deep copy in), reads deserialize (deep copy out), so no caller
//! ever holds a live reference into stored history. A structurally invalid
//! stored value surfaces as a corruption error instead of panicking. The
//! in-memory memory store applies per-key read-modify-write updates and
//! pins snapshots under their content addresses.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::identifiers::DecisionId;
use crate::core::identifiers::SnapshotId;
use crate::core::identifiers::UserId;
use crate::core::memory::MemoryRecord;
use crate::core::memory::MemorySnapshot;
use crate::core::memory::MemoryUpdate;
use crate::core::memory::MemoryValue;
use crate::core::time::Timestamp;
use crate::core::trace::AuditTrace;
use crate::core::trace::DeterminismVerdict;
use crate::interfaces::AuditStore;
use crate::interfaces::AuditStoreError;
use crate::interfaces::MemoryStore;
use crate::interfaces::MemoryStoreError;

// ============================================================================
// SECTION: In-Memory Audit Store
// ============================================================================

/// In-memory [`AuditStore`] adapter with deep-copy semantics.
///
/// # Invariants
/// - Traces are stored serialized; every read deserializes a fresh copy.
/// - Exactly one trace per decision identifier.
#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    /// Serialized traces keyed by decision identifier.
    traces: RwLock<BTreeMap<String, Value>>,
    /// Replay-token index to decision identifiers.
    tokens: RwLock<BTreeMap<String, String>>,
}

impl InMemoryAuditStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored traces.
    ///
    /// # Errors
    ///
    /// Returns [`AuditStoreError::Store`] when the lock is poisoned.
    pub fn len(&self) -> Result<usize, AuditStoreError> {
        Ok(self.read_traces()?.len())
    }

    /// Returns true when no traces are stored.
    ///
    /// # Errors
    ///
    /// Returns [`AuditStoreError::Store`] when the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, AuditStoreError> {
        Ok(self.read_traces()?.is_empty())
    }

    /// Acquires the trace map read guard.
    fn read_traces(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, BTreeMap<String, Value>>, AuditStoreError> {
        self.traces
            .read()
            .map_err(|_| AuditStoreError::Store("audit store lock poisoned".to_string()))
    }

    /// Deserializes one stored trace value.
    fn decode(stored: &Value) -> Result<AuditTrace, AuditStoreError> {
        serde_json::from_value(stored.clone())
            .map_err(|err| AuditStoreError::Corrupt(err.to_string()))
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn store(&self, trace: &AuditTrace) -> Result<(), AuditStoreError> {
        let serialized = serde_json::to_value(trace)
            .map_err(|err| AuditStoreError::Store(err.to_string()))?;
        let mut traces = self
            .traces
            .write()
            .map_err(|_| AuditStoreError::Store("audit store lock poisoned".to_string()))?;
        if traces.contains_key(trace.decision_id.as_str()) {
            return Err(AuditStoreError::Duplicate(trace.decision_id.clone()));
        }
        traces.insert(trace.decision_id.as_str().to_string(), serialized);
        drop(traces);
        let mut tokens = self
            .tokens
            .write()
            .map_err(|_| AuditStoreError::Store("audit store lock poisoned".to_string()))?;
        tokens.insert(trace.replay_token.clone(), trace.decision_id.as_str().to_string());
        Ok(())
    }

    async fn retrieve(
        &self,
        decision_id: &DecisionId,
    ) -> Result<Option<AuditTrace>, AuditStoreError> {
        let traces = self.read_traces()?;
        traces.get(decision_id.as_str()).map(Self::decode).transpose()
    }

    async fn retrieve_by_token(&self, token: &str) -> Result<Option<AuditTrace>, AuditStoreError> {
        let decision_id = {
            let tokens = self
                .tokens
                .read()
                .map_err(|_| AuditStoreError::Store("audit store lock poisoned".to_string()))?;
            tokens.get(token).cloned()
        };
        let Some(decision_id) = decision_id else {
            return Ok(None);
        };
        self.retrieve(&DecisionId::new(decision_id)).await
    }

    async fn exists(&self, decision_id: &DecisionId) -> Result<bool, AuditStoreError> {
        Ok(self.read_traces()?.contains_key(decision_id.as_str()))
    }

    async fn store_verification(
        &self,
        decision_id: &DecisionId,
        verdict: DeterminismVerdict,
    ) -> Result<(), AuditStoreError> {
        let verdict_value = serde_json::to_value(verdict)
            .map_err(|err| AuditStoreError::Store(err.to_string()))?;
        let mut traces = self
            .traces
            .write()
            .map_err(|_| AuditStoreError::Store("audit store lock poisoned".to_string()))?;
        let Some(stored) = traces.get_mut(decision_id.as_str()) else {
            return Err(AuditStoreError::Store(format!(
                "no trace stored for decision {decision_id}"
            )));
        };
        let Some(object) = stored.as_object_mut() else {
            return Err(AuditStoreError::Corrupt("stored trace is not an object".to_string()));
        };
        object.insert("determinism_verified".to_string(), verdict_value);
        Ok(())
    }
}

// ============================================================================
// SECTION: In-Memory Memory Store
// ============================================================================

/// In-memory [`MemoryStore`] adapter with per-key read-modify-write updates.
///
/// # Invariants
/// - Snapshots are stored serialized and never mutated after write.
#[derive(Debug, Default)]
pub struct InMemoryMemoryStore {
    /// Records keyed by (platform, user).
    records: RwLock<BTreeMap<(String, String), MemoryRecord>>,
    /// Serialized snapshots keyed by snapshot identifier.
    snapshots: RwLock<BTreeMap<String, Value>>,
}

impl InMemoryMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a record directly; test and bootstrap convenience.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryStoreError::Store`] when the lock is poisoned.
    pub fn seed(&self, record: MemoryRecord) -> Result<(), MemoryStoreError> {
        let key = (record.platform.clone(), record.user_id.as_str().to_string());
        let mut records = self
            .records
            .write()
            .map_err(|_| MemoryStoreError::Store("memory store lock poisoned".to_string()))?;
        records.insert(key, record);
        Ok(())
    }
}

#[async_trait]
impl MemoryStore for InMemoryMemoryStore {
    async fn load(
        &self,
        platform: &str,
        user_id: &UserId,
    ) -> Result<Option<MemoryRecord>, MemoryStoreError> {
        let records = self
            .records
            .read()
            .map_err(|_| MemoryStoreError::Store("memory store lock poisoned".to_string()))?;
        Ok(records.get(&(platform.to_string(), user_id.as_str().to_string())).cloned())
    }

    async fn apply_updates(
        &self,
        platform: &str,
        user_id: &UserId,
        updates: &[MemoryUpdate],
    ) -> Result<(), MemoryStoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| MemoryStoreError::Store("memory store lock poisoned".to_string()))?;
        let key = (platform.to_string(), user_id.as_str().to_string());
        let record = records
            .entry(key)
            .or_insert_with(|| MemoryRecord::new(platform, user_id.clone()));
        for update in updates {
            record.custom.insert(update.storage_key(), MemoryValue {
                value: update.value.clone(),
                ttl_seconds: update.ttl_seconds,
                written_at: Timestamp::now(),
            });
        }
        Ok(())
    }

    async fn store_snapshot(&self, snapshot: &MemorySnapshot) -> Result<(), MemoryStoreError> {
        let serialized = serde_json::to_value(snapshot)
            .map_err(|err| MemoryStoreError::Store(err.to_string()))?;
        let mut snapshots = self
            .snapshots
            .write()
            .map_err(|_| MemoryStoreError::Store("memory store lock poisoned".to_string()))?;
        snapshots.insert(snapshot.snapshot_id.as_str().to_string(), serialized);
        Ok(())
    }

    async fn load_snapshot(
        &self,
        snapshot_id: &SnapshotId,
    ) -> Result<Option<MemorySnapshot>, MemoryStoreError> {
        let snapshots = self
            .snapshots
            .read()
            .map_err(|_| MemoryStoreError::Store("memory store lock poisoned".to_string()))?;
        snapshots
            .get(snapshot_id.as_str())
            .map(|stored| {
                serde_json::from_value(stored.clone())
                    .map_err(|err| MemoryStoreError::Corrupt(err.to_string()))
            })
            .transpose()
    }
}
