// crates/ade-core/src/core/memory.rs
// ============================================================================
// Module: ADE Memory Model
// Description: Non-authoritative per-user memory and immutable snapshots.
// Purpose: Feed memory-sourced derivations and pin learner inputs to a
// content-addressed snapshot.
// Dependencies: crate::core::{hashing, identifiers, time}, serde, serde_json
// ============================================================================

//! ## Overview
//! Memory is non-authoritative: every read is optional and any missing or
//! corrupt key resolves to the dimension default without aborting a decision.
//! At decision commit the engine captures a deep-cloned [`MemorySnapshot`]
//! addressed by the canonical hash of its content; learner input carries the
//! snapshot id, never a live reference, which is what makes learner replay
//! deterministic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashError;
use crate::core::hashing::hash_canonical_json;
use crate::core::identifiers::SnapshotId;
use crate::core::identifiers::UserId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Memory Entries
// ============================================================================

/// One interaction event in a user's history.
///
/// # Invariants
/// - `details` is opaque to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    /// Event kind label.
    pub kind: String,
    /// Event timestamp.
    pub at: Timestamp,
    /// Opaque event details.
    #[serde(default)]
    pub details: Value,
}

/// Stored value under a namespaced memory key.
///
/// # Invariants
/// - Expiry is advisory; stores may lazily evict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryValue {
    /// Stored value.
    pub value: Value,
    /// Optional time-to-live in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_seconds: Option<u64>,
    /// Write timestamp.
    pub written_at: Timestamp,
}

/// Per-(platform, user) memory record.
///
/// # Invariants
/// - `custom` keys are `namespace.key` strings; learner writes are restricted
///   to the `learned.` namespace by the governance guard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Platform label scoping the record.
    pub platform: String,
    /// User identifier.
    pub user_id: UserId,
    /// Interaction history, most recent last.
    #[serde(default)]
    pub interactions: Vec<InteractionEvent>,
    /// Namespaced custom memory keyed by `namespace.key`.
    #[serde(default)]
    pub custom: BTreeMap<String, MemoryValue>,
}

impl MemoryRecord {
    /// Creates an empty record for a platform and user.
    #[must_use]
    pub fn new(platform: impl Into<String>, user_id: UserId) -> Self {
        Self {
            platform: platform.into(),
            user_id,
            interactions: Vec::new(),
            custom: BTreeMap::new(),
        }
    }

    /// Flattens custom memory into a formula-readable view.
    #[must_use]
    pub fn formula_view(&self) -> BTreeMap<String, Value> {
        self.custom
            .iter()
            .map(|(key, stored)| (key.clone(), stored.value.clone()))
            .collect()
    }
}

// ============================================================================
// SECTION: Memory Updates
// ============================================================================

/// One namespaced write proposed by a learner.
///
/// # Invariants
/// - The governance guard rejects the entire result when any update's
///   namespace is out of bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryUpdate {
    /// Target namespace (must begin with `learned.`).
    pub namespace: String,
    /// Key within the namespace.
    pub key: String,
    /// Value to store.
    pub value: Value,
    /// Optional time-to-live in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_seconds: Option<u64>,
}

impl MemoryUpdate {
    /// Returns the flattened storage key `namespace.key`.
    #[must_use]
    pub fn storage_key(&self) -> String {
        format!("{}.{}", self.namespace, self.key)
    }
}

// ============================================================================
// SECTION: Memory Snapshot
// ============================================================================

/// Immutable per-decision capture of a user's memory state.
///
/// # Invariants
/// - `snapshot_id` is the canonical content hash of `record`; equal content
///   yields equal identifiers.
/// - `captured_at` is excluded from the hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    /// Content-addressed snapshot identifier.
    pub snapshot_id: SnapshotId,
    /// Capture timestamp.
    pub captured_at: Timestamp,
    /// Deep-cloned memory record.
    pub record: MemoryRecord,
}

impl MemorySnapshot {
    /// Captures a snapshot of a record, computing its content address.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when canonicalization of the record fails.
    pub fn capture(record: MemoryRecord) -> Result<Self, HashError> {
        let digest = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &record)?;
        Ok(Self {
            snapshot_id: SnapshotId::new(digest.to_string()),
            captured_at: Timestamp::now(),
            record,
        })
    }
}
