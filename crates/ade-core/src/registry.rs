// crates/ade-core/src/registry.rs
// ============================================================================
// Module: ADE Scenario Registry
// Description: Hash-immutable registry of scenarios keyed by (id, version).
// Purpose: Hold validated scenarios and enforce that re-registration never
// changes content under an existing key.
// Dependencies: crate::core::{hashing, identifiers, scenario, time}, serde, thiserror
// ============================================================================

//! ## Overview
//! The registry maps `(scenario_id, version)` to a validated scenario plus
//! its canonical content hash. Registration is serialized by the write lock
//! so the hash-immutability check cannot race: a second `register` with the
//! same key and a different hash fails with a distinct error kind, while the
//! same key and hash is a silent no-op. Version resolution for `"latest"`
//! compares semver segments numerically, left-to-right, with the shorter
//! side padded by implicit zeros.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::RwLock;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::hashing::HashDigest;
use crate::core::identifiers::ScenarioId;
use crate::core::scenario::Scenario;
use crate::core::scenario::ScenarioError;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Version selector resolving to the highest registered version.
pub const LATEST_VERSION: &str = "latest";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Registry operation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - [`RegistryError::HashMismatch`] is the distinct immutability-violation
///   kind.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Re-registration under an existing key with different content.
    #[error("scenario {scenario_id}@{version} is already registered with a different hash")]
    HashMismatch {
        /// Scenario identifier.
        scenario_id: ScenarioId,
        /// Scenario version.
        version: String,
    },
    /// Supplied hash does not match the scenario's canonical content.
    #[error("supplied hash {supplied} does not match computed {computed}")]
    ContentMismatch {
        /// Caller-supplied digest.
        supplied: HashDigest,
        /// Digest computed from the scenario content.
        computed: HashDigest,
    },
    /// Scenario failed structural validation.
    #[error("scenario validation failed: {0}")]
    Invalid(#[from] ScenarioError),
    /// No scenario is registered under the requested key.
    #[error("unknown scenario: {scenario_id}@{version}")]
    Unknown {
        /// Scenario identifier.
        scenario_id: ScenarioId,
        /// Requested version selector.
        version: String,
    },
    /// Registry lock was poisoned by a panicking writer.
    #[error("scenario registry lock poisoned")]
    Poisoned,
}

// ============================================================================
// SECTION: Registry Records
// ============================================================================

/// Registered scenario with its content address.
///
/// # Invariants
/// - `hash` is the canonical content hash of `scenario`.
#[derive(Debug, Clone)]
pub struct RegisteredScenario {
    /// Shared validated scenario.
    pub scenario: Arc<Scenario>,
    /// Canonical content hash.
    pub hash: HashDigest,
    /// Registration timestamp.
    pub registered_at: Timestamp,
}

/// Listing entry for registry consumers.
///
/// # Invariants
/// - Mirrors the registered key and hash exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSummary {
    /// Scenario identifier.
    pub scenario_id: ScenarioId,
    /// Scenario version.
    pub version: String,
    /// Canonical content hash.
    pub scenario_hash: HashDigest,
}

// ============================================================================
// SECTION: Scenario Registry
// ============================================================================

/// Thread-safe scenario registry with hash immutability.
///
/// # Invariants
/// - Writers are serialized; readers proceed concurrently.
/// - Registered scenarios are validated and never mutated.
#[derive(Debug, Default)]
pub struct ScenarioRegistry {
    /// Entries keyed by (scenario id, version).
    entries: RwLock<BTreeMap<(ScenarioId, String), RegisteredScenario>>,
}

impl ScenarioRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a scenario under a caller-supplied content hash.
    ///
    /// Same key + same hash is a silent no-op.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ContentMismatch`] when the supplied hash does
    /// not match the scenario content, [`RegistryError::Invalid`] when the
    /// scenario fails validation, and [`RegistryError::HashMismatch`] when
    /// the key exists with different content.
    pub fn register(&self, scenario: Scenario, hash: HashDigest) -> Result<(), RegistryError> {
        let computed = scenario.content_hash()?;
        if computed != hash {
            return Err(RegistryError::ContentMismatch {
                supplied: hash,
                computed,
            });
        }
        scenario.validate()?;
        let key = (scenario.scenario_id.clone(), scenario.version.clone());
        let mut entries = self.entries.write().map_err(|_| RegistryError::Poisoned)?;
        if let Some(existing) = entries.get(&key) {
            if existing.hash == hash {
                return Ok(());
            }
            return Err(RegistryError::HashMismatch {
                scenario_id: key.0,
                version: key.1,
            });
        }
        entries.insert(key, RegisteredScenario {
            scenario: Arc::new(scenario),
            hash,
            registered_at: Timestamp::now(),
        });
        Ok(())
    }

    /// Registers a scenario, computing its content hash.
    ///
    /// # Errors
    ///
    /// Propagates [`RegistryError`] from [`ScenarioRegistry::register`].
    pub fn register_scenario(&self, scenario: Scenario) -> Result<HashDigest, RegistryError> {
        let hash = scenario.content_hash()?;
        self.register(scenario, hash.clone())?;
        Ok(hash)
    }

    /// Resolves a scenario by identifier and version selector.
    ///
    /// The selector is either an exact version or [`LATEST_VERSION`].
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Unknown`] when nothing matches.
    pub fn get(
        &self,
        scenario_id: &ScenarioId,
        version: &str,
    ) -> Result<RegisteredScenario, RegistryError> {
        let entries = self.entries.read().map_err(|_| RegistryError::Poisoned)?;
        if version == LATEST_VERSION {
            return entries
                .iter()
                .filter(|((id, _), _)| id == scenario_id)
                .max_by(|((_, left), _), ((_, right), _)| compare_versions(left, right))
                .map(|(_, entry)| entry.clone())
                .ok_or_else(|| RegistryError::Unknown {
                    scenario_id: scenario_id.clone(),
                    version: version.to_string(),
                });
        }
        entries
            .get(&(scenario_id.clone(), version.to_string()))
            .cloned()
            .ok_or_else(|| RegistryError::Unknown {
                scenario_id: scenario_id.clone(),
                version: version.to_string(),
            })
    }

    /// Resolves a scenario by content hash.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Poisoned`] when the lock is poisoned.
    pub fn get_by_hash(&self, hash: &HashDigest) -> Result<Option<RegisteredScenario>, RegistryError> {
        let entries = self.entries.read().map_err(|_| RegistryError::Poisoned)?;
        Ok(entries.values().find(|entry| &entry.hash == hash).cloned())
    }

    /// Lists every registered scenario.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Poisoned`] when the lock is poisoned.
    pub fn list(&self) -> Result<Vec<ScenarioSummary>, RegistryError> {
        let entries = self.entries.read().map_err(|_| RegistryError::Poisoned)?;
        Ok(entries
            .iter()
            .map(|((scenario_id, version), entry)| ScenarioSummary {
                scenario_id: scenario_id.clone(),
                version: version.clone(),
                scenario_hash: entry.hash.clone(),
            })
            .collect())
    }
}

// ============================================================================
// SECTION: Version Ordering
// ============================================================================

/// Compares semver-ish versions numerically per dot segment.
///
/// Segments compare left-to-right; a missing segment is an implicit zero and
/// non-numeric segments compare as zero.
#[must_use]
pub fn compare_versions(left: &str, right: &str) -> Ordering {
    let left_parts: Vec<u64> = left.split('.').map(parse_segment).collect();
    let right_parts: Vec<u64> = right.split('.').map(parse_segment).collect();
    let len = left_parts.len().max(right_parts.len());
    for index in 0 .. len {
        let lhs = left_parts.get(index).copied().unwrap_or(0);
        let rhs = right_parts.get(index).copied().unwrap_or(0);
        match lhs.cmp(&rhs) {
            Ordering::Equal => {}
            other => return other,
        }
    }
    Ordering::Equal
}

/// Parses one version segment, treating non-numeric text as zero.
fn parse_segment(segment: &str) -> u64 {
    segment.parse::<u64>().unwrap_or(0)
}
