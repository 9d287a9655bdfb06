// crates/ade-core/src/core/hashing.rs
// ============================================================================
// Module: ADE Canonical Hashing
// Description: RFC 8785 canonical JSON hashing for scenarios, inputs, and memory.
// Purpose: Provide stable content addresses for replay and immutability checks.
// Dependencies: serde, serde_jcs, sha2, thiserror
// ============================================================================

//! ## Overview
//! Scenario hashes, input hashes, and memory snapshot identifiers are all
//! SHA-256 digests of canonical JSON (sorted keys at every level, no
//! insignificant whitespace). Canonicalization follows RFC 8785 via
//! `serde_jcs`, so hashes are stable under key-order permutation of the
//! source value.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde::de::Error as DeError;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by canonical hashing.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum HashError {
    /// Canonical JSON serialization failed (for example on non-finite floats).
    #[error("canonicalization failed: {0}")]
    Canonicalization(String),
    /// Digest text is not in the `sha256:<64 lowercase hex>` form.
    #[error("invalid digest format: {0}")]
    Format(String),
}

// ============================================================================
// SECTION: Digest Types
// ============================================================================

/// Hash algorithms supported for content addressing.
///
/// # Invariants
/// - Variants are stable for serialization and trace matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    /// SHA-256.
    Sha256,
}

impl HashAlgorithm {
    /// Returns the stable wire prefix for the algorithm.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
        }
    }
}

/// Default hash algorithm for ADE content addressing.
pub const DEFAULT_HASH_ALGORITHM: HashAlgorithm = HashAlgorithm::Sha256;

/// Content digest with a stable `sha256:<hex>` wire form.
///
/// # Invariants
/// - `value` is lowercase hexadecimal.
/// - Serializes as the prefixed string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HashDigest {
    /// Digest algorithm.
    pub algorithm: HashAlgorithm,
    /// Lowercase hexadecimal digest value.
    pub value: String,
}

impl HashDigest {
    /// Computes a digest over raw bytes.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm, bytes: &[u8]) -> Self {
        let value = match algorithm {
            HashAlgorithm::Sha256 => {
                let mut hasher = Sha256::new();
                hasher.update(bytes);
                let digest = hasher.finalize();
                digest.iter().map(|byte| format!("{byte:02x}")).collect::<String>()
            }
        };
        Self {
            algorithm,
            value,
        }
    }

    /// Parses a digest from its `sha256:<hex>` wire form.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::Format`] when the text is malformed.
    pub fn parse(text: &str) -> Result<Self, HashError> {
        let Some((prefix, value)) = text.split_once(':') else {
            return Err(HashError::Format(text.to_string()));
        };
        if prefix != HashAlgorithm::Sha256.as_str() {
            return Err(HashError::Format(text.to_string()));
        }
        if value.len() != 64 || !value.chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase()) {
            return Err(HashError::Format(text.to_string()));
        }
        Ok(Self {
            algorithm: HashAlgorithm::Sha256,
            value: value.to_string(),
        })
    }
}

impl fmt::Display for HashDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm.as_str(), self.value)
    }
}

impl Serialize for HashDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for HashDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(DeError::custom)
    }
}

// ============================================================================
// SECTION: Hash Functions
// ============================================================================

/// Serializes a value into canonical JSON bytes (RFC 8785).
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails, which
/// includes any non-finite float in the value.
pub fn canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, HashError> {
    serde_jcs::to_vec(value).map_err(|err| HashError::Canonicalization(err.to_string()))
}

/// Computes a digest over raw bytes.
#[must_use]
pub fn hash_bytes(algorithm: HashAlgorithm, bytes: &[u8]) -> HashDigest {
    HashDigest::new(algorithm, bytes)
}

/// Computes a digest over the canonical JSON form of a value.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn hash_canonical_json<T: Serialize>(
    algorithm: HashAlgorithm,
    value: &T,
) -> Result<HashDigest, HashError> {
    let bytes = canonical_json_bytes(value)?;
    Ok(hash_bytes(algorithm, &bytes))
}
