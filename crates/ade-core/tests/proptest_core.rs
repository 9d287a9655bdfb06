// crates/ade-core/tests/proptest_core.rs
// ============================================================================
// Module: Core Property Tests
// Description: Property-based coverage for clamping, hashing, versions, and
// replay tokens.
// ============================================================================
//! Property targets: clamp idempotence, canonical-hash key-order stability,
//! version-ordering totality, and replay-token invertibility.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    reason = "Test-only panic-based assertions and exact float checks are permitted."
)]

use ade_core::core::hashing::HashAlgorithm;
use ade_core::core::hashing::hash_canonical_json;
use ade_core::core::scenario::NumericRange;
use ade_core::registry::compare_versions;
use ade_core::runtime::stages::decode_replay_token;
use ade_core::runtime::stages::encode_replay_token;
use proptest::prelude::*;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

proptest! {
    #[test]
    fn clamping_is_idempotent(value in -1_000.0f64 .. 1_000.0, min in -100.0f64 .. 0.0, span in 0.0f64 .. 100.0) {
        let range = NumericRange { min, max: min + span };
        let once = range.clamp(value);
        let twice = range.clamp(once);
        prop_assert_eq!(once, twice);
        prop_assert!(once >= range.min && once <= range.max);
    }

    #[test]
    fn canonical_hash_is_stable_under_key_permutation(
        keys in proptest::collection::btree_set("[a-z]{1,8}", 1 .. 8),
        seed in 0u64 .. 1_000,
    ) {
        let keys: Vec<String> = keys.into_iter().collect();
        let mut forward = Map::new();
        for (index, key) in keys.iter().enumerate() {
            forward.insert(key.clone(), json!(u64::try_from(index).unwrap_or(0) + seed));
        }
        let mut reversed = Map::new();
        for (index, key) in keys.iter().enumerate().rev() {
            reversed.insert(key.clone(), json!(u64::try_from(index).unwrap_or(0) + seed));
        }
        let hash_forward =
            hash_canonical_json(HashAlgorithm::Sha256, &Value::Object(forward)).unwrap();
        let hash_reversed =
            hash_canonical_json(HashAlgorithm::Sha256, &Value::Object(reversed)).unwrap();
        prop_assert_eq!(hash_forward, hash_reversed);
    }

    #[test]
    fn version_comparison_matches_numeric_segments(
        a in proptest::collection::vec(0u64 .. 50, 1 .. 4),
        b in proptest::collection::vec(0u64 .. 50, 1 .. 4),
    ) {
        let left: String = a.iter().map(u64::to_string).collect::<Vec<_>>().join(".");
        let right: String = b.iter().map(u64::to_string).collect::<Vec<_>>().join(".");
        let mut padded_a = a.clone();
        let mut padded_b = b.clone();
        while padded_a.len() < padded_b.len() { padded_a.push(0); }
        while padded_b.len() < padded_a.len() { padded_b.push(0); }
        prop_assert_eq!(compare_versions(&left, &right), padded_a.cmp(&padded_b));
    }

    #[test]
    fn replay_tokens_roundtrip(decision in "[a-f0-9-]{8,36}", hash_body in "[a-f0-9]{64}") {
        let scenario_hash = format!("sha256:{hash_body}");
        let token = encode_replay_token(&decision, &scenario_hash);
        prop_assert!(token.starts_with("rpl_"));
        let (decoded_id, decoded_hash) = decode_replay_token(&token).unwrap();
        prop_assert_eq!(decoded_id, decision);
        prop_assert_eq!(decoded_hash, scenario_hash);
    }
}
