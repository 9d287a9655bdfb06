// crates/ade-core/tests/hashing.rs
// ============================================================================
// Module: Canonical Hashing Tests
// Description: Verifies canonical JSON hashing and digest wire forms.
// ============================================================================
//! Ensures canonical JSON hashing is deterministic across key ordering and
//! that digest parsing enforces the `sha256:<hex>` wire form.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

use ade_core::HashDigest;
use ade_core::core::hashing::HashAlgorithm;
use ade_core::core::hashing::canonical_json_bytes;
use ade_core::core::hashing::hash_bytes;
use ade_core::core::hashing::hash_canonical_json;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

#[test]
fn canonical_hash_is_order_independent_for_maps() {
    let mut map_a = Map::new();
    map_a.insert("b".to_string(), json!(2));
    map_a.insert("a".to_string(), json!(1));

    let mut map_b = Map::new();
    map_b.insert("a".to_string(), json!(1));
    map_b.insert("b".to_string(), json!(2));

    let hash_a = hash_canonical_json(HashAlgorithm::Sha256, &Value::Object(map_a)).expect("a");
    let hash_b = hash_canonical_json(HashAlgorithm::Sha256, &Value::Object(map_b)).expect("b");
    assert_eq!(hash_a, hash_b);
}

#[test]
fn canonical_bytes_have_no_insignificant_whitespace() {
    let bytes = canonical_json_bytes(&json!({"b": 1, "a": [1, 2]})).expect("bytes");
    let text = String::from_utf8(bytes).expect("utf8");
    assert_eq!(text, r#"{"a":[1,2],"b":1}"#);
}

#[test]
fn hash_consistency_across_calls() {
    let value = json!({"a": 1, "b": [1, 2, 3], "c": {"nested": true}});
    let first = hash_canonical_json(HashAlgorithm::Sha256, &value).expect("first");
    let second = hash_canonical_json(HashAlgorithm::Sha256, &value).expect("second");
    assert_eq!(first, second);
}

#[test]
fn digest_renders_prefixed_lowercase_hex() {
    let digest = hash_bytes(HashAlgorithm::Sha256, b"test");
    let rendered = digest.to_string();
    assert!(rendered.starts_with("sha256:"));
    assert_eq!(rendered.len(), "sha256:".len() + 64);
    assert!(!rendered.chars().any(char::is_uppercase));
    // SHA-256 of "test".
    assert_eq!(
        digest.value,
        "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
    );
}

#[test]
fn digest_parse_roundtrips_the_wire_form() {
    let digest = hash_bytes(HashAlgorithm::Sha256, b"roundtrip");
    let parsed = HashDigest::parse(&digest.to_string()).expect("parse");
    assert_eq!(parsed, digest);
}

#[test]
fn digest_parse_rejects_malformed_text() {
    assert!(HashDigest::parse("sha256:short").is_err());
    assert!(HashDigest::parse("md5:0000").is_err());
    assert!(HashDigest::parse("not-a-digest").is_err());
    let uppercase = format!("sha256:{}", "A".repeat(64));
    assert!(HashDigest::parse(&uppercase).is_err());
}

#[test]
fn digest_serde_uses_the_prefixed_string() {
    let digest = hash_bytes(HashAlgorithm::Sha256, b"serde");
    let serialized = serde_json::to_value(&digest).expect("serialize");
    assert_eq!(serialized, json!(digest.to_string()));
    let deserialized: HashDigest = serde_json::from_value(serialized).expect("deserialize");
    assert_eq!(deserialized, digest);
}
