//! Content-derived table identity.
//!
//! Two records with structurally identical inferred schemas must always resolve to the
//! same table, and structurally different records must not collide. Identity is derived
//! from a SHA-256 digest of the canonical schema serialization; the digest is base64
//! encoded and stripped down to an identifier-safe alphabet.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};

use crate::error::SluiceResult;
use crate::types::FieldSchema;

/// Resolves the deterministic table id for a schema under the given prefix.
///
/// The fields are canonical by construction (sorted traversal, fixed serialization
/// order), so hashing their JSON serialization is order-independent with respect to the
/// original input.
pub fn resolve_table_id(table_prefix: &str, fields: &[FieldSchema]) -> SluiceResult<String> {
    let canonical = serde_json::to_vec(fields)?;

    let digest = Sha256::digest(&canonical);
    let mut encoded = STANDARD.encode(digest);
    encoded.retain(|c| c.is_ascii_alphanumeric());

    Ok(format!("{table_prefix}_{encoded}"))
}

/// Returns true when the value matches `^[A-Za-z0-9_]+$`.
///
/// Dataset ids and table prefixes must satisfy this before any remote call is made.
pub fn is_safe_identifier(value: &str) -> bool {
    !value.is_empty()
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::discover;
    use serde_json::json;

    #[test]
    fn same_schema_resolves_to_same_table() {
        let (fields, _) = discover(&json!({"a": 1, "b": "x"})).unwrap();
        let first = resolve_table_id("events", &fields).unwrap();
        let second = resolve_table_id("events", &fields).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn key_order_does_not_change_identity() {
        let (first, _) = discover(&json!({"a": 1, "b": "x", "c": {"d": true, "e": 2}})).unwrap();
        let (second, _) = discover(&json!({"c": {"e": 5, "d": false}, "b": "y", "a": 9})).unwrap();
        assert_eq!(
            resolve_table_id("events", &first).unwrap(),
            resolve_table_id("events", &second).unwrap()
        );
    }

    #[test]
    fn different_shapes_resolve_to_different_tables() {
        let (first, _) = discover(&json!({"a": 1})).unwrap();
        let (second, _) = discover(&json!({"a": "1"})).unwrap();
        assert_ne!(
            resolve_table_id("events", &first).unwrap(),
            resolve_table_id("events", &second).unwrap()
        );
    }

    #[test]
    fn table_id_is_identifier_safe() {
        let (fields, _) = discover(&json!({"a": 1})).unwrap();
        let table_id = resolve_table_id("events", &fields).unwrap();
        let digest = table_id.strip_prefix("events_").unwrap();
        assert!(!digest.is_empty());
        assert!(digest.bytes().all(|b| b.is_ascii_alphanumeric()));
    }

    #[test]
    fn safe_identifier_accepts_word_characters() {
        assert!(is_safe_identifier("analytics_01"));
        assert!(is_safe_identifier("_"));
    }

    #[test]
    fn safe_identifier_rejects_everything_else() {
        assert!(!is_safe_identifier(""));
        assert!(!is_safe_identifier("my-dataset"));
        assert!(!is_safe_identifier("data set"));
        assert!(!is_safe_identifier("tabelle.ü"));
    }
}
