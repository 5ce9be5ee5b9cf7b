//! Checksum computation for snapshot payloads.
//!
//! The checksum is taken over the payload's canonical JSON form: object keys
//! sorted at every level, compact separators. Structurally equal payloads
//! therefore hash identically regardless of how their maps were built.
//!
//! The digest is SHA-256 truncated to its first 16 bytes and hex-encoded,
//! giving the 32-character column the record schema reserves for it.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Length of a snapshot checksum in hex characters
pub const CHECKSUM_LEN: usize = 32;

/// Rebuild a JSON value with every object's keys in sorted order.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::with_capacity(map.len());
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key.as_str()]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Canonical compact JSON text for a value.
pub fn canonical_json(value: &Value) -> String {
    canonicalize(value).to_string()
}

/// Compute the checksum of a snapshot payload.
///
/// ```
/// use serde_json::json;
/// use snapkeep_core::snapshot::digest::compute_checksum;
///
/// let a = json!({"name": "Product 1", "price": 10});
/// let b = json!({"price": 10, "name": "Product 1"});
/// let checksum = compute_checksum(a.as_object().unwrap());
/// assert_eq!(checksum.len(), 32);
/// assert_eq!(checksum, compute_checksum(b.as_object().unwrap()));
/// ```
pub fn compute_checksum(data: &Map<String, Value>) -> String {
    let canonical = canonical_json(&Value::Object(data.clone()));
    let digest = Sha256::digest(canonical.as_bytes());
    hex::encode(&digest[..CHECKSUM_LEN / 2])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_json_sorts_nested_keys() {
        let value = json!({"b": 1, "a": {"d": [ {"z": 1, "y": 2} ], "c": null}});
        assert_eq!(
            canonical_json(&value),
            r#"{"a":{"c":null,"d":[{"y":2,"z":1}]},"b":1}"#
        );
    }

    #[test]
    fn test_array_order_is_significant() {
        let a = json!({"items": [1, 2]});
        let b = json!({"items": [2, 1]});
        assert_ne!(
            compute_checksum(a.as_object().unwrap()),
            compute_checksum(b.as_object().unwrap())
        );
    }

    #[test]
    fn test_checksum_is_lowercase_hex() {
        let data = json!({"name": "Product 1"});
        let checksum = compute_checksum(data.as_object().unwrap());
        assert_eq!(checksum.len(), CHECKSUM_LEN);
        assert!(checksum
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }
}
