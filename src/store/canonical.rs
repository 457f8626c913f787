//! Canonical JSON serialisation and hashing
//!
//! Receipt hashes need a stable byte representation: object keys are sorted
//! lexicographically, no whitespace is emitted, and an absent value
//! serialises as `null`. Semantically equal documents always hash equal.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Serialise a JSON value into its canonical form
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

/// Canonical form of an optional value; absent serialises as `null`
pub fn canonical_json_opt(value: Option<&Value>) -> String {
    match value {
        Some(v) => canonical_json(v),
        None => "null".to_string(),
    }
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => {
            // serde_json string encoding is already canonical
            out.push_str(&serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string()));
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key).unwrap_or_else(|_| "\"\"".to_string()));
                out.push(':');
                write_canonical(&map[*key], out);
            }
            out.push('}');
        }
    }
}

/// SHA-256 of a UTF-8 string, lowercase hex
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Canonical hash of an optional JSON value
pub fn hash_value(value: Option<&Value>) -> String {
    sha256_hex(&canonical_json_opt(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars() {
        assert_eq!(canonical_json(&json!(null)), "null");
        assert_eq!(canonical_json(&json!(true)), "true");
        assert_eq!(canonical_json(&json!(false)), "false");
        assert_eq!(canonical_json(&json!(42)), "42");
        assert_eq!(canonical_json(&json!("hi")), "\"hi\"");
        assert_eq!(canonical_json_opt(None), "null");
    }

    #[test]
    fn test_object_keys_sorted() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(canonical_json(&a), "{\"a\":2,\"b\":1}");
        assert_eq!(canonical_json(&a), canonical_json(&b));
        assert_eq!(hash_value(Some(&a)), hash_value(Some(&b)));
    }

    #[test]
    fn test_nested_structures() {
        let value = json!({
            "z": [1, {"y": null, "x": "s"}],
            "a": {"c": false}
        });
        assert_eq!(
            canonical_json(&value),
            "{\"a\":{\"c\":false},\"z\":[1,{\"x\":\"s\",\"y\":null}]}"
        );
    }

    #[test]
    fn test_array_order_preserved() {
        assert_ne!(
            canonical_json(&json!([1, 2])),
            canonical_json(&json!([2, 1]))
        );
    }

    #[test]
    fn test_sha256_hex() {
        // Known digest of the empty string
        assert_eq!(
            sha256_hex(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(sha256_hex("x").len(), 64);
    }
}
