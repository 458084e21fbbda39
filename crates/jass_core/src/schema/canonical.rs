//! Canonical form and content hashes.
//!
//! Two hashing domains are kept apart on purpose. A schema's identity is
//! the SHA-1 of its raw text, so reformatting a schema yields a new
//! identity. A compiled mapping is addressed by the SHA-1 of its canonical
//! form, so key order and array order never change its hash.

use crate::error::{CoreError, CoreResult};
use jass_engine::EngineMapping;
use serde_json::Value;
use sha1::{Digest, Sha1};

/// Deepest nesting `canonicalize` accepts.
pub const MAX_CANONICAL_DEPTH: usize = 64;

/// Renders `value` as an order-independent string.
///
/// Objects become the sorted concatenation of `key + canonical(value)`;
/// arrays the sorted concatenation of their canonical elements; scalars
/// their plain text (`true`, `null`, `1.5`, the string itself). The result
/// only serves as hash input and cannot be parsed back.
///
/// # Errors
///
/// Returns `CanonicalDepthExceeded` past [`MAX_CANONICAL_DEPTH`] levels.
pub fn canonicalize(value: &Value) -> CoreResult<String> {
    visit(value, 0)
}

fn visit(value: &Value, depth: usize) -> CoreResult<String> {
    if depth > MAX_CANONICAL_DEPTH {
        return Err(CoreError::CanonicalDepthExceeded {
            limit: MAX_CANONICAL_DEPTH,
        });
    }
    let mut parts = match value {
        Value::Object(map) => map
            .iter()
            .map(|(key, inner)| visit(inner, depth + 1).map(|text| format!("{key}{text}")))
            .collect::<CoreResult<Vec<_>>>()?,
        Value::Array(items) => items
            .iter()
            .map(|item| visit(item, depth + 1))
            .collect::<CoreResult<Vec<_>>>()?,
        Value::String(text) => return Ok(text.clone()),
        Value::Number(number) => return Ok(number.to_string()),
        Value::Bool(flag) => return Ok(flag.to_string()),
        Value::Null => return Ok("null".to_string()),
    };
    parts.sort_unstable();
    Ok(parts.concat())
}

fn sha1_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Identity of a raw schema text: `"h"` followed by its SHA-1.
///
/// The prefix keeps the id usable as an engine document id.
#[must_use]
pub fn hash_schema_identity(raw: &str) -> String {
    format!("h{}", sha1_hex(raw.as_bytes()))
}

/// Content address of a compiled mapping.
///
/// # Errors
///
/// Returns `CanonicalDepthExceeded` for pathologically deep mappings.
pub fn hash_mapping(mapping: &EngineMapping) -> CoreResult<String> {
    let value =
        serde_json::to_value(mapping).map_err(|err| CoreError::invalid_schema(err.to_string()))?;
    hash_value(&value)
}

/// Content address of an arbitrary JSON value.
///
/// # Errors
///
/// Returns `CanonicalDepthExceeded` for pathologically deep values.
pub fn hash_value(value: &Value) -> CoreResult<String> {
    Ok(sha1_hex(canonicalize(value)?.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jass_engine::{FieldMapping, FieldType};
    use serde_json::json;

    #[test]
    fn objects_sort_entries() {
        let value = json!({"b": "2", "a": {"y": true, "x": null}});
        assert_eq!(canonicalize(&value).unwrap(), "axnullytrueb2");
    }

    #[test]
    fn arrays_sort_elements() {
        assert_eq!(canonicalize(&json!(["b", "a", 3])).unwrap(), "3ab");
        assert_eq!(
            canonicalize(&json!(["b", "a"])).unwrap(),
            canonicalize(&json!(["a", "b"])).unwrap()
        );
    }

    #[test]
    fn key_order_does_not_change_mapping_hash() {
        let a: Value = serde_json::from_str(r#"{"properties":{"x":{"type":"long"},"y":{"index":"no","type":"string"}}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"properties":{"y":{"type":"string","index":"no"},"x":{"type":"long"}}}"#).unwrap();
        assert_eq!(hash_value(&a).unwrap(), hash_value(&b).unwrap());
    }

    #[test]
    fn mapping_hash_matches_value_hash() {
        let mapping = EngineMapping::new().with_field("x", FieldMapping::of(FieldType::Long));
        let value = json!({"properties": {"x": {"type": "long"}}});
        assert_eq!(hash_mapping(&mapping).unwrap(), hash_value(&value).unwrap());
        assert_eq!(hash_mapping(&mapping).unwrap().len(), 40);
    }

    #[test]
    fn identity_hash_is_order_sensitive() {
        let a = hash_schema_identity(r#"{"a":1,"b":2}"#);
        let b = hash_schema_identity(r#"{"b":2,"a":1}"#);
        assert_ne!(a, b);
        assert!(a.starts_with('h'));
        assert_eq!(a, hash_schema_identity(r#"{"a":1,"b":2}"#));
        assert_eq!(
            hash_schema_identity("abc"),
            "ha9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }

    #[test]
    fn deep_values_are_rejected() {
        let mut value = json!("leaf");
        for _ in 0..=MAX_CANONICAL_DEPTH {
            value = json!([value]);
        }
        assert_eq!(
            canonicalize(&value),
            Err(CoreError::CanonicalDepthExceeded {
                limit: MAX_CANONICAL_DEPTH
            })
        );
    }
}
