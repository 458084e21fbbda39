//! Property-based test generators using proptest.
//!
//! Provides strategies for JSON values, compiled mappings and index names.

use jass_engine::{EngineMapping, FieldMapping, FieldType, IndexOption};
use proptest::prelude::*;
use serde_json::{Map, Value};

/// Strategy for scalar JSON values.
pub fn json_scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[a-z0-9 ]{0,8}".prop_map(Value::String),
    ]
}

/// Strategy for arbitrary JSON values nested a few levels deep.
pub fn json_value_strategy() -> impl Strategy<Value = Value> {
    json_scalar_strategy().prop_recursive(4, 48, 5, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..5).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..5)
                .prop_map(|entries| Value::Object(entries.into_iter().collect())),
        ]
    })
}

/// Returns `value` with every object's keys and every array's elements in
/// reverse order, at every depth.
pub fn reversed(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, child) in map.iter().rev() {
                out.insert(key.clone(), reversed(child));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().rev().map(reversed).collect()),
        other => other.clone(),
    }
}

/// Strategy for a single compiled field definition.
pub fn field_mapping_strategy() -> impl Strategy<Value = FieldMapping> {
    prop_oneof![
        Just(FieldMapping::of(FieldType::Long)),
        Just(FieldMapping::of(FieldType::Double)),
        Just(FieldMapping::of(FieldType::Boolean)),
        Just(FieldMapping::of(FieldType::String).with_index(IndexOption::NotAnalyzed)),
        Just(FieldMapping::of(FieldType::String).with_analyzer("standard")),
        Just(FieldMapping::of(FieldType::String).with_index(IndexOption::No)),
    ]
}

/// Strategy for field names.
pub fn field_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,11}").expect("Invalid regex")
}

/// Strategy for mappings of up to `max_fields` root fields.
pub fn mapping_strategy(max_fields: usize) -> impl Strategy<Value = EngineMapping> {
    prop::collection::btree_map(field_name_strategy(), field_mapping_strategy(), 0..=max_fields)
        .prop_map(|properties| EngineMapping {
            dynamic: None,
            properties,
        })
}

/// Strategy for tenant ids and class prefixes.
pub fn name_part_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9]{0,7}_").expect("Invalid regex")
}

/// Strategy for index name suffixes, wildcard free.
pub fn index_suffix_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z0-9_-]{1,12}").expect("Invalid regex")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reversed_flips_every_level() {
        let value = json!({"a": [1, 2], "b": {"c": 1, "d": 2}});
        let flipped = reversed(&value);
        let keys: Vec<&String> = flipped.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(flipped["a"], json!([2, 1]));
    }
}
