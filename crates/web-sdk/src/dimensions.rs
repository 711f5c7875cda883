use serde_json::Value;

use crate::constants::DIMENSION_MAPPING;
use crate::helper::convert_boolean_values_to_string;
use beacon_core::Record;

/// Semantic name for a vendor dimension key.
pub fn semantic_name(key: &str) -> Option<&'static str> {
    DIMENSION_MAPPING
        .iter()
        .find(|(short, _)| *short == key)
        .map(|(_, name)| *name)
}

pub fn is_semantic_name(key: &str) -> bool {
    DIMENSION_MAPPING.iter().any(|(_, name)| *name == key)
}

/// Rename vendor dimension keys to their semantic names. Keys missing from
/// the mapping are dropped.
pub fn rename_dimensions(dimensions: &Record) -> Record {
    dimensions
        .iter()
        .filter_map(|(key, value)| semantic_name(key).map(|name| (name.to_string(), value.clone())))
        .collect()
}

/// Like [`rename_dimensions`], but keys that already carry a semantic name
/// pass through untouched. Used where dimensions may arrive either raw or
/// already renamed by `set_dimensions`.
pub fn normalize_dimensions(dimensions: &Record) -> Record {
    dimensions
        .iter()
        .filter_map(|(key, value)| {
            if is_semantic_name(key) {
                Some((key.clone(), value.clone()))
            } else {
                semantic_name(key).map(|name| (name.to_string(), value.clone()))
            }
        })
        .collect()
}

/// Report numbers as strings and booleans as "0"/"1"; other values are kept.
pub fn stringify_value(value: &Value) -> Value {
    match value {
        Value::Number(n) => Value::String(n.to_string()),
        Value::Bool(_) => Value::String(convert_boolean_values_to_string(value).to_string()),
        other => other.clone(),
    }
}

/// Coerce a scalar to its string form; null stays null.
pub fn coerce_to_string(value: &Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::String(s) => Value::String(s.clone()),
        other => Value::String(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_rename_is_filter_and_map() {
        let input = record(json!({
            "dimension90": "learner-7",
            "dimension2": 101,
            "dimension999": "dropped",
            "course_id": "dropped too"
        }));
        let renamed = rename_dimensions(&input);

        assert_eq!(renamed.len(), 2);
        assert_eq!(renamed["learner_id"], "learner-7");
        assert_eq!(renamed["course_id"], 101);
        for key in renamed.keys() {
            assert!(is_semantic_name(key));
        }
    }

    #[test]
    fn test_rename_every_mapped_key() {
        let input: Record = DIMENSION_MAPPING
            .iter()
            .map(|(short, _)| (short.to_string(), json!(short)))
            .collect();
        let renamed = rename_dimensions(&input);
        assert_eq!(renamed.len(), DIMENSION_MAPPING.len());
        for (short, name) in DIMENSION_MAPPING {
            assert_eq!(renamed[*name], json!(short));
        }
    }

    #[test]
    fn test_normalize_keeps_semantic_names() {
        let input = record(json!({"course_id": "c-1", "dimension90": "l-1", "bogus": 1}));
        let normalized = normalize_dimensions(&input);
        assert_eq!(normalized.len(), 2);
        assert_eq!(normalized["course_id"], "c-1");
        assert_eq!(normalized["learner_id"], "l-1");
    }

    #[test]
    fn test_stringify_value() {
        assert_eq!(stringify_value(&json!(12)), json!("12"));
        assert_eq!(stringify_value(&json!(true)), json!("1"));
        assert_eq!(stringify_value(&json!(false)), json!("0"));
        assert_eq!(stringify_value(&json!("x")), json!("x"));
        assert_eq!(stringify_value(&Value::Null), Value::Null);
    }

    #[test]
    fn test_coerce_to_string() {
        assert_eq!(coerce_to_string(&json!(42)), json!("42"));
        assert_eq!(coerce_to_string(&json!("42")), json!("42"));
        assert_eq!(coerce_to_string(&Value::Null), Value::Null);
    }
}
