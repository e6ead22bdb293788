//! Path-join flattening of nested JSON objects.
//!
//! Nested objects are walked depth first and their keys joined with `_`, so
//! `{"a": {"b": 1}}` becomes `{"a_b": 1}`. Arrays and scalars are leaves.
//! Empty objects contribute no keys. Key order follows the input.

use serde_json::{Map, Value};

/// Separator placed between the keys of a flattened path.
pub const SEPARATOR: &str = "_";

/// One flattened record: joined path to leaf value, in input order.
pub type FlatRecord = Map<String, Value>;

/// Flatten an object into a new record.
pub fn flatten_object(object: &Map<String, Value>) -> FlatRecord {
    let mut out = FlatRecord::new();
    flatten_into(None, object, &mut out);
    out
}

/// Flatten `object` into `out`, prefixing every key with `prefix`.
pub fn flatten_into(prefix: Option<&str>, object: &Map<String, Value>, out: &mut FlatRecord) {
    for (key, value) in object {
        let path = match prefix {
            Some(prefix) => format!("{prefix}{SEPARATOR}{key}"),
            None => key.clone(),
        };
        match value {
            Value::Object(inner) => flatten_into(Some(&path), inner, out),
            leaf => {
                out.insert(path, leaf.clone());
            }
        }
    }
}

/// Whether any value of the record is an array.
pub fn has_lists(record: &FlatRecord) -> bool {
    record.values().any(Value::is_array)
}

/// Resolve a dotted path inside a value.
///
/// Object segments are looked up by key, numeric segments index arrays.
/// Returns `None` when a segment is missing or the value is `null`.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    (!current.is_null()).then_some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_nested_keys_are_joined() {
        let flat = flatten_object(&object(json!({
            "Vrvirksomhed": {"cvrNummer": 1, "virksomhedMetadata": {"stiftelsesDato": "2001-01-01"}},
            "top": true
        })));

        let keys: Vec<&str> = flat.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "Vrvirksomhed_cvrNummer",
                "Vrvirksomhed_virksomhedMetadata_stiftelsesDato",
                "top"
            ]
        );
    }

    #[test]
    fn test_arrays_and_nulls_are_leaves() {
        let flat = flatten_object(&object(json!({"a": {"list": [{"x": 1}], "gone": null, "empty": {}}})));
        assert_eq!(flat["a_list"], json!([{"x": 1}]));
        assert_eq!(flat["a_gone"], Value::Null);
        assert!(!flat.contains_key("a_empty"));
        assert!(has_lists(&flat));
    }

    #[test]
    fn test_flattening_is_idempotent() {
        let once = flatten_object(&object(json!({"a": {"b": 1, "c": {"d": "x"}}, "e": 2.5})));
        let twice = flatten_object(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_lookup_paths() {
        let value = json!({
            "periode": {"gyldigFra": "2020-01-01", "gyldigTil": null},
            "organisationsNavn": [{"navn": "Bestyrelse"}]
        });
        assert_eq!(lookup(&value, "periode.gyldigFra"), Some(&json!("2020-01-01")));
        assert_eq!(lookup(&value, "periode.gyldigTil"), None);
        assert_eq!(lookup(&value, "organisationsNavn.0.navn"), Some(&json!("Bestyrelse")));
        assert_eq!(lookup(&value, "organisationsNavn.1.navn"), None);
        assert_eq!(lookup(&value, "missing.path"), None);
        assert_eq!(lookup(&json!("scalar"), "x"), None);
    }
}
