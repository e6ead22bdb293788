//! Access to the parts of a raw search hit.

use crate::flatten::{FlatRecord, flatten_into};
use serde_json::{Map, Value};
use std::fmt;

/// Key of the hit object holding the document.
pub const SOURCE_KEY: &str = "_source";

/// Identity of a registered business unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey {
    /// CVR number
    pub business_id: i64,
    /// Unit number
    pub unit_id: i64,
}

impl EntityKey {
    /// Creates a new entity key
    pub const fn new(business_id: i64, unit_id: i64) -> Self {
        Self {
            business_id,
            unit_id,
        }
    }

    /// Read the key from an entity object.
    ///
    /// Both fields must be present as integers or numeric strings.
    pub fn from_entity(entity: &Map<String, Value>, business_id: &str, unit_id: &str) -> Option<Self> {
        Some(Self::new(
            integer(entity.get(business_id)?)?,
            integer(entity.get(unit_id)?)?,
        ))
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.business_id, self.unit_id)
    }
}

fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// The `_source` object of a hit.
pub fn source(hit: &Value) -> Option<&Map<String, Value>> {
    hit.get(SOURCE_KEY)?.as_object()
}

/// The entity object under `_source.<root>`.
pub fn entity<'a>(hit: &'a Value, root: &str) -> Option<&'a Map<String, Value>> {
    source(hit)?.get(root)?.as_object()
}

/// Flattened `_`-prefixed metadata of a hit (`_index`, `_id`, `_score`, ...),
/// in hit order. `_source` is excluded.
pub fn metadata(hit: &Value) -> FlatRecord {
    let mut out = FlatRecord::new();
    let Some(object) = hit.as_object() else {
        return out;
    };
    for (key, value) in object {
        if !key.starts_with('_') || key == SOURCE_KEY {
            continue;
        }
        match value {
            Value::Object(inner) => flatten_into(Some(key), inner, &mut out),
            leaf => {
                out.insert(key.clone(), leaf.clone());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_from_numbers_and_strings() {
        let entity = json!({"cvrNummer": 12345678, "enhedsNummer": "4000"});
        let key = EntityKey::from_entity(entity.as_object().unwrap(), "cvrNummer", "enhedsNummer");
        assert_eq!(key, Some(EntityKey::new(12345678, 4000)));
        assert_eq!(key.unwrap().to_string(), "12345678/4000");
    }

    #[test]
    fn test_key_requires_both_fields() {
        let entity = json!({"cvrNummer": 1, "enhedsNummer": null});
        assert!(EntityKey::from_entity(entity.as_object().unwrap(), "cvrNummer", "enhedsNummer").is_none());
    }

    #[test]
    fn test_metadata_skips_source_and_plain_keys() {
        let hit = json!({
            "_index": "cvr-v-20220630",
            "_type": "_doc",
            "_id": "123",
            "_score": null,
            "_source": {"Vrvirksomhed": {}},
            "sort": [7]
        });
        let meta = metadata(&hit);
        let keys: Vec<&str> = meta.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["_index", "_type", "_id", "_score"]);
    }

    #[test]
    fn test_entity_lookup() {
        let hit = json!({"_source": {"Vrvirksomhed": {"cvrNummer": 1}}});
        assert!(entity(&hit, "Vrvirksomhed").is_some());
        assert!(entity(&json!({}), "Vrvirksomhed").is_none());
    }
}
