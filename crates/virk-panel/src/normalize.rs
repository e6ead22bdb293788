//! Record normalization.
//!
//! Turns one raw hit into its flat main-table record and, for every
//! extraction rule, the rows it contributes to that rule's table. Pure: no
//! I/O, no shared state.

use crate::flatten::{FlatRecord, flatten_into, lookup};
use crate::record::{self, EntityKey};
use crate::rules::{ExtractionRule, Level, RuleSet};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::debug;

/// One output row, aligned with a [`RuleLayout`]'s columns.
pub type Row = Vec<Value>;

/// Flatten a hit for the main table: metadata first, then `_source`.
pub fn flatten_hit(hit: &Value) -> FlatRecord {
    let mut out = record::metadata(hit);
    if let Some(source) = record::source(hit) {
        flatten_into(None, source, &mut out);
    }
    out
}

/// Column layout of one rule's table.
#[derive(Debug, Clone)]
pub struct RuleLayout {
    rule: &'static ExtractionRule,
    columns: Vec<&'static str>,
    positions: HashMap<&'static str, usize>,
}

impl RuleLayout {
    /// Layout of `rule` under the key columns of `rules`.
    pub fn new(rules: &RuleSet, rule: &'static ExtractionRule) -> Self {
        let columns = rules.columns(rule);
        let positions = columns.iter().enumerate().map(|(i, c)| (*c, i)).collect();
        Self {
            rule,
            columns,
            positions,
        }
    }

    /// The rule.
    pub const fn rule(&self) -> &'static ExtractionRule {
        self.rule
    }

    /// Output columns, key columns first.
    pub fn columns(&self) -> &[&'static str] {
        &self.columns
    }

    fn empty_row(&self, key: EntityKey) -> Row {
        let mut row = vec![Value::Null; self.columns.len()];
        row[0] = Value::from(key.business_id);
        row[1] = Value::from(key.unit_id);
        row
    }

    fn set(&self, row: &mut Row, column: &str, value: Value) {
        if let Some(&position) = self.positions.get(column) {
            row[position] = value;
        }
    }
}

/// Result of normalizing one hit.
#[derive(Debug, Clone)]
pub struct NormalizedRecord {
    /// Entity key, `None` when the record carries no usable key
    pub key: Option<EntityKey>,
    /// Flat main-table record, lists included
    pub flat: FlatRecord,
    /// Rows per table, in rule order; empty when there is no key
    pub tables: Vec<(&'static str, Vec<Row>)>,
}

/// Interprets a [`RuleSet`] against raw hits.
#[derive(Debug, Clone)]
pub struct Normalizer {
    rules: RuleSet,
    layouts: Vec<RuleLayout>,
}

impl Normalizer {
    /// Creates a normalizer for a rule set
    pub fn new(rules: RuleSet) -> Self {
        let layouts = rules
            .rules
            .iter()
            .map(|rule| RuleLayout::new(&rules, rule))
            .collect();
        Self { rules, layouts }
    }

    /// The rule set.
    pub const fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// One layout per rule, in rule order.
    pub fn layouts(&self) -> &[RuleLayout] {
        &self.layouts
    }

    /// Entity object and key of a hit.
    pub fn keyed_entity<'a>(&self, hit: &'a Value) -> Option<(EntityKey, &'a Map<String, Value>)> {
        let entity = record::entity(hit, self.rules.root)?;
        let key = EntityKey::from_entity(entity, self.rules.business_id, self.rules.unit_id)?;
        Some((key, entity))
    }

    /// Normalize one hit against every rule.
    pub fn normalize(&self, hit: &Value) -> NormalizedRecord {
        let flat = flatten_hit(hit);
        let Some((key, entity)) = self.keyed_entity(hit) else {
            return NormalizedRecord {
                key: None,
                flat,
                tables: Vec::new(),
            };
        };
        let tables = self
            .layouts
            .iter()
            .map(|layout| (layout.rule.table, self.explode(layout, key, entity)))
            .collect();
        NormalizedRecord {
            key: Some(key),
            flat,
            tables,
        }
    }

    /// Rows contributed by one entity to one rule's table.
    ///
    /// A missing, null or empty list yields no rows. Below the first level,
    /// an element whose nested list is missing or empty yields one
    /// placeholder row.
    pub fn explode(&self, layout: &RuleLayout, key: EntityKey, entity: &Map<String, Value>) -> Vec<Row> {
        let rule = layout.rule;
        let mut rows = Vec::new();
        match entity.get(rule.field) {
            None | Some(Value::Null) => {}
            Some(Value::Array(items)) => {
                for item in items {
                    emit(layout, &rule.level, item, layout.empty_row(key), &mut rows);
                }
            }
            Some(other) => {
                debug!(
                    table = rule.table,
                    entity = %key,
                    kind = value_kind(other),
                    "expected a list; field skipped"
                );
            }
        }
        rows
    }
}

fn emit(layout: &RuleLayout, level: &Level, element: &Value, mut row: Row, out: &mut Vec<Row>) {
    for leaf in level.all_leaves() {
        let value = lookup(element, leaf.path).cloned().unwrap_or(Value::Null);
        layout.set(&mut row, leaf.column, value);
    }

    let Some(child) = level.child else {
        out.push(row);
        return;
    };

    match element
        .get(child.field)
        .and_then(Value::as_array)
        .filter(|items| !items.is_empty())
    {
        Some(items) => {
            for item in items {
                emit(layout, &child.level, item, row.clone(), out);
            }
        }
        None => out.push(row),
    }
}

const fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{COMPANY, get_rule};
    use serde_json::json;

    fn layout(table: &str) -> RuleLayout {
        RuleLayout::new(&COMPANY, get_rule(table).unwrap())
    }

    fn explode(table: &str, entity: Value) -> (RuleLayout, Vec<Row>) {
        let normalizer = Normalizer::new(COMPANY);
        let layout = layout(table);
        let rows = normalizer.explode(&layout, EntityKey::new(1, 2), entity.as_object().unwrap());
        (layout, rows)
    }

    fn cell<'a>(layout: &RuleLayout, row: &'a Row, column: &str) -> &'a Value {
        let position = layout.columns().iter().position(|c| *c == column).unwrap();
        &row[position]
    }

    #[test]
    fn test_temporal_rows() {
        let (layout, rows) = explode(
            "navne",
            json!({"navne": [
                {"navn": "A ApS", "periode": {"gyldigFra": "2001-01-01", "gyldigTil": "2010-01-01"}, "sidstOpdateret": "2010-01-02"},
                {"navn": "B ApS", "periode": {"gyldigFra": "2010-01-02", "gyldigTil": null}}
            ]}),
        );

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], json!(1));
        assert_eq!(rows[0][1], json!(2));
        assert_eq!(cell(&layout, &rows[0], "navn"), &json!("A ApS"));
        assert_eq!(cell(&layout, &rows[1], "gyldigFra"), &json!("2010-01-02"));
        assert_eq!(cell(&layout, &rows[1], "gyldigTil"), &Value::Null);
        assert_eq!(cell(&layout, &rows[1], "sidstOpdateret"), &Value::Null);
    }

    #[test]
    fn test_missing_and_malformed_fields() {
        assert!(explode("navne", json!({})).1.is_empty());
        assert!(explode("navne", json!({"navne": null})).1.is_empty());
        assert!(explode("navne", json!({"navne": []})).1.is_empty());
        assert!(explode("navne", json!({"navne": {"navn": "x"}})).1.is_empty());

        let (layout, rows) = explode("navne", json!({"navne": ["not an object"]}));
        assert_eq!(rows.len(), 1);
        assert_eq!(cell(&layout, &rows[0], "navn"), &Value::Null);
    }

    #[test]
    fn test_address_municipality_leaves() {
        let (layout, rows) = explode(
            "beliggenhedsadresse",
            json!({"beliggenhedsadresse": [
                {"vejnavn": "Vej", "kommune": {"kommuneKode": 101, "kommuneNavn": "KØBENHAVN"}},
                {"vejnavn": "Gade", "kommune": null}
            ]}),
        );
        assert_eq!(cell(&layout, &rows[0], "kommuneKode"), &json!(101));
        assert_eq!(cell(&layout, &rows[1], "kommuneNavn"), &Value::Null);
    }

    #[test]
    fn test_attribute_values_with_placeholder() {
        let (layout, rows) = explode(
            "attributter",
            json!({"attributter": [
                {"type": "KAPITAL", "sekvensnr": 0, "vaerdier": [
                    {"vaerdi": "50000"}, {"vaerdi": "80000"}
                ]},
                {"type": "FORMÅL", "sekvensnr": 1, "vaerdier": []}
            ]}),
        );

        assert_eq!(rows.len(), 3);
        assert_eq!(cell(&layout, &rows[1], "vaerdi"), &json!("80000"));
        assert_eq!(cell(&layout, &rows[2], "type"), &json!("FORMÅL"));
        assert_eq!(cell(&layout, &rows[2], "vaerdi"), &Value::Null);
    }

    #[test]
    fn test_participant_relation_levels() {
        let (layout, rows) = explode(
            "deltagerRelation",
            json!({"deltagerRelation": [
                {
                    "deltager": {"enhedsNummer": 900, "enhedstype": "PERSON"},
                    "organisationer": [
                        {
                            "hovedtype": "LEDELSESORGAN",
                            "organisationsNavn": [{"navn": "Direktion"}],
                            "periode": {"gyldigFra": "2000-01-01"},
                            "medlemsData": [{"attributter": [
                                {"type": "FUNKTION", "vaerdier": [{"vaerdi": "DIREKTØR"}], "periode": {"gyldigFra": "2005-05-05"}},
                                {"type": "VALGFORM", "vaerdier": []}
                            ]}]
                        },
                        {
                            "hovedtype": "REGISTER",
                            "periode": {"gyldigFra": "1999-09-09"}
                        },
                        {
                            "hovedtype": "EJER",
                            "periode": {"gyldigFra": "1998-08-08"},
                            "medlemsData": [{"attributter": []}]
                        }
                    ]
                },
                {"deltager": null, "organisationer": []}
            ]}),
        );

        assert_eq!(rows.len(), 5);

        assert_eq!(cell(&layout, &rows[0], "deltagerEnhedsNummer"), &json!(900));
        assert_eq!(cell(&layout, &rows[0], "organisationNavn"), &json!("Direktion"));
        assert_eq!(cell(&layout, &rows[0], "attributVaerdi"), &json!("DIREKTØR"));
        assert_eq!(cell(&layout, &rows[0], "gyldigFra"), &json!("2005-05-05"));

        // attribute without its own period overrides the organisation period with null
        assert_eq!(cell(&layout, &rows[1], "attributType"), &json!("VALGFORM"));
        assert_eq!(cell(&layout, &rows[1], "attributVaerdi"), &Value::Null);
        assert_eq!(cell(&layout, &rows[1], "gyldigFra"), &Value::Null);

        // organisation without membership data keeps its own period
        assert_eq!(cell(&layout, &rows[2], "organisationHovedtype"), &json!("REGISTER"));
        assert_eq!(cell(&layout, &rows[2], "attributType"), &Value::Null);
        assert_eq!(cell(&layout, &rows[2], "gyldigFra"), &json!("1999-09-09"));

        // member without attributes keeps the organisation period
        assert_eq!(cell(&layout, &rows[3], "gyldigFra"), &json!("1998-08-08"));

        // relation without organisations and without participant
        assert_eq!(cell(&layout, &rows[4], "deltagerEnhedsNummer"), &Value::Null);
        assert_eq!(cell(&layout, &rows[4], "organisationHovedtype"), &Value::Null);
        assert_eq!(rows[4][0], json!(1));
    }

    #[test]
    fn test_normalize_without_key() {
        let normalizer = Normalizer::new(COMPANY);
        let record = normalizer.normalize(&json!({"_id": "x", "_source": {"Vrvirksomhed": {"navne": []}}}));
        assert!(record.key.is_none());
        assert!(record.tables.is_empty());
        assert_eq!(record.flat["_id"], json!("x"));
    }

    #[test]
    fn test_normalize_covers_every_rule() {
        let normalizer = Normalizer::new(COMPANY);
        let hit = json!({"_source": {"Vrvirksomhed": {
            "cvrNummer": 10, "enhedsNummer": 20,
            "navne": [{"navn": "A"}],
            "hjemmeside": [{"kontaktoplysning": "www.a.dk"}, {"kontaktoplysning": "www.b.dk"}]
        }}});

        let record = normalizer.normalize(&hit);

        assert_eq!(record.key, Some(EntityKey::new(10, 20)));
        assert_eq!(record.tables.len(), 21);
        let rows: usize = record.tables.iter().map(|(_, rows)| rows.len()).sum();
        assert_eq!(rows, 3);
        assert!(record.flat.contains_key("Vrvirksomhed_cvrNummer"));
    }
}
