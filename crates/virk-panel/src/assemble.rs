//! Panel assembly: a batch of hits into a main table plus one table per rule.

use crate::error::Result;
use crate::flatten::FlatRecord;
use crate::normalize::{Normalizer, RuleLayout, flatten_hit};
use crate::record::EntityKey;
use crate::rules::RuleSet;
use crate::schema::BatchSchema;
use crate::table::TableBuilder;
use polars::prelude::DataFrame;
use rayon::prelude::*;
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Name of the main table of a panel.
pub const MAIN_TABLE: &str = "main";

/// Named tables produced from one batch, main table first, then one table
/// per rule in registry order.
#[derive(Debug, Clone, Default)]
pub struct Panel {
    tables: Vec<(String, DataFrame)>,
}

impl Panel {
    /// Creates an empty panel
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a table.
    pub fn push(&mut self, name: impl Into<String>, table: DataFrame) {
        self.tables.push((name.into(), table));
    }

    /// Get a table by name
    pub fn get(&self, name: &str) -> Option<&DataFrame> {
        self.tables.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    /// The main table.
    pub fn main(&self) -> Option<&DataFrame> {
        self.get(MAIN_TABLE)
    }

    /// Table names, in order.
    pub fn names(&self) -> Vec<&str> {
        self.tables.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Iterate over `(name, table)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DataFrame)> {
        self.tables.iter().map(|(n, t)| (n.as_str(), t))
    }

    /// Mutable access to every table, for in-place transforms.
    pub fn tables_mut(&mut self) -> impl Iterator<Item = (&str, &mut DataFrame)> {
        self.tables.iter_mut().map(|(n, t)| (n.as_str(), t))
    }

    /// Number of tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether the panel holds no table.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Total number of rows across all tables.
    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|(_, t)| t.height()).sum()
    }
}

impl IntoIterator for Panel {
    type Item = (String, DataFrame);
    type IntoIter = std::vec::IntoIter<(String, DataFrame)>;

    fn into_iter(self) -> Self::IntoIter {
        self.tables.into_iter()
    }
}

/// Builds a [`Panel`] from a batch of raw hits.
///
/// Rules are independent of each other and run in parallel; the output
/// does not depend on scheduling.
#[derive(Debug, Clone)]
pub struct PanelAssembler {
    normalizer: Normalizer,
}

impl PanelAssembler {
    /// Creates an assembler for a rule set
    pub fn new(rules: RuleSet) -> Self {
        Self {
            normalizer: Normalizer::new(rules),
        }
    }

    /// The underlying normalizer.
    pub const fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Assemble every table. Every rule yields a table, empty ones included.
    pub fn assemble(&self, hits: &[Value]) -> Result<Panel> {
        let rules = self.normalizer.rules();
        let entities = self.keyed_entities(hits);

        let (main, tables) = rayon::join(
            || main_table(hits, rules),
            || {
                self.normalizer
                    .layouts()
                    .par_iter()
                    .map(|layout| self.rule_table(layout, &entities))
                    .collect::<Result<Vec<_>>>()
            },
        );

        let mut panel = Panel::new();
        panel.push(MAIN_TABLE, main?);
        for (name, table) in tables? {
            panel.push(name, table);
        }

        info!(
            records = hits.len(),
            tables = panel.len(),
            rows = panel.total_rows(),
            "assembled panel"
        );
        Ok(panel)
    }

    /// Assemble a single rule's table.
    pub fn assemble_table(&self, hits: &[Value], table: &str) -> Result<DataFrame> {
        let layout = self
            .normalizer
            .layouts()
            .iter()
            .find(|l| l.rule().table == table)
            .ok_or_else(|| crate::PanelError::UnknownTable(table.to_string()))?;
        let entities = self.keyed_entities(hits);
        Ok(self.rule_table(layout, &entities)?.1)
    }

    fn keyed_entities<'a>(&self, hits: &'a [Value]) -> Vec<(EntityKey, &'a Map<String, Value>)> {
        let entities: Vec<_> = hits
            .iter()
            .filter_map(|hit| self.normalizer.keyed_entity(hit))
            .collect();
        let skipped = hits.len() - entities.len();
        if skipped > 0 {
            warn!(
                skipped,
                "records without a usable entity key are left out of sub-structure tables"
            );
        }
        entities
    }

    fn rule_table(
        &self,
        layout: &RuleLayout,
        entities: &[(EntityKey, &Map<String, Value>)],
    ) -> Result<(String, DataFrame)> {
        let mut builder = TableBuilder::new(layout.columns());
        for (key, entity) in entities {
            for row in self.normalizer.explode(layout, *key, entity) {
                builder.push_row(row);
            }
        }
        let table = layout.rule().table;
        debug!(table, rows = builder.len(), "built sub-structure table");
        Ok((table.to_string(), builder.build()?))
    }
}

/// Main table: one row per hit with every scalar column of the batch.
///
/// Columns holding a list in any record are excluded; those without an
/// extraction rule are reported.
pub fn main_table(hits: &[Value], rules: &RuleSet) -> Result<DataFrame> {
    let records: Vec<FlatRecord> = hits.iter().map(flatten_hit).collect();
    let schema = BatchSchema::scan(&records);

    let covered: HashSet<String> = rules.rules.iter().map(|r| rules.list_column(r)).collect();
    for column in schema.list_columns() {
        if !covered.contains(column) {
            warn!(column, "list field has no extraction rule; left out of the main table");
        }
    }

    let columns = schema.scalar_columns();
    let mut builder = TableBuilder::new(&columns);
    for record in &records {
        builder.push_row(
            columns
                .iter()
                .map(|c| record.get(*c).cloned().unwrap_or(Value::Null))
                .collect(),
        );
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::COMPANY;
    use serde_json::json;

    fn hit(cvr: i64, extra: Value) -> Value {
        let mut entity = json!({"cvrNummer": cvr, "enhedsNummer": cvr * 10});
        if let (Some(e), Some(x)) = (entity.as_object_mut(), extra.as_object()) {
            e.extend(x.clone());
        }
        json!({"_index": "cvr", "_id": cvr.to_string(), "_source": {"Vrvirksomhed": entity}})
    }

    #[test]
    fn test_main_table_excludes_lists_in_any_record() {
        let hits = vec![
            hit(1, json!({"navne": [], "sammensatStatus": "NORMAL"})),
            hit(2, json!({"navne": "oddly scalar", "ukendt": [1]})),
        ];
        let main = main_table(&hits, &COMPANY).unwrap();

        assert_eq!(main.height(), 2);
        let names: Vec<&str> = main.get_column_names().iter().map(|n| n.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "_index",
                "_id",
                "Vrvirksomhed_cvrNummer",
                "Vrvirksomhed_enhedsNummer",
                "Vrvirksomhed_sammensatStatus"
            ]
        );
    }

    #[test]
    fn test_every_rule_has_a_table() {
        let panel = PanelAssembler::new(COMPANY).assemble(&[]).unwrap();
        assert_eq!(panel.len(), 22);
        assert_eq!(panel.names()[0], MAIN_TABLE);
        let navne = panel.get("navne").unwrap();
        assert_eq!(navne.height(), 0);
        assert_eq!(navne.width(), 6);
    }

    #[test]
    fn test_unknown_table() {
        let assembler = PanelAssembler::new(COMPANY);
        assert!(matches!(
            assembler.assemble_table(&[], "nope"),
            Err(crate::PanelError::UnknownTable(_))
        ));
    }
}
