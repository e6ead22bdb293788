//! Long-to-wide pivot of XBRL facts.
//!
//! One row per entity identifier, one column per tag. When an entity reports
//! the same tag more than once, the first non-null value seen wins and later
//! values are dropped.

use super::parser::FactRecord;
use crate::error::Result;
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// Name of the identifier column of the wide table.
pub const IDENTIFIER_COLUMN: &str = "identifier";

/// Name of the year column appended to the wide table.
pub const YEAR_COLUMN: &str = "Year";

/// Incremental pivot over any number of fact batches.
///
/// Feeding batches in order gives the same table as pivoting their
/// concatenation in one go.
#[derive(Debug, Clone, Default)]
pub struct WidePivot {
    rows: BTreeMap<String, BTreeMap<String, String>>,
    tags: BTreeSet<String>,
    facts_seen: usize,
}

impl WidePivot {
    /// Creates an empty pivot
    pub fn new() -> Self {
        Self::default()
    }

    /// Add facts; facts without identifier or value are ignored.
    pub fn absorb<'a>(&mut self, records: impl IntoIterator<Item = &'a FactRecord>) {
        for record in records {
            self.facts_seen += 1;
            let (Some(identifier), Some(value)) = (&record.identifier, &record.value) else {
                continue;
            };
            let tag = record.tag.trim();
            let row = self.rows.entry(identifier.clone()).or_default();
            if !row.contains_key(tag) {
                row.insert(tag.to_string(), value.clone());
                self.tags.insert(tag.to_string());
            }
        }
    }

    /// Number of entities with at least one value.
    pub fn entity_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of distinct tags with at least one value.
    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    /// Number of facts offered to [`absorb`](Self::absorb).
    pub const fn facts_seen(&self) -> usize {
        self.facts_seen
    }

    /// Whether no value has been absorbed.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value for an entity and tag.
    pub fn get(&self, identifier: &str, tag: &str) -> Option<&str> {
        self.rows.get(identifier)?.get(tag).map(String::as_str)
    }

    /// Build the wide table: `identifier`, one string column per tag in
    /// sorted order, then `Year`.
    pub fn into_frame(self, year: i32) -> Result<DataFrame> {
        let height = self.rows.len();
        let identifiers: Vec<&str> = self.rows.keys().map(String::as_str).collect();

        let mut columns: Vec<Column> = Vec::with_capacity(self.tags.len() + 2);
        columns.push(Column::new(IDENTIFIER_COLUMN.into(), identifiers));

        for tag in &self.tags {
            let values: Vec<Option<&str>> = self
                .rows
                .values()
                .map(|row| row.get(tag).map(String::as_str))
                .collect();
            columns.push(Column::new(tag.as_str().into(), values));
        }

        columns.push(Column::new(YEAR_COLUMN.into(), vec![year; height]));
        Ok(DataFrame::new(columns)?)
    }
}

/// Pivot a set of facts in one call.
pub fn pivot_facts(records: &[FactRecord], year: i32) -> Result<DataFrame> {
    let mut pivot = WidePivot::new();
    pivot.absorb(records);
    pivot.into_frame(year)
}
