//! Batch-wide column schema inference.
//!
//! Building a table is a two pass operation: first every record of the batch
//! is observed to learn the union of column names, the narrowest common type
//! of each column and whether any record holds a list in it; only then are
//! rows assembled against the finished schema.

use crate::flatten::FlatRecord;
use serde_json::Value;
use std::collections::HashMap;

/// Storage type inferred for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    /// Only nulls observed
    Null,
    /// Booleans
    Bool,
    /// Integers representable as `i64`
    Int,
    /// Any number that is not an `i64`
    Float,
    /// Strings, or values of mixed kinds rendered as text
    Text,
}

impl ColumnKind {
    /// Kind of a single value. Arrays and objects are rendered as text.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Number(n) if n.is_i64() => Self::Int,
            Value::Number(_) => Self::Float,
            Value::String(_) | Value::Array(_) | Value::Object(_) => Self::Text,
        }
    }

    /// Narrowest kind able to hold values of both kinds.
    pub fn merge(self, other: Self) -> Self {
        match (self, other) {
            (Self::Null, kind) | (kind, Self::Null) => kind,
            (Self::Int, Self::Float) | (Self::Float, Self::Int) => Self::Float,
            (a, b) if a == b => a,
            _ => Self::Text,
        }
    }

    /// Fold the kinds of several values.
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a Value>) -> Self {
        values
            .into_iter()
            .fold(Self::Null, |kind, value| kind.merge(Self::of(value)))
    }
}

/// What the first pass learned about one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    /// Column name
    pub name: String,
    /// Common kind of every non-null value
    pub kind: ColumnKind,
    /// Whether at least one record holds an array here
    pub holds_list: bool,
}

/// Union schema of a batch of flattened records.
#[derive(Debug, Clone, Default)]
pub struct BatchSchema {
    columns: Vec<ColumnSchema>,
    index: HashMap<String, usize>,
}

impl BatchSchema {
    /// Creates an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe every record of a batch.
    pub fn scan<'a>(records: impl IntoIterator<Item = &'a FlatRecord>) -> Self {
        let mut schema = Self::new();
        for record in records {
            schema.observe_record(record);
        }
        schema
    }

    /// Observe one record.
    pub fn observe_record(&mut self, record: &FlatRecord) {
        for (name, value) in record {
            self.observe(name, value);
        }
    }

    /// Observe one value of a column, registering the column on first sight.
    pub fn observe(&mut self, name: &str, value: &Value) {
        let position = match self.index.get(name) {
            Some(&position) => position,
            None => {
                self.columns.push(ColumnSchema {
                    name: name.to_string(),
                    kind: ColumnKind::Null,
                    holds_list: false,
                });
                self.index.insert(name.to_string(), self.columns.len() - 1);
                self.columns.len() - 1
            }
        };
        let column = &mut self.columns[position];
        column.kind = column.kind.merge(ColumnKind::of(value));
        column.holds_list |= value.is_array();
    }

    /// Every column in first-seen order.
    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    /// Schema of one column.
    pub fn get(&self, name: &str) -> Option<&ColumnSchema> {
        self.index.get(name).map(|&i| &self.columns[i])
    }

    /// Columns that never hold a list, in first-seen order.
    pub fn scalar_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| !c.holds_list)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Columns holding a list in at least one record.
    pub fn list_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.holds_list)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Number of columns observed.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether nothing has been observed.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
