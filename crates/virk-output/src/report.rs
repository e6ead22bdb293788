//! Run reports for the Virk registry ETL.

use crate::export::WrittenFile;
use chrono::{DateTime, Utc};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A required field was not set on the builder.
    #[error("Missing report field: {0}")]
    MissingField(&'static str),
}

/// Shape of one output table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableShape {
    /// Table name.
    pub name: String,

    /// Row count.
    pub rows: usize,

    /// Column count.
    pub columns: usize,
}

impl TableShape {
    /// Shape of a table.
    pub fn of(name: impl Into<String>, table: &DataFrame) -> Self {
        Self {
            name: name.into(),
            rows: table.height(),
            columns: table.width(),
        }
    }
}

impl From<&WrittenFile> for TableShape {
    fn from(file: &WrittenFile) -> Self {
        Self {
            name: file.dataset.clone(),
            rows: file.rows,
            columns: file.columns,
        }
    }
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Dataset name.
    pub dataset: String,

    /// Report generation timestamp.
    pub timestamp: DateTime<Utc>,

    /// Year filter, `None` for all data.
    pub year: Option<i32>,

    /// Raw records retrieved, or documents offered.
    pub records: usize,

    /// Whether retrieval ran to completion.
    pub complete: bool,

    /// Failure that cut retrieval short.
    pub failure: Option<String>,

    /// Shapes of the output tables.
    pub tables: Vec<TableShape>,

    /// Files written.
    pub files: Vec<PathBuf>,

    /// Dataset-specific details (JSON format).
    pub details: serde_json::Value,
}

impl RunReport {
    /// Create a new report for a completed run.
    pub fn new(dataset: String, year: Option<i32>, records: usize) -> Self {
        Self {
            dataset,
            timestamp: Utc::now(),
            year,
            records,
            complete: true,
            failure: None,
            tables: Vec::new(),
            files: Vec::new(),
            details: serde_json::Value::Null,
        }
    }

    /// Convert report to JSON string.
    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Total rows across all tables.
    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|t| t.rows).sum()
    }

    /// Human readable shape summary, one table per line.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let scope = self
            .year
            .map_or_else(|| "all data".to_string(), |y| format!("year {y}"));
        let _ = writeln!(out, "{} ({scope}): {} records", self.dataset, self.records);
        if let Some(failure) = &self.failure {
            let _ = writeln!(out, "  incomplete: {failure}");
        }
        let width = self.tables.iter().map(|t| t.name.len()).max().unwrap_or(0);
        for table in &self.tables {
            let _ = writeln!(
                out,
                "  - {:<width$}  {:>8} rows x {:>4} columns",
                table.name, table.rows, table.columns
            );
        }
        out
    }

    /// Write the report as pretty JSON.
    pub fn write_to(&self, path: &Path) -> Result<(), ReportError> {
        fs::write(path, self.to_json()?)?;
        info!(path = %path.display(), "wrote run report");
        Ok(())
    }
}

/// Builder for creating reports.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    dataset: Option<String>,
    year: Option<i32>,
    records: usize,
    failure: Option<String>,
    tables: Vec<TableShape>,
    files: Vec<PathBuf>,
    details: Option<serde_json::Value>,
}

impl ReportBuilder {
    /// Create a new report builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the dataset name.
    pub fn dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = Some(dataset.into());
        self
    }

    /// Set the year filter.
    pub const fn year(mut self, year: Option<i32>) -> Self {
        self.year = year;
        self
    }

    /// Set the record count.
    pub const fn records(mut self, records: usize) -> Self {
        self.records = records;
        self
    }

    /// Mark retrieval as cut short.
    pub fn failure(mut self, failure: Option<String>) -> Self {
        self.failure = failure;
        self
    }

    /// Add a table shape.
    pub fn table(mut self, shape: TableShape) -> Self {
        self.tables.push(shape);
        self
    }

    /// Add written files, recording their shapes.
    pub fn files<'a>(mut self, files: impl IntoIterator<Item = &'a WrittenFile>) -> Self {
        for file in files {
            self.tables.push(TableShape::from(file));
            self.files.push(file.path.clone());
        }
        self
    }

    /// Set dataset-specific details.
    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Build the report.
    pub fn build(self) -> Result<RunReport, ReportError> {
        let dataset = self.dataset.ok_or(ReportError::MissingField("dataset"))?;
        let mut report = RunReport::new(dataset, self.year, self.records);
        report.complete = self.failure.is_none();
        report.failure = self.failure;
        report.tables = self.tables;
        report.files = self.files;
        report.details = self.details.unwrap_or(serde_json::Value::Null);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_creation() {
        let report = RunReport::new("virksomhed".to_string(), Some(2023), 10);

        assert_eq!(report.dataset, "virksomhed");
        assert!(report.complete);
        assert_eq!(report.total_rows(), 0);
    }

    #[test]
    fn test_report_builder() {
        let report = ReportBuilder::new()
            .dataset("virksomhed")
            .records(2)
            .failure(Some("scroll request failed".to_string()))
            .table(TableShape {
                name: "main".to_string(),
                rows: 2,
                columns: 40,
            })
            .table(TableShape {
                name: "navne".to_string(),
                rows: 5,
                columns: 6,
            })
            .build()
            .unwrap();

        assert!(!report.complete);
        assert_eq!(report.total_rows(), 7);

        let summary = report.summary();
        assert!(summary.starts_with("virksomhed (all data): 2 records"));
        assert!(summary.contains("incomplete: scroll request failed"));
        assert!(summary.contains("navne"));
    }

    #[test]
    fn test_builder_requires_dataset() {
        assert!(matches!(
            ReportBuilder::new().build(),
            Err(ReportError::MissingField("dataset"))
        ));
    }

    #[test]
    fn test_json_round_trip() {
        let report = ReportBuilder::new()
            .dataset("companies_all_tags")
            .year(Some(2021))
            .details(serde_json::json!({"parsed": 3, "failed": 1}))
            .build()
            .unwrap();

        let parsed: RunReport = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(parsed.year, Some(2021));
        assert_eq!(parsed.details["failed"], 1);
    }
}
