//! Dataset writing for Virk registry tables.
//!
//! Tables are written as parquet, raw record lists as pretty-printed JSON.
//! File names follow one convention:
//!
//! | dataset | file |
//! |---|---|
//! | panel table | `<base>_<table>.parquet` |
//! | wide table | `<base>_wide.parquet` |
//! | raw records | `<base>_raw.json` |
//! | statements | `financial_statements[_<year>].parquet` or `.json` |
//! | statement details | `companies_all_tags_<year>.parquet` |

use polars::prelude::*;
use serde::Serialize;
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

/// Base name of company datasets.
pub const COMPANY_BASE: &str = "virksomhed";

/// Base name of the financial statements dataset.
pub const STATEMENTS_BASE: &str = "financial_statements";

/// Base name of the per-year statement detail tables.
pub const STATEMENT_DETAILS_BASE: &str = "companies_all_tags";

/// Suffix of the wide company table.
pub const WIDE_SUFFIX: &str = "wide";

/// Suffix of raw record dumps.
pub const RAW_SUFFIX: &str = "raw";

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Parquet encoding error.
    #[error("Parquet error: {0}")]
    Polars(#[from] PolarsError),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Columnar parquet file.
    Parquet,

    /// Pretty-printed JSON.
    Json,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Parquet => "parquet",
            Self::Json => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "parquet" => Ok(Self::Parquet),
            "json" => Ok(Self::Json),
            other => Err(ExportError::InvalidFormat(other.to_string())),
        }
    }
}

/// Trait for types that can be exported to a file.
pub trait Exporter {
    /// Write the data to `writer` in the specified format.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::InvalidFormat`] when the data has no encoding in
    /// `format`, or an encoding or IO error.
    fn export_to_writer<W: Write>(&self, writer: W, format: ExportFormat) -> Result<(), ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.export_to_writer(&mut writer, format)?;
        writer.flush()?;
        Ok(())
    }
}

impl Exporter for DataFrame {
    fn export_to_writer<W: Write>(&self, writer: W, format: ExportFormat) -> Result<(), ExportError> {
        match format {
            ExportFormat::Parquet => {
                let mut table = self.clone();
                ParquetWriter::new(writer).finish(&mut table)?;
                Ok(())
            }
            ExportFormat::Json => Err(ExportError::InvalidFormat(
                "tables are written as parquet; write the raw records for JSON".to_string(),
            )),
        }
    }
}

impl Exporter for [Value] {
    fn export_to_writer<W: Write>(&self, writer: W, format: ExportFormat) -> Result<(), ExportError> {
        match format {
            ExportFormat::Json => {
                let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
                let mut serializer = serde_json::Serializer::with_formatter(writer, formatter);
                self.serialize(&mut serializer)?;
                Ok(())
            }
            ExportFormat::Parquet => Err(ExportError::InvalidFormat(
                "raw records are written as JSON".to_string(),
            )),
        }
    }
}

/// One file written by a [`DatasetWriter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenFile {
    /// Dataset name (table name, `wide`, `raw`, ...)
    pub dataset: String,
    /// Full path of the file
    pub path: PathBuf,
    /// Number of rows or records written
    pub rows: usize,
    /// Number of columns, zero for JSON dumps
    pub columns: usize,
}

/// Writes datasets into one output directory.
#[derive(Debug, Clone)]
pub struct DatasetWriter {
    dir: PathBuf,
}

impl DatasetWriter {
    /// Create a writer, creating the directory when it does not exist.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self, ExportError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a file in the output directory.
    pub fn path_for(&self, stem: &str, format: ExportFormat) -> PathBuf {
        self.dir.join(format!("{stem}.{}", format.extension()))
    }

    /// Write a table to `<stem>.parquet`.
    pub fn write_table(&self, stem: &str, dataset: &str, table: &DataFrame) -> Result<WrittenFile, ExportError> {
        let path = self.path_for(stem, ExportFormat::Parquet);
        table.export_to_file(&path, ExportFormat::Parquet)?;
        info!(path = %path.display(), rows = table.height(), columns = table.width(), "wrote table");
        Ok(WrittenFile {
            dataset: dataset.to_string(),
            path,
            rows: table.height(),
            columns: table.width(),
        })
    }

    /// Write raw records to `<stem>.json`.
    pub fn write_records(&self, stem: &str, dataset: &str, records: &[Value]) -> Result<WrittenFile, ExportError> {
        let path = self.path_for(stem, ExportFormat::Json);
        records.export_to_file(&path, ExportFormat::Json)?;
        info!(path = %path.display(), records = records.len(), "wrote raw records");
        Ok(WrittenFile {
            dataset: dataset.to_string(),
            path,
            rows: records.len(),
            columns: 0,
        })
    }

    /// Write every table of a panel to `<base>_<table>.parquet`.
    pub fn write_panel<'a>(
        &self,
        base: &str,
        tables: impl IntoIterator<Item = (&'a str, &'a DataFrame)>,
    ) -> Result<Vec<WrittenFile>, ExportError> {
        tables
            .into_iter()
            .map(|(name, table)| self.write_table(&format!("{base}_{name}"), name, table))
            .collect()
    }

    /// Write the wide table to `<base>_wide.parquet`.
    pub fn write_wide(&self, base: &str, table: &DataFrame) -> Result<WrittenFile, ExportError> {
        self.write_table(&format!("{base}_{WIDE_SUFFIX}"), WIDE_SUFFIX, table)
    }

    /// Write raw records to `<base>_raw.json`.
    pub fn write_raw(&self, base: &str, records: &[Value]) -> Result<WrittenFile, ExportError> {
        self.write_records(&format!("{base}_{RAW_SUFFIX}"), RAW_SUFFIX, records)
    }
}

/// Base name of a company dataset: `virksomhed` or `virksomhed_<year>`.
pub fn company_base(year: Option<i32>) -> String {
    with_year(COMPANY_BASE, year)
}

/// Stem of the statements dataset: `financial_statements[_<year>]`.
pub fn statements_stem(year: Option<i32>) -> String {
    with_year(STATEMENTS_BASE, year)
}

/// Stem of a statement detail table: `companies_all_tags_<year>`.
pub fn statement_details_stem(year: i32) -> String {
    with_year(STATEMENT_DETAILS_BASE, Some(year))
}

fn with_year(base: &str, year: Option<i32>) -> String {
    match year {
        Some(year) => format!("{base}_{year}"),
        None => base.to_string(),
    }
}

/// Read a parquet file into a table.
pub fn read_table(path: &Path) -> Result<DataFrame, ExportError> {
    let file = File::open(path)?;
    Ok(ParquetReader::new(file).finish()?)
}
