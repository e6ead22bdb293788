//! XBRL annual report extraction.
//!
//! This module turns the annual report URLs listed in the statements table
//! into one wide table per year:
//! - URL selection by accounting period end
//! - Batched concurrent download
//! - Instance parsing into facts joined with their contexts
//! - Year filter and first-value-wins pivot
//!
//! # Example
//!
//! ```no_run
//! use virk_data::config::HttpConfig;
//! use virk_data::xbrl::{DocumentClient, XbrlBatchTransformer, document_urls_for_year};
//! use polars::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let statements = ParquetReader::new(std::fs::File::open("financial_statements.parquet")?).finish()?;
//!     let urls = document_urls_for_year(&statements, 2023)?;
//!
//!     let transformer = XbrlBatchTransformer::new(DocumentClient::new(&HttpConfig::default())?, 1000);
//!     let result = transformer.transform_year(&urls, 2023, None).await?;
//!     println!("Parsed {} of {} documents", result.parsed, result.documents);
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod parser;
pub mod pivot;
pub mod sources;

pub use batch::{
    DEFAULT_BATCH_SIZE, DocumentClient, DocumentSource, XbrlBatchTransformer, YearTransform,
};
pub use parser::{FactRecord, XbrlContext, XbrlDocument, XbrlFact, parse_xbrl_date};
pub use pivot::{IDENTIFIER_COLUMN, WidePivot, YEAR_COLUMN, pivot_facts};
pub use sources::{ANNUAL_REPORT_XML_COLUMN, document_urls_for_year};
