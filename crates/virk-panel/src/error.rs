//! Error types for table assembly.

use thiserror::Error;

/// Result type for table assembly.
pub type Result<T> = std::result::Result<T, PanelError>;

/// Errors that can occur while building tables from raw records.
#[derive(Debug, Error)]
pub enum PanelError {
    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No extraction rule is registered under the name
    #[error("Unknown table: {0}")]
    UnknownTable(String),
}
