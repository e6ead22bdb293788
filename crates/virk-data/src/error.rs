//! Error types for data operations.

use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur during data operations.
#[derive(Debug, Error)]
pub enum DataError {
    /// Network error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Transport failure outside of reqwest (timeouts surfaced by a custom transport)
    #[error("Transport failure: {0}")]
    Transport(String),

    /// Search API answered with a non-success status
    #[error("Search API returned status {status}: {body}")]
    SearchApi {
        /// HTTP status code
        status: u16,
        /// Response body, possibly truncated
        body: String,
    },

    /// Search API response carried no continuation token
    #[error("Search response is missing the scroll id")]
    MissingScrollId,

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(String),

    /// Missing column in an input table
    #[error("Missing column `{0}` in input table")]
    MissingColumn(String),

    /// XML parsing error
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid year range
    #[error("Invalid year range {start}..={end}: years must ascend within 1..=9999")]
    InvalidYearRange {
        /// First year of the range
        start: i32,
        /// Last year of the range
        end: i32,
    },
}

impl From<quick_xml::Error> for DataError {
    fn from(err: quick_xml::Error) -> Self {
        Self::XmlParse(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for DataError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::XmlParse(err.to_string())
    }
}

impl DataError {
    /// Whether the error is a transport failure that may succeed on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Transport(_) => true,
            _ => false,
        }
    }
}
