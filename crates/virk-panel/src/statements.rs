//! Flattening of financial statement publications.
//!
//! The `dokumenter` list of a publication is replaced by one column per
//! document, named `<dokumentType>_<format>` and holding its URL, e.g.
//! `AARSRAPPORT_xml` or `AARSRAPPORT_pdf`. Everything else is flattened as
//! in the wide table.

use crate::error::Result;
use crate::flatten::{FlatRecord, flatten_into};
use crate::record;
use crate::wide::wide_table_from_records;
use polars::prelude::DataFrame;
use serde_json::{Map, Value};

/// Field of a publication holding its documents.
pub const DOCUMENTS_FIELD: &str = "dokumenter";

/// Short format name of a document MIME type. Unknown types map to `None`.
pub fn document_format(mime_type: &str) -> Option<&'static str> {
    match mime_type {
        "application/xhtml+xml" => Some("html"),
        "application/pdf" => Some("pdf"),
        "application/xml" => Some("xml"),
        "image/tiff" => Some("tiff"),
        _ => None,
    }
}

/// Copy of a publication with its documents spread into URL columns.
///
/// Documents of an unknown MIME type or without a type are dropped. When two
/// documents map to the same column, the later one wins.
pub fn spread_documents(source: &Map<String, Value>) -> Map<String, Value> {
    let mut out: Map<String, Value> = source
        .iter()
        .filter(|(key, _)| key.as_str() != DOCUMENTS_FIELD)
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    let documents = source
        .get(DOCUMENTS_FIELD)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for document in documents {
        let kind = document
            .get("dokumentType")
            .and_then(Value::as_str)
            .unwrap_or("UNKNOWN");
        let format = document
            .get("dokumentMimeType")
            .and_then(Value::as_str)
            .and_then(document_format);
        let Some(format) = format.filter(|_| !kind.is_empty()) else {
            continue;
        };
        let url = document
            .get("dokumentUrl")
            .cloned()
            .unwrap_or_else(|| Value::String(String::new()));
        out.insert(format!("{kind}_{format}"), url);
    }
    out
}

/// Flatten one publication hit: metadata first, then the spread source.
pub fn flatten_statement(hit: &Value) -> FlatRecord {
    let mut out = record::metadata(hit);
    if let Some(source) = record::source(hit) {
        flatten_into(None, &spread_documents(source), &mut out);
    }
    out
}

/// Wide statements table of a batch of publication hits.
pub fn statements_table(hits: &[Value]) -> Result<DataFrame> {
    let records: Vec<FlatRecord> = hits.iter().map(flatten_statement).collect();
    wide_table_from_records(&records)
}
