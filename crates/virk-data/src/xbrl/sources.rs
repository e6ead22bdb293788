//! Selection of XBRL document URLs from the statements table.

use super::parser::parse_xbrl_date;
use crate::error::{DataError, Result};
use chrono::Datelike;
use polars::prelude::*;
use std::collections::HashSet;

/// Column holding the XBRL annual report URL.
pub const ANNUAL_REPORT_XML_COLUMN: &str = "AARSRAPPORT_xml";

/// Candidate columns for the accounting period end, in order of preference.
pub const PERIOD_END_COLUMNS: &[&str] = &[
    "regnskab_regnskabsperiode_slutDato",
    "regnskabsperiode_slutDato",
];

fn string_column(df: &DataFrame, name: &str) -> Result<StringChunked> {
    let column = df.column(name)?.cast(&DataType::String)?;
    Ok(column.str()?.clone())
}

/// Distinct annual report URLs whose accounting period ends in `year`,
/// in order of first appearance.
///
/// # Errors
///
/// Returns [`DataError::MissingColumn`] when the table has no URL column or
/// no period end column.
pub fn document_urls_for_year(statements: &DataFrame, year: i32) -> Result<Vec<String>> {
    let schema = statements.schema();
    if !schema.contains(ANNUAL_REPORT_XML_COLUMN) {
        return Err(DataError::MissingColumn(
            ANNUAL_REPORT_XML_COLUMN.to_string(),
        ));
    }
    let period_column = PERIOD_END_COLUMNS
        .iter()
        .find(|name| schema.contains(name))
        .ok_or_else(|| DataError::MissingColumn(PERIOD_END_COLUMNS[0].to_string()))?;

    let urls = string_column(statements, ANNUAL_REPORT_XML_COLUMN)?;
    let period_end = string_column(statements, period_column)?;

    let mut seen = HashSet::new();
    let selected = urls
        .into_iter()
        .zip(period_end.into_iter())
        .filter_map(|(url, end)| {
            let url = url.filter(|u| !u.trim().is_empty())?;
            let end = parse_xbrl_date(end?)?;
            (end.year() == year).then_some(url)
        })
        .filter(|url| seen.insert(*url))
        .map(str::to_string)
        .collect();

    Ok(selected)
}
