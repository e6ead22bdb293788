//! Search request bodies for the distribution API.

use crate::error::{DataError, Result};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Value, json};

/// Field holding the last update timestamp of a company record.
pub const COMPANY_UPDATED_FIELD: &str = "Vrvirksomhed.sidstOpdateret";

/// Start of the accounting period of a published statement.
pub const STATEMENT_PERIOD_START_FIELD: &str = "regnskab.regnskabsperiode.startDato";

/// End of the accounting period of a published statement.
pub const STATEMENT_PERIOD_END_FIELD: &str = "regnskab.regnskabsperiode.slutDato";

/// Inclusive calendar date range used to filter searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    /// First day, inclusive
    pub start: NaiveDate,
    /// Last day, inclusive
    pub end: NaiveDate,
}

impl DateRange {
    /// Range spanning a whole calendar year.
    pub fn year(year: i32) -> Option<Self> {
        Some(Self {
            start: NaiveDate::from_ymd_opt(year, 1, 1)?,
            end: NaiveDate::from_ymd_opt(year, 12, 31)?,
        })
    }

    fn to_range_clause(self, field: &str) -> Value {
        json!({
            "range": {
                field: {
                    "gte": self.start.format("%Y-%m-%d").to_string(),
                    "lte": self.end.format("%Y-%m-%d").to_string(),
                }
            }
        })
    }
}

/// Earliest year accepted in a [`YearRange`].
pub const MIN_YEAR: i32 = 1;

/// Latest year accepted in a [`YearRange`].
pub const MAX_YEAR: i32 = 9999;

/// Inclusive range of calendar years within [`MIN_YEAR`]..=[`MAX_YEAR`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    /// First year
    pub start: i32,
    /// Last year, inclusive
    pub end: i32,
}

impl YearRange {
    /// Range from `start` to `end`, or the single year `start`.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::InvalidYearRange`] when `start` is after `end`
    /// or either bound lies outside [`MIN_YEAR`]..=[`MAX_YEAR`].
    pub const fn new(start: i32, end: Option<i32>) -> Result<Self> {
        let end = match end {
            Some(end) => end,
            None => start,
        };
        if start > end || start < MIN_YEAR || end > MAX_YEAR {
            return Err(DataError::InvalidYearRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Every year of the range, in ascending order.
    pub const fn years(&self) -> std::ops::RangeInclusive<i32> {
        self.start..=self.end
    }

    /// Number of years covered.
    pub const fn len(&self) -> usize {
        self.end.abs_diff(self.start) as usize + 1
    }

    /// Always false; a range covers at least one year.
    pub const fn is_empty(&self) -> bool {
        false
    }
}

/// Body of an initial search request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    /// Page size
    pub size: usize,
    /// Query clause
    pub query: Value,
    /// Sort order, `_doc` for the cheapest scroll
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Vec<String>>,
    /// Ask the server for an exact total count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_total_hits: Option<bool>,
}

impl SearchRequest {
    /// Request with the given page size and query.
    pub const fn new(size: usize, query: Value) -> Self {
        Self {
            size,
            query,
            sort: None,
            track_total_hits: None,
        }
    }

    /// Sort by index order.
    pub fn sorted_by_doc(mut self) -> Self {
        self.sort = Some(vec!["_doc".to_string()]);
        self
    }

    /// Request an exact total hit count.
    pub const fn tracking_total_hits(mut self) -> Self {
        self.track_total_hits = Some(true);
        self
    }
}

/// Query matching every document.
pub fn match_all() -> Value {
    json!({ "match_all": {} })
}

/// Company search: records last updated inside `range`, or all records.
pub fn company_search(range: Option<DateRange>, size: usize) -> SearchRequest {
    let query = range.map_or_else(match_all, |r| r.to_range_clause(COMPANY_UPDATED_FIELD));
    SearchRequest::new(size, query)
        .sorted_by_doc()
        .tracking_total_hits()
}

/// Statement search: accounting periods starting or ending inside `range`.
pub fn statement_search(range: Option<DateRange>, size: usize) -> SearchRequest {
    let query = range.map_or_else(match_all, |r| {
        json!({
            "bool": {
                "should": [
                    r.to_range_clause(STATEMENT_PERIOD_START_FIELD),
                    r.to_range_clause(STATEMENT_PERIOD_END_FIELD),
                ],
                "minimum_should_match": 1
            }
        })
    });
    SearchRequest::new(size, query)
}

/// Body of a scroll continuation request.
pub fn scroll_continuation(keep_alive: &str, scroll_id: &str) -> Value {
    json!({ "scroll": keep_alive, "scroll_id": scroll_id })
}

/// Body of a scroll release request.
pub fn scroll_release(scroll_id: &str) -> Value {
    json!({ "scroll_id": [scroll_id] })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_company_search_for_year() {
        let request = company_search(DateRange::year(2023), 3000);
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["size"], 3000);
        assert_eq!(body["sort"], json!(["_doc"]));
        assert_eq!(body["track_total_hits"], true);
        assert_eq!(
            body["query"]["range"][COMPANY_UPDATED_FIELD]["gte"],
            "2023-01-01"
        );
        assert_eq!(
            body["query"]["range"][COMPANY_UPDATED_FIELD]["lte"],
            "2023-12-31"
        );
    }

    #[test]
    fn test_company_search_without_filter() {
        let body = serde_json::to_value(company_search(None, 10)).unwrap();
        assert_eq!(body["query"], json!({ "match_all": {} }));
    }

    #[test]
    fn test_statement_search_matches_either_period_bound() {
        let body = serde_json::to_value(statement_search(DateRange::year(2021), 3000)).unwrap();
        let should = body["query"]["bool"]["should"].as_array().unwrap();

        assert_eq!(should.len(), 2);
        assert_eq!(body["query"]["bool"]["minimum_should_match"], 1);
        assert!(should[0]["range"][STATEMENT_PERIOD_START_FIELD].is_object());
        assert!(should[1]["range"][STATEMENT_PERIOD_END_FIELD].is_object());
        assert!(body.get("sort").is_none());
    }

    #[test]
    fn test_scroll_bodies() {
        assert_eq!(
            scroll_continuation("5m", "abc"),
            json!({ "scroll": "5m", "scroll_id": "abc" })
        );
        assert_eq!(scroll_release("abc"), json!({ "scroll_id": ["abc"] }));
    }

    #[test]
    fn test_year_range() {
        let range = YearRange::new(2019, Some(2021)).unwrap();
        assert_eq!(range.years().collect::<Vec<_>>(), vec![2019, 2020, 2021]);
        assert_eq!(range.len(), 3);
        assert_eq!(YearRange::new(2020, None).unwrap().len(), 1);
        assert!(matches!(
            YearRange::new(2022, Some(2020)),
            Err(DataError::InvalidYearRange { start: 2022, end: 2020 })
        ));
    }

    #[rstest]
    #[case(i32::MIN, Some(i32::MAX))]
    #[case(0, Some(2020))]
    #[case(2020, Some(10_000))]
    #[case(i32::MAX, None)]
    fn test_year_range_bounds(#[case] start: i32, #[case] end: Option<i32>) {
        assert!(matches!(
            YearRange::new(start, end),
            Err(DataError::InvalidYearRange { .. })
        ));
    }

    #[test]
    fn test_widest_year_range() {
        let range = YearRange::new(MIN_YEAR, Some(MAX_YEAR)).unwrap();
        assert_eq!(range.len(), 9999);
    }
}
