//! Shared domain types.
//!
//! These are the values that flow between the pipeline stages:
//!
//! - raw upstream records become a `SeriesColumn` (one series)
//! - columns are joined into a `MergedTable` (many series, one row per date)
//! - a run ends in a `RunStatus` that is written to the audit log

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// An inclusive date window `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Build a range, returning `None` when `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// One cleaned series: ascending, de-duplicated, forward-filled.
///
/// Leading entries can still be `None` when the series starts with missing
/// observations and there is nothing to fill from.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesColumn {
    pub series_id: String,
    pub points: Vec<(NaiveDate, Option<f64>)>,
}

impl SeriesColumn {
    pub fn empty(series_id: impl Into<String>) -> Self {
        Self {
            series_id: series_id.into(),
            points: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }
}

/// A named column of a `MergedTable`.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// Wide, date-indexed table.
///
/// Invariants:
/// - `dates` is strictly ascending (no duplicate rows)
/// - every column has exactly `dates.len()` values
/// - a row's position in `dates` is its zero-based index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedTable {
    pub(crate) dates: Vec<NaiveDate>,
    pub(crate) columns: Vec<Column>,
}

impl MergedTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from a single cleaned series.
    pub fn from_series(series: SeriesColumn) -> Self {
        let (dates, values) = series.points.into_iter().unzip();
        Self {
            dates,
            columns: vec![Column {
                name: series.series_id,
                values,
            }],
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn row_count(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Value at `(row, column)`, `None` when missing or out of range.
    pub fn value(&self, row: usize, column: &str) -> Option<f64> {
        self.column(column)
            .and_then(|c| c.values.get(row).copied().flatten())
    }

    /// Insert a column, replacing any existing column with the same name.
    ///
    /// The caller guarantees `values.len() == self.row_count()`.
    pub(crate) fn upsert_column(&mut self, name: String, values: Vec<Option<f64>>) {
        debug_assert_eq!(values.len(), self.dates.len());
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.values = values,
            None => self.columns.push(Column { name, values }),
        }
    }
}

/// A `(long, short)` pair producing `"{long}_{short}_spread"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct SpreadPair {
    pub long: String,
    pub short: String,
}

impl SpreadPair {
    pub fn new(long: impl Into<String>, short: impl Into<String>) -> Self {
        Self {
            long: long.into(),
            short: short.into(),
        }
    }

    pub fn column_name(&self) -> String {
        format!("{}_{}_spread", self.long, self.short)
    }
}

impl From<(String, String)> for SpreadPair {
    fn from((long, short): (String, String)) -> Self {
        Self { long, short }
    }
}

impl From<SpreadPair> for (String, String) {
    fn from(pair: SpreadPair) -> Self {
        (pair.long, pair.short)
    }
}

/// Terminal outcome of a load run, as recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// The window was fetched; zero or more rows were appended.
    Success,
    /// The destination was already up to date; nothing was fetched.
    Skipped,
    /// The run aborted; the error message is kept alongside.
    Failed,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Skipped => "skipped",
            RunStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn date_range_rejects_inverted_bounds() {
        assert!(DateRange::new(d(2), d(1)).is_none());
        assert!(DateRange::new(d(1), d(1)).is_some());
    }

    #[test]
    fn spread_pair_deserializes_from_json_tuple() {
        let pair: SpreadPair = serde_json::from_str(r#"["DGS10", "DGS2"]"#).unwrap();
        assert_eq!(pair, SpreadPair::new("DGS10", "DGS2"));
        assert_eq!(pair.column_name(), "DGS10_DGS2_spread");
    }

    #[test]
    fn upsert_replaces_existing_column() {
        let mut table = MergedTable::from_series(SeriesColumn {
            series_id: "DGS10".into(),
            points: vec![(d(1), Some(4.0))],
        });
        table.upsert_column("x".into(), vec![Some(1.0)]);
        table.upsert_column("x".into(), vec![Some(2.0)]);
        assert_eq!(table.columns().len(), 2);
        assert_eq!(table.value(0, "x"), Some(2.0));
    }

    #[test]
    fn run_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&RunStatus::Skipped).unwrap(), "\"skipped\"");
        assert_eq!(RunStatus::Failed.to_string(), "failed");
    }
}
