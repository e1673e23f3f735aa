//! Multi-series merge: fetch + clean each series, full outer join on date.

use std::cmp::Ordering;

use tracing::{info, warn};

use crate::data::{FetchError, SeriesSource};
use crate::domain::{Column, DateRange, MergedTable, SeriesColumn};
use crate::transform::clean::clean;

/// Result of merging a batch of series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    pub table: MergedTable,
    /// Requested ids that produced no data, in request order.
    pub missing_series: Vec<String>,
}

impl MergeOutcome {
    /// `true` when every requested series came back empty.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Fetch, clean and outer-join `series_ids` over `range`.
///
/// Empty series are recorded in `missing_series` and skipped. A fetch error
/// aborts the whole batch; nothing merged so far is returned.
pub fn merge<S: SeriesSource + ?Sized>(
    source: &S,
    series_ids: &[String],
    range: DateRange,
) -> Result<MergeOutcome, FetchError> {
    let mut table: Option<MergedTable> = None;
    let mut missing_series = Vec::new();

    for series_id in series_ids {
        let raw = source.fetch(series_id, range.start, range.end)?;
        let column = clean(&raw, series_id);

        if column.is_empty() {
            warn!(series_id = %series_id, "skipping merge, no data returned");
            missing_series.push(series_id.clone());
            continue;
        }

        info!(series_id = %series_id, n = column.len(), "merged series");
        table = Some(match table {
            None => MergedTable::from_series(column),
            Some(acc) => acc.outer_join(column),
        });
    }

    let table = table.unwrap_or_default();
    if table.is_empty() {
        warn!(requested = series_ids.len(), "no data could be merged from any series");
    }
    if !missing_series.is_empty() {
        warn!(missing = %missing_series.join(", "), "series had no data and were skipped");
    }

    Ok(MergeOutcome {
        table,
        missing_series,
    })
}

impl MergedTable {
    /// Full outer join of `series` onto this table, keyed by date.
    ///
    /// Rows present on only one side get `None` for the other side's columns.
    pub fn outer_join(self, series: SeriesColumn) -> MergedTable {
        let MergedTable { dates, columns } = self;
        let n_left = dates.len();
        let n_out = n_left + series.points.len();

        let mut out_dates = Vec::with_capacity(n_out);
        // For each output row: index into the left rows and into the right points.
        let mut left_idx: Vec<Option<usize>> = Vec::with_capacity(n_out);
        let mut right_vals: Vec<Option<f64>> = Vec::with_capacity(n_out);

        let (mut i, mut j) = (0, 0);
        while i < n_left || j < series.points.len() {
            let order = match (dates.get(i), series.points.get(j)) {
                (Some(l), Some((r, _))) => l.cmp(r),
                (Some(_), None) => Ordering::Less,
                (None, _) => Ordering::Greater,
            };
            match order {
                Ordering::Less => {
                    out_dates.push(dates[i]);
                    left_idx.push(Some(i));
                    right_vals.push(None);
                    i += 1;
                }
                Ordering::Greater => {
                    let (date, value) = series.points[j];
                    out_dates.push(date);
                    left_idx.push(None);
                    right_vals.push(value);
                    j += 1;
                }
                Ordering::Equal => {
                    out_dates.push(dates[i]);
                    left_idx.push(Some(i));
                    right_vals.push(series.points[j].1);
                    i += 1;
                    j += 1;
                }
            }
        }

        let mut out_columns: Vec<Column> = columns
            .into_iter()
            .map(|c| Column {
                values: left_idx
                    .iter()
                    .map(|idx| idx.and_then(|k| c.values[k]))
                    .collect(),
                name: c.name,
            })
            .collect();
        out_columns.push(Column {
            name: series.series_id,
            values: right_vals,
        });

        MergedTable {
            dates: out_dates,
            columns: out_columns,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::{BTreeSet, HashMap};

    use chrono::NaiveDate;

    use super::*;
    use crate::data::RawObservation;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn range() -> DateRange {
        DateRange::new(d(1), d(31)).unwrap()
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[derive(Default)]
    struct FakeSource {
        series: HashMap<String, Vec<RawObservation>>,
        fail_on: Option<String>,
        calls: RefCell<Vec<String>>,
    }

    impl FakeSource {
        fn with(mut self, id: &str, rows: &[(&str, &str)]) -> Self {
            self.series.insert(
                id.to_string(),
                rows.iter().map(|(d, v)| RawObservation::new(*d, *v)).collect(),
            );
            self
        }
    }

    impl SeriesSource for FakeSource {
        fn name(&self) -> &str {
            "fake"
        }

        fn fetch(
            &self,
            series_id: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<RawObservation>, FetchError> {
            self.calls.borrow_mut().push(series_id.to_string());
            if self.fail_on.as_deref() == Some(series_id) {
                return Err(FetchError::Permanent {
                    series_id: series_id.to_string(),
                    message: "HTTP 400".into(),
                });
            }
            Ok(self.series.get(series_id).cloned().unwrap_or_default())
        }
    }

    #[test]
    fn one_empty_series_out_of_three() {
        let source = FakeSource::default()
            .with("DGS10", &[("2024-01-02", "4.0"), ("2024-01-03", "4.1")])
            .with("DGS2", &[("2024-01-03", "4.3")]);

        let out = merge(&source, &ids(&["DGS10", "DGS30", "DGS2"]), range()).unwrap();
        let names: Vec<&str> = out.table.column_names().collect();
        assert_eq!(names, vec!["DGS10", "DGS2"]);
        assert_eq!(out.missing_series, vec!["DGS30".to_string()]);
        assert_eq!(*source.calls.borrow(), ids(&["DGS10", "DGS30", "DGS2"]));
    }

    #[test]
    fn rows_are_the_union_of_all_input_dates() {
        let source = FakeSource::default()
            .with("A", &[("2024-01-05", "1"), ("2024-01-02", "2")])
            .with("B", &[("2024-01-03", "3"), ("2024-01-05", "4")])
            .with("C", &[("2024-01-09", "5")]);

        let out = merge(&source, &ids(&["A", "B", "C"]), range()).unwrap();
        let expected: BTreeSet<NaiveDate> = [d(2), d(3), d(5), d(9)].into_iter().collect();
        let got: BTreeSet<NaiveDate> = out.table.dates().iter().copied().collect();
        assert_eq!(got, expected);
        assert_eq!(out.table.dates(), &[d(2), d(3), d(5), d(9)]);

        // Missing combinations are explicit gaps, never dropped rows.
        assert_eq!(out.table.value(0, "B"), None);
        assert_eq!(out.table.value(1, "A"), None);
        assert_eq!(out.table.value(2, "A"), Some(1.0));
        assert_eq!(out.table.value(2, "B"), Some(4.0));
        assert_eq!(out.table.value(3, "C"), Some(5.0));
        for column in out.table.columns() {
            assert_eq!(column.values.len(), out.table.row_count());
        }
    }

    #[test]
    fn all_series_empty_yields_empty_table() {
        let source = FakeSource::default();
        let out = merge(&source, &ids(&["X", "Y"]), range()).unwrap();
        assert!(out.is_empty());
        assert_eq!(out.missing_series, ids(&["X", "Y"]));
    }

    #[test]
    fn invalid_records_degrade_to_missing() {
        let source = FakeSource::default()
            .with("A", &[("2024-01-02", "1")])
            .with("B", &[("garbage", "1")]);
        let out = merge(&source, &ids(&["A", "B"]), range()).unwrap();
        assert_eq!(out.missing_series, ids(&["B"]));
        assert_eq!(out.table.row_count(), 1);
    }

    #[test]
    fn fetch_failure_aborts_the_batch() {
        let mut source = FakeSource::default().with("A", &[("2024-01-02", "1")]);
        source.fail_on = Some("B".into());
        let err = merge(&source, &ids(&["A", "B", "C"]), range()).unwrap_err();
        assert!(matches!(err, FetchError::Permanent { .. }));
        assert_eq!(*source.calls.borrow(), ids(&["A", "B"]));
    }
}
