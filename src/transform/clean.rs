//! Raw observations -> one cleaned, forward-filled series.

use chrono::NaiveDate;
use tracing::warn;

use crate::data::RawObservation;
use crate::domain::SeriesColumn;

/// Upstream marker for "no observation on this date".
pub const MISSING_SENTINEL: &str = ".";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Clean raw records for `series_id`.
///
/// An empty result is the "series not found" signal: it is returned for an
/// empty input and for structurally invalid input (a record without a date
/// or value field, or with an unparseable date). It is never an error.
pub fn clean(raw: &[RawObservation], series_id: &str) -> SeriesColumn {
    if raw.is_empty() {
        warn!(series_id, "no data returned for series");
        return SeriesColumn::empty(series_id);
    }

    let mut points = Vec::with_capacity(raw.len());
    for obs in raw {
        let (Some(date), Some(value)) = (obs.date.as_deref(), obs.value.as_deref()) else {
            warn!(series_id, "record without date/value field, treating series as empty");
            return SeriesColumn::empty(series_id);
        };
        let Ok(date) = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT) else {
            warn!(series_id, date, "unparseable observation date, treating series as empty");
            return SeriesColumn::empty(series_id);
        };
        points.push((date, parse_value(value)));
    }

    // Stable sort, then keep the last record seen for a repeated date.
    points.sort_by_key(|(d, _)| *d);
    let mut deduped: Vec<(NaiveDate, Option<f64>)> = Vec::with_capacity(points.len());
    for (date, value) in points {
        match deduped.last_mut() {
            Some(last) if last.0 == date => last.1 = value,
            _ => deduped.push((date, value)),
        }
    }

    forward_fill(&mut deduped);

    SeriesColumn {
        series_id: series_id.to_string(),
        points: deduped,
    }
}

/// Coerce an upstream value string to a number; sentinels and junk become `None`.
pub fn parse_value(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed == MISSING_SENTINEL || trimmed.is_empty() {
        return None;
    }
    let v = trimmed.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

fn forward_fill(points: &mut [(NaiveDate, Option<f64>)]) {
    let mut last = None;
    for (_, value) in points.iter_mut() {
        match value {
            Some(v) => last = Some(*v),
            None => *value = last,
        }
    }
}

impl SeriesColumn {
    /// Render the column back into upstream records (missing values as the sentinel).
    pub fn to_raw(&self) -> Vec<RawObservation> {
        self.points
            .iter()
            .map(|(date, value)| {
                let value = value.map_or_else(|| MISSING_SENTINEL.to_string(), |v| v.to_string());
                RawObservation::new(date.format(DATE_FORMAT).to_string(), value)
            })
            .collect()
    }
}
