//! Series source trait and structured fetch errors.
//!
//! `SeriesSource` abstracts over the upstream time-series API so the merger
//! can run against FRED in production and against fakes in tests.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One upstream record, exactly as delivered.
///
/// Both fields are optional so that a malformed record can be represented
/// (and rejected by the cleaner) instead of failing the whole response decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawObservation {
    pub date: Option<String>,
    pub value: Option<String>,
}

impl RawObservation {
    pub fn new(date: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            date: Some(date.into()),
            value: Some(value.into()),
        }
    }
}

/// Structured error types for fetch operations.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Upstream temporarily unavailable (503, 429, timeouts...). Safe to retry.
    #[error("transient upstream failure for {series_id}: {message}")]
    Transient { series_id: String, message: String },

    /// Authorization failure, unknown series, malformed request. Never retried.
    #[error("upstream rejected request for {series_id}: {message}")]
    Permanent { series_id: String, message: String },

    #[error("failed to decode response for {series_id}: {message}")]
    Decode { series_id: String, message: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("giving up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<FetchError> },
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transient { .. })
    }
}

/// Trait for upstream time-series sources.
///
/// Credentials are bound at construction; a call only names the series and
/// the window. Implementations must not retry on their own.
pub trait SeriesSource {
    fn name(&self) -> &str;

    fn fetch(
        &self,
        series_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawObservation>, FetchError>;
}

impl<S: SeriesSource + ?Sized> SeriesSource for &S {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch(
        &self,
        series_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawObservation>, FetchError> {
        (**self).fetch(series_id, start, end)
    }
}

/// Validate the arguments shared by every source implementation.
pub fn check_request(series_id: &str, start: NaiveDate, end: NaiveDate) -> Result<(), FetchError> {
    if series_id.trim().is_empty() {
        return Err(FetchError::InvalidRequest("series id must not be empty".into()));
    }
    if start > end {
        return Err(FetchError::InvalidRequest(format!(
            "start date {start} is after end date {end} for {series_id}"
        )));
    }
    Ok(())
}
