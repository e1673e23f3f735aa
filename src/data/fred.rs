//! FRED API integration for daily yield series.

use chrono::NaiveDate;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::debug;

use crate::data::source::{FetchError, RawObservation, SeriesSource, check_request};
use crate::error::AppError;

pub const BASE_URL: &str = "https://api.stlouisfed.org/fred/series/observations";
pub const API_KEY_VAR: &str = "FRED_API_KEY";

pub struct FredClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl FredClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: BASE_URL.to_string(),
        }
    }

    /// Read the API key from the environment (a `.env` file is honoured).
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let api_key = std::env::var(API_KEY_VAR)
            .map_err(|_| AppError::config(format!("Missing {API_KEY_VAR} in environment (.env).")))?;
        if api_key.trim().is_empty() {
            return Err(AppError::config(format!("{API_KEY_VAR} is empty.")));
        }
        Ok(Self::new(api_key))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn fetch_series(
        &self,
        series_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawObservation>, FetchError> {
        check_request(series_id, start, end)?;

        let start = start.to_string();
        let end = end.to_string();
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("series_id", series_id),
                ("api_key", self.api_key.as_str()),
                ("file_type", "json"),
                ("sort_order", "asc"),
                ("observation_start", start.as_str()),
                ("observation_end", end.as_str()),
            ])
            .send()
            .map_err(|e| {
                // Strip the URL so the API key never ends up in logs or audit rows.
                let transient = e.is_connect() || e.is_timeout();
                let message = format!("FRED request failed: {}", e.without_url());
                if transient {
                    FetchError::Transient { series_id: series_id.to_string(), message }
                } else {
                    FetchError::Permanent { series_id: series_id.to_string(), message }
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(classify_status(series_id, status, &body));
        }

        let body = resp.text().map_err(|e| FetchError::Decode {
            series_id: series_id.to_string(),
            message: e.without_url().to_string(),
        })?;
        let observations = parse_observations(series_id, &body)?;
        debug!(series_id, n = observations.len(), "fetched FRED observations");
        Ok(observations)
    }
}

impl SeriesSource for FredClient {
    fn name(&self) -> &str {
        "fred"
    }

    fn fetch(
        &self,
        series_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawObservation>, FetchError> {
        self.fetch_series(series_id, start, end)
    }
}

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    #[serde(default)]
    observations: Vec<RawObservation>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error_message: String,
}

fn parse_observations(series_id: &str, body: &str) -> Result<Vec<RawObservation>, FetchError> {
    let parsed: ObservationsResponse = serde_json::from_str(body).map_err(|e| FetchError::Decode {
        series_id: series_id.to_string(),
        message: format!("Failed to parse FRED response: {e}"),
    })?;
    Ok(parsed.observations)
}

/// Map a non-success HTTP status onto the fetch error taxonomy.
fn classify_status(series_id: &str, status: StatusCode, body: &str) -> FetchError {
    let detail = serde_json::from_str::<ErrorResponse>(body)
        .map(|e| format!(": {}", e.error_message))
        .unwrap_or_default();
    let message = format!("FRED request failed with status {status}{detail}");
    let series_id = series_id.to_string();

    match status {
        StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::BAD_GATEWAY
        | StatusCode::GATEWAY_TIMEOUT
        | StatusCode::TOO_MANY_REQUESTS => FetchError::Transient { series_id, message },
        _ => FetchError::Permanent { series_id, message },
    }
}
