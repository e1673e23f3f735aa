//! Pipeline configuration.
//!
//! A run is described by a JSON file (series to load, spreads to derive,
//! destination names, epoch) plus the FRED credential from the environment.
//! Nothing is read from module-level state: the resolved `PipelineConfig` is
//! passed explicitly to every component that needs it.

use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use crate::data::RetryPolicy;
use crate::domain::SpreadPair;
use crate::error::AppError;

pub const DEFAULT_CONFIG_PATH: &str = "config.json";

const DEFAULT_SERIES: &[&str] = &[
    "DGS1MO", "DGS3MO", "DGS6MO", "DGS1", "DGS2", "DGS5", "DGS10", "DGS30",
];
const DEFAULT_SPREADS: &[(&str, &str)] = &[("DGS10", "DGS2"), ("DGS10", "DGS3MO"), ("DGS30", "DGS5")];

/// Start of history loaded on the first run (no checkpoint yet).
pub fn default_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1968, 1, 1).unwrap_or(NaiveDate::MIN)
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub series_ids: Vec<String>,
    pub spreads: Vec<SpreadPair>,
    pub observation_start: NaiveDate,
    /// Default end date for ad hoc pulls; incremental loads always run to "today".
    pub observation_end: Option<NaiveDate>,
    pub project: String,
    pub dataset: String,
    pub table: String,
    pub retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            series_ids: DEFAULT_SERIES.iter().map(|s| s.to_string()).collect(),
            spreads: DEFAULT_SPREADS
                .iter()
                .map(|(l, s)| SpreadPair::new(*l, *s))
                .collect(),
            observation_start: default_epoch(),
            observation_end: None,
            project: "macropipeline".to_string(),
            dataset: "macroDataset".to_string(),
            table: "daily_treasury_yields".to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    series_ids: Option<Vec<String>>,
    spreads: Option<Vec<SpreadPair>>,
    #[serde(rename = "dateRange")]
    date_range: Option<DateRangeFile>,
    project: Option<String>,
    dataset: Option<String>,
    table: Option<String>,
    max_attempts: Option<u32>,
    retry_base_delay_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct DateRangeFile {
    observation_start: Option<NaiveDate>,
    observation_end: Option<NaiveDate>,
}

impl PipelineConfig {
    /// Load from `path`, or from `./config.json` when present, or defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let path: PathBuf = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_PATH);
                if !default.exists() {
                    info!("no {DEFAULT_CONFIG_PATH} found, using built-in series list");
                    return Ok(Self::default());
                }
                default
            }
        };

        let file = File::open(&path)
            .map_err(|e| AppError::config(format!("Failed to open config '{}': {e}", path.display())))?;
        let parsed: ConfigFile = serde_json::from_reader(file)
            .map_err(|e| AppError::config(format!("Invalid config '{}': {e}", path.display())))?;
        let config = Self::from_file(parsed);
        config.validate()?;
        info!(path = %path.display(), series = config.series_ids.len(), "loaded config");
        Ok(config)
    }

    /// Parse a config from a JSON string (same schema as the file).
    pub fn from_json(json: &str) -> Result<Self, AppError> {
        let parsed: ConfigFile =
            serde_json::from_str(json).map_err(|e| AppError::config(format!("Invalid config: {e}")))?;
        let config = Self::from_file(parsed);
        config.validate()?;
        Ok(config)
    }

    fn from_file(file: ConfigFile) -> Self {
        let defaults = Self::default();
        let date_range = file.date_range.unwrap_or_default();
        let mut retry = defaults.retry;
        if let Some(n) = file.max_attempts {
            retry.max_attempts = n;
        }
        if let Some(ms) = file.retry_base_delay_ms {
            retry.base_delay = Duration::from_millis(ms);
        }

        Self {
            series_ids: file.series_ids.unwrap_or(defaults.series_ids),
            spreads: file.spreads.unwrap_or(defaults.spreads),
            observation_start: date_range.observation_start.unwrap_or(defaults.observation_start),
            observation_end: date_range.observation_end,
            project: file.project.unwrap_or(defaults.project),
            dataset: file.dataset.unwrap_or(defaults.dataset),
            table: file.table.unwrap_or(defaults.table),
            retry,
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.series_ids.is_empty() {
            return Err(AppError::config("Config must list at least one series id."));
        }
        let mut seen = HashSet::new();
        for id in &self.series_ids {
            if id.trim().is_empty() {
                return Err(AppError::config("Series ids must not be empty."));
            }
            if !seen.insert(id.as_str()) {
                return Err(AppError::config(format!("Duplicate series id '{id}' in config.")));
            }
        }
        for pair in &self.spreads {
            if pair.long.trim().is_empty() || pair.short.trim().is_empty() {
                return Err(AppError::config("Spread pairs must name two series."));
            }
        }
        for (label, name) in [("project", &self.project), ("dataset", &self.dataset), ("table", &self.table)] {
            if !is_identifier(name) {
                return Err(AppError::config(format!(
                    "Invalid {label} name '{name}' (use letters, digits, '_' or '-')."
                )));
            }
        }
        if self.retry.max_attempts == 0 {
            return Err(AppError::config("max_attempts must be at least 1."));
        }
        if let Some(end) = self.observation_end {
            if end < self.observation_start {
                return Err(AppError::config(format!(
                    "observationEnd {end} is before observationStart {}.",
                    self.observation_start
                )));
            }
        }
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
