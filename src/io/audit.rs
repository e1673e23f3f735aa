//! Load audit log: one row per run, whatever the outcome.

use std::fs::OpenOptions;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::RunStatus;
use crate::error::AppError;
use crate::io::warehouse::CsvWarehouse;

pub const AUDIT_TABLE: &str = "load_audit_log";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub project_id: String,
    pub dataset_id: String,
    pub table_name: String,
    pub source: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub row_count: usize,
    pub status: RunStatus,
    pub error_message: Option<String>,
    /// `;`-separated ids of series that returned no data.
    pub missing_series: String,
    pub load_time: DateTime<Utc>,
}

pub trait AuditSink {
    fn record(&self, entry: &AuditRecord) -> Result<(), AppError>;
}

impl AuditSink for CsvWarehouse {
    fn record(&self, entry: &AuditRecord) -> Result<(), AppError> {
        self.ensure_dataset_dir()?;
        let path = self.table_path(AUDIT_TABLE);
        let is_new = !path.exists();

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| AppError::warehouse(format!("Failed to open audit log '{}': {e}", path.display())))?;
        let mut writer = csv::WriterBuilder::new().has_headers(is_new).from_writer(file);
        writer
            .serialize(entry)
            .map_err(|e| AppError::warehouse(format!("Failed to write audit entry: {e}")))?;
        writer
            .flush()
            .map_err(|e| AppError::warehouse(format!("Failed to flush audit log: {e}")))?;

        info!(status = %entry.status, rows = entry.row_count, "audit log entry inserted");
        Ok(())
    }
}
