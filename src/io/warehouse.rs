//! Destination warehouse seam and a CSV-directory implementation.
//!
//! The warehouse owns durability and schema; the pipeline only needs two
//! things from it: the checkpoint (latest loaded date) and append.

use std::fs::{File, OpenOptions, create_dir_all};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::domain::MergedTable;
use crate::error::AppError;
use crate::io::export::{DATE_COLUMN, table_header, write_rows};

pub trait Warehouse {
    /// Human-readable destination id, e.g. `macroDataset.daily_treasury_yields`.
    fn destination(&self, table: &str) -> String;

    /// Maximum date already loaded into `table`; `None` on a first run.
    fn latest_date(&self, table: &str) -> Result<Option<NaiveDate>, AppError>;

    /// Append every row of `data` to `table`; returns the number of rows written.
    fn append(&self, table: &str, data: &MergedTable) -> Result<usize, AppError>;
}

/// Stores each table as `<root>/<dataset>/<table>.csv`.
#[derive(Debug, Clone)]
pub struct CsvWarehouse {
    root: PathBuf,
    dataset: String,
}

impl CsvWarehouse {
    pub fn new(root: impl Into<PathBuf>, dataset: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            dataset: dataset.into(),
        }
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn table_path(&self, table: &str) -> PathBuf {
        self.root.join(&self.dataset).join(format!("{table}.csv"))
    }

    pub(crate) fn ensure_dataset_dir(&self) -> Result<(), AppError> {
        let dir = self.root.join(&self.dataset);
        create_dir_all(&dir)
            .map_err(|e| AppError::warehouse(format!("Failed to create dataset dir '{}': {e}", dir.display())))
    }
}

fn read_header(path: &Path) -> Result<Vec<String>, AppError> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| AppError::warehouse(format!("Failed to open '{}': {e}", path.display())))?;
    let header = reader
        .headers()
        .map_err(|e| AppError::warehouse(format!("Failed to read header of '{}': {e}", path.display())))?;
    Ok(header.iter().map(str::to_string).collect())
}

impl Warehouse for CsvWarehouse {
    fn destination(&self, table: &str) -> String {
        format!("{}.{table}", self.dataset)
    }

    fn latest_date(&self, table: &str) -> Result<Option<NaiveDate>, AppError> {
        let path = self.table_path(table);
        if !path.exists() {
            debug!(path = %path.display(), "destination table does not exist yet");
            return Ok(None);
        }

        let mut reader = csv::Reader::from_path(&path)
            .map_err(|e| AppError::warehouse(format!("Failed to open '{}': {e}", path.display())))?;
        let date_idx = reader
            .headers()
            .map_err(|e| AppError::warehouse(format!("Failed to read header of '{}': {e}", path.display())))?
            .iter()
            .position(|h| h == DATE_COLUMN)
            .ok_or_else(|| AppError::warehouse(format!("Table '{}' has no '{DATE_COLUMN}' column.", path.display())))?;

        let mut latest: Option<NaiveDate> = None;
        for (idx, result) in reader.records().enumerate() {
            // +2: header is line 1, records are 1-based.
            let line = idx + 2;
            let record = result
                .map_err(|e| AppError::warehouse(format!("Bad row at {}:{line}: {e}", path.display())))?;
            let raw = record.get(date_idx).unwrap_or_default();
            let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| {
                AppError::warehouse(format!("Invalid date '{raw}' at {}:{line}: {e}", path.display()))
            })?;
            latest = latest.max(Some(date));
        }
        Ok(latest)
    }

    fn append(&self, table: &str, data: &MergedTable) -> Result<usize, AppError> {
        if data.is_empty() {
            return Ok(0);
        }
        self.ensure_dataset_dir()?;
        let path = self.table_path(table);

        let rows = if path.exists() {
            let header = read_header(&path)?;
            if header.first().map(String::as_str) != Some(DATE_COLUMN) {
                return Err(AppError::warehouse(format!(
                    "Table '{}' must start with a '{DATE_COLUMN}' column.",
                    path.display()
                )));
            }
            if let Some(unknown) = data.column_names().find(|c| !header.iter().any(|h| h == c)) {
                return Err(AppError::warehouse(format!(
                    "Schema mismatch: column '{unknown}' is not in table '{}'.",
                    self.destination(table)
                )));
            }

            let file = OpenOptions::new()
                .append(true)
                .open(&path)
                .map_err(|e| AppError::warehouse(format!("Failed to open '{}' for append: {e}", path.display())))?;
            let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
            write_rows(&mut writer, data, &header[1..])?;
            writer
                .flush()
                .map_err(|e| AppError::warehouse(format!("Failed to flush '{}': {e}", path.display())))?;
            data.row_count()
        } else {
            let file = File::create(&path)
                .map_err(|e| AppError::warehouse(format!("Failed to create '{}': {e}", path.display())))?;
            let mut writer = csv::Writer::from_writer(file);
            let header = table_header(data);
            writer
                .write_record(&header)
                .map_err(|e| AppError::warehouse(format!("Failed to write header of '{}': {e}", path.display())))?;
            write_rows(&mut writer, data, &header[1..])?;
            writer
                .flush()
                .map_err(|e| AppError::warehouse(format!("Failed to flush '{}': {e}", path.display())))?;
            data.row_count()
        };

        info!(destination = %self.destination(table), rows, "appended rows");
        Ok(rows)
    }
}
