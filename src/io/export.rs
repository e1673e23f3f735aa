//! Write a merged table to CSV.
//!
//! Layout: a `date` column followed by one column per series/spread. Missing
//! values are empty cells.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::MergedTable;
use crate::error::AppError;

pub const DATE_COLUMN: &str = "date";

/// Write `table` (with header) to a new CSV file at `path`.
pub fn write_table_csv(path: &Path, table: &MergedTable) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::warehouse(format!("Failed to create export CSV '{}': {e}", path.display())))?;
    let mut writer = csv::Writer::from_writer(file);

    let header = table_header(table);
    writer
        .write_record(&header)
        .map_err(|e| AppError::warehouse(format!("Failed to write export CSV header: {e}")))?;
    write_rows(&mut writer, table, &header[1..])?;
    writer
        .flush()
        .map_err(|e| AppError::warehouse(format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

pub fn table_header(table: &MergedTable) -> Vec<String> {
    std::iter::once(DATE_COLUMN.to_string())
        .chain(table.column_names().map(str::to_string))
        .collect()
}

/// Write every row of `table`, laying values out in `columns` order.
///
/// Columns named in `columns` but absent from the table are left blank.
pub(crate) fn write_rows<W: Write>(
    writer: &mut csv::Writer<W>,
    table: &MergedTable,
    columns: &[String],
) -> Result<(), AppError> {
    let lookup: Vec<Option<&[Option<f64>]>> = columns
        .iter()
        .map(|name| table.column(name).map(|c| c.values.as_slice()))
        .collect();

    let mut record = Vec::with_capacity(columns.len() + 1);
    for (row, date) in table.dates().iter().enumerate() {
        record.clear();
        record.push(date.to_string());
        for values in &lookup {
            let cell = values
                .and_then(|v| v[row])
                .map(|v| v.to_string())
                .unwrap_or_default();
            record.push(cell);
        }
        writer
            .write_record(&record)
            .map_err(|e| AppError::warehouse(format!("Failed to write CSV row: {e}")))?;
    }
    Ok(())
}
