//! Formatted terminal output for runs, windows and table previews.
//!
//! We keep formatting code in one place so the pipeline stays free of
//! presentation concerns.

use chrono::NaiveDate;

use crate::app::incremental::LoadWindow;
use crate::app::pipeline::{RunReport, WindowOutput};
use crate::domain::{DateRange, MergedTable, RunStatus};

/// Summary of an incremental load.
pub fn format_run_report(report: &RunReport, preview: usize) -> String {
    let mut out = String::new();

    out.push_str("=== mp - Treasury yield load ===\n");
    out.push_str(&format!("Destination: {}\n", report.destination));
    out.push_str(&format!("Status: {}\n", report.status));
    match report.status {
        RunStatus::Skipped => {
            out.push_str(&format!(
                "Already up to date (next start {} > today {}).\n",
                report.start_date, report.end_date
            ));
            return out;
        }
        RunStatus::Success | RunStatus::Failed => {
            out.push_str(&format!("Window: {}..={}\n", report.start_date, report.end_date));
            out.push_str(&format!("Rows appended: {}\n", report.row_count));
        }
    }

    out.push_str(&format_window_notes(&report.output));
    if preview > 0 && !report.output.table.is_empty() {
        out.push('\n');
        out.push_str(&format_table_preview(&report.output.table, preview));
    }
    out
}

/// Summary of an ad hoc `fetch`.
pub fn format_window_output(range: DateRange, output: &WindowOutput, preview: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== mp - FRED window {range} ===\n"));
    out.push_str(&format!(
        "Rows: {} | Columns: {}\n",
        output.table.row_count(),
        output.table.columns().len()
    ));
    out.push_str(&format_window_notes(output));
    if output.table.is_empty() {
        out.push_str("No data could be merged from any series.\n");
    } else if preview > 0 {
        out.push('\n');
        out.push_str(&format_table_preview(&output.table, preview));
    }
    out
}

/// What the next load would do.
pub fn format_plan(destination: &str, checkpoint: Option<NaiveDate>, window: &LoadWindow) -> String {
    let mut out = String::new();
    out.push_str(&format!("Destination: {destination}\n"));
    match checkpoint {
        Some(date) => out.push_str(&format!("Checkpoint: {date}\n")),
        None => out.push_str("Checkpoint: none (first load)\n"),
    }
    match window {
        LoadWindow::Fetch(range) => out.push_str(&format!("Next load: {range}\n")),
        LoadWindow::UpToDate { today, .. } => {
            out.push_str(&format!("Next load: nothing to do, up to date as of {today}\n"))
        }
    }
    out
}

fn format_window_notes(output: &WindowOutput) -> String {
    let mut out = String::new();
    if !output.missing_series.is_empty() {
        out.push_str(&format!(
            "Missing series (no data): {}\n",
            output.missing_series.join(", ")
        ));
    }
    for pair in &output.skipped_spreads {
        out.push_str(&format!(
            "Skipped spread {} - {}: missing column(s)\n",
            pair.long, pair.short
        ));
    }
    out
}

/// Head and tail of `table`, `n` rows each, as an aligned text grid.
pub fn format_table_preview(table: &MergedTable, n: usize) -> String {
    let rows = table.row_count();
    let shown: Vec<usize> = if rows <= 2 * n {
        (0..rows).collect()
    } else {
        (0..n).chain(rows - n..rows).collect()
    };

    let headers: Vec<&str> = std::iter::once("date").chain(table.column_names()).collect();
    let widths: Vec<usize> = headers.iter().map(|h| h.len().max(10)).collect();

    let mut out = String::new();
    for (h, w) in headers.iter().zip(&widths) {
        out.push_str(&format!("{h:>w$} "));
    }
    out.push('\n');

    for (k, &row) in shown.iter().enumerate() {
        if k == n && rows > 2 * n {
            out.push_str(&format!("{:>w$} \n", "...", w = widths[0]));
        }
        out.push_str(&format!("{:>w$} ", table.dates()[row].to_string(), w = widths[0]));
        for (column, w) in table.columns().iter().zip(&widths[1..]) {
            let cell = fmt_cell(column.values[row]);
            out.push_str(&format!("{cell:>w$} "));
        }
        out.push('\n');
    }
    out
}

fn fmt_cell(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.4}"),
        None => "-".to_string(),
    }
}
