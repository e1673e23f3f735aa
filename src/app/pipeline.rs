//! Shared load pipeline used by the CLI subcommands.
//!
//! checkpoint -> window -> fetch/clean/merge -> spreads -> append -> audit
//!
//! Every terminal outcome of `run_load` (success, skipped, failed) writes
//! exactly one audit record before returning.

use chrono::{NaiveDate, Utc};
use tracing::{error, info, warn};

use crate::app::incremental::{LoadWindow, plan_window};
use crate::config::PipelineConfig;
use crate::data::{FetchError, SeriesSource};
use crate::domain::{DateRange, MergedTable, RunStatus, SpreadPair};
use crate::error::AppError;
use crate::io::{AuditRecord, AuditSink, Warehouse};
use crate::transform::{add_spreads, merge};

/// Merged + spread-enriched data for one window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowOutput {
    pub table: MergedTable,
    pub missing_series: Vec<String>,
    pub skipped_spreads: Vec<SpreadPair>,
}

/// Fetch, merge and derive spreads for a fixed window. No checkpoint, no upload.
pub fn run_window<S: SeriesSource + ?Sized>(
    source: &S,
    series_ids: &[String],
    spreads: &[SpreadPair],
    range: DateRange,
) -> Result<WindowOutput, FetchError> {
    info!(source = source.name(), %range, series = series_ids.len(), "fetching window");
    let merged = merge(source, series_ids, range)?;

    if merged.table.is_empty() {
        return Ok(WindowOutput {
            table: merged.table,
            missing_series: merged.missing_series,
            skipped_spreads: Vec::new(),
        });
    }

    let (table, skipped_spreads) = add_spreads(merged.table, spreads);
    Ok(WindowOutput {
        table,
        missing_series: merged.missing_series,
        skipped_spreads,
    })
}

/// Outcome of an incremental load that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub status: RunStatus,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub row_count: usize,
    /// Rows that were appended (empty when skipped or nothing came back).
    pub output: WindowOutput,
}

/// Run one incremental load of `config.table`.
pub fn run_load<S, W, A>(
    source: &S,
    warehouse: &W,
    audit: &A,
    config: &PipelineConfig,
    today: NaiveDate,
) -> Result<RunReport, AppError>
where
    S: SeriesSource + ?Sized,
    W: Warehouse + ?Sized,
    A: AuditSink + ?Sized,
{
    let destination = warehouse.destination(&config.table);

    let window = match warehouse.latest_date(&config.table) {
        Ok(last_loaded) => {
            info!(%destination, checkpoint = ?last_loaded, "read checkpoint");
            plan_window(last_loaded, today, config.observation_start)
        }
        Err(err) => {
            let entry = audit_entry(source, config, (config.observation_start, today), Err(&err));
            return finish(audit, &entry, Err(err));
        }
    };
    let bounds = window.bounds();

    let result = match window {
        LoadWindow::UpToDate { last_loaded, .. } => {
            info!(%destination, %last_loaded, "data up to date");
            Ok(RunReport {
                status: RunStatus::Skipped,
                destination,
                start_date: bounds.0,
                end_date: bounds.1,
                row_count: 0,
                output: WindowOutput::default(),
            })
        }
        LoadWindow::Fetch(range) => load_range(source, warehouse, config, range).map(|output| {
            let row_count = output.table.row_count();
            RunReport {
                status: RunStatus::Success,
                destination,
                start_date: range.start,
                end_date: range.end,
                row_count,
                output,
            }
        }),
    };

    let entry = audit_entry(source, config, bounds, result.as_ref());
    finish(audit, &entry, result)
}

fn load_range<S, W>(
    source: &S,
    warehouse: &W,
    config: &PipelineConfig,
    range: DateRange,
) -> Result<WindowOutput, AppError>
where
    S: SeriesSource + ?Sized,
    W: Warehouse + ?Sized,
{
    let output = run_window(source, &config.series_ids, &config.spreads, range)?;
    if output.table.is_empty() {
        warn!(%range, "nothing to upload");
        return Ok(output);
    }
    warehouse.append(&config.table, &output.table)?;
    Ok(output)
}

fn audit_entry<S: SeriesSource + ?Sized>(
    source: &S,
    config: &PipelineConfig,
    (start_date, end_date): (NaiveDate, NaiveDate),
    result: Result<&RunReport, &AppError>,
) -> AuditRecord {
    let (status, row_count, error_message, missing) = match result {
        Ok(report) => (
            report.status,
            report.row_count,
            None,
            report.output.missing_series.join(";"),
        ),
        Err(err) => (RunStatus::Failed, 0, Some(err.message().to_string()), String::new()),
    };
    AuditRecord {
        project_id: config.project.clone(),
        dataset_id: config.dataset.clone(),
        table_name: config.table.clone(),
        source: source.name().to_string(),
        start_date,
        end_date,
        row_count,
        status,
        error_message,
        missing_series: missing,
        load_time: Utc::now(),
    }
}

/// Write the audit entry, then hand back the run result.
///
/// A failed run keeps its own error even if the audit write also fails.
fn finish<A: AuditSink + ?Sized>(
    audit: &A,
    entry: &AuditRecord,
    result: Result<RunReport, AppError>,
) -> Result<RunReport, AppError> {
    let audited = audit.record(entry);
    match (result, audited) {
        (Ok(report), Ok(())) => Ok(report),
        (Ok(_), Err(audit_err)) => Err(audit_err),
        (Err(err), audited) => {
            if let Err(audit_err) = audited {
                error!(error = %audit_err, "failed to record audit entry for failed run");
            }
            error!(error = %err, "load failed");
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::time::Duration;

    use super::*;
    use crate::data::{RawObservation, RetryPolicy, Retrying};
    use crate::error::{EXIT_FETCH, EXIT_WAREHOUSE};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    enum Behaviour {
        Data(HashMap<String, Vec<RawObservation>>),
        AlwaysUnavailable,
    }

    struct FakeSource {
        behaviour: Behaviour,
        calls: Cell<u32>,
    }

    impl FakeSource {
        fn data(series: &[(&str, &[(&str, &str)])]) -> Self {
            let map = series
                .iter()
                .map(|(id, rows)| {
                    let obs: Vec<RawObservation> = rows.iter().map(|(d, v)| RawObservation::new(*d, *v)).collect();
                    (id.to_string(), obs)
                })
                .collect();
            Self { behaviour: Behaviour::Data(map), calls: Cell::new(0) }
        }

        fn unavailable() -> Self {
            Self { behaviour: Behaviour::AlwaysUnavailable, calls: Cell::new(0) }
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
            self.calls.set(self.calls.get() + 1);
            match &self.behaviour {
                Behaviour::Data(map) => Ok(map.get(series_id).cloned().unwrap_or_default()),
                Behaviour::AlwaysUnavailable => Err(FetchError::Transient {
                    series_id: series_id.to_string(),
                    message: "FRED request failed with status 503 Service Unavailable".into(),
                }),
            }
        }
    }

    #[derive(Default)]
    struct MemoryWarehouse {
        checkpoint: Option<NaiveDate>,
        broken: bool,
        appended: RefCell<Vec<MergedTable>>,
    }

    impl Warehouse for MemoryWarehouse {
        fn destination(&self, table: &str) -> String {
            format!("mem.{table}")
        }

        fn latest_date(&self, _table: &str) -> Result<Option<NaiveDate>, AppError> {
            if self.broken {
                return Err(AppError::warehouse("warehouse offline"));
            }
            Ok(self.checkpoint)
        }

        fn append(&self, _table: &str, data: &MergedTable) -> Result<usize, AppError> {
            self.appended.borrow_mut().push(data.clone());
            Ok(data.row_count())
        }
    }

    #[derive(Default)]
    struct MemoryAudit {
        entries: RefCell<Vec<AuditRecord>>,
    }

    impl AuditSink for MemoryAudit {
        fn record(&self, entry: &AuditRecord) -> Result<(), AppError> {
            self.entries.borrow_mut().push(entry.clone());
            Ok(())
        }
    }

    fn config(series: &[&str], spreads: &[(&str, &str)]) -> PipelineConfig {
        PipelineConfig {
            series_ids: series.iter().map(|s| s.to_string()).collect(),
            spreads: spreads.iter().map(|(l, s)| SpreadPair::new(*l, *s)).collect(),
            retry: RetryPolicy { max_attempts: 3, base_delay: Duration::ZERO },
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn up_to_date_run_is_skipped_and_audited() {
        let source = FakeSource::data(&[]);
        let warehouse = MemoryWarehouse { checkpoint: Some(d(5)), ..Default::default() };
        let audit = MemoryAudit::default();

        let report = run_load(&source, &warehouse, &audit, &config(&["DGS10"], &[]), d(5)).unwrap();
        assert_eq!(report.status, RunStatus::Skipped);
        assert_eq!(report.row_count, 0);
        assert_eq!(source.calls.get(), 0);
        assert!(warehouse.appended.borrow().is_empty());

        let entries = audit.entries.borrow();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, RunStatus::Skipped);
        assert_eq!(entries[0].row_count, 0);
        assert_eq!((entries[0].start_date, entries[0].end_date), (d(6), d(5)));
    }

    #[test]
    fn successful_run_appends_merged_table_with_spreads() {
        let source = FakeSource::data(&[
            ("DGS10", &[("2024-01-02", "5"), ("2024-01-03", "5"), ("2024-01-04", ".")]),
            ("DGS2", &[("2024-01-02", "4"), ("2024-01-04", "4")]),
        ]);
        let warehouse = MemoryWarehouse { checkpoint: Some(d(1)), ..Default::default() };
        let audit = MemoryAudit::default();
        let cfg = config(&["DGS10", "DGS30", "DGS2"], &[("DGS10", "DGS2"), ("DGS30", "DGS2")]);

        let report = run_load(&source, &warehouse, &audit, &cfg, d(4)).unwrap();
        assert_eq!(report.status, RunStatus::Success);
        assert_eq!(report.row_count, 3);
        assert_eq!((report.start_date, report.end_date), (d(2), d(4)));
        assert_eq!(report.output.missing_series, vec!["DGS30".to_string()]);
        assert_eq!(report.output.skipped_spreads, vec![SpreadPair::new("DGS30", "DGS2")]);

        let appended = warehouse.appended.borrow();
        assert_eq!(appended.len(), 1);
        let spread = appended[0].column("DGS10_DGS2_spread").unwrap();
        // DGS10 is forward-filled on the 4th; DGS2 has no row on the 3rd.
        assert_eq!(spread.values, vec![Some(1.0), None, Some(1.0)]);

        let entries = audit.entries.borrow();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, RunStatus::Success);
        assert_eq!(entries[0].row_count, 3);
        assert_eq!(entries[0].missing_series, "DGS30");
        assert_eq!(entries[0].error_message, None);
    }

    #[test]
    fn all_series_empty_is_success_with_zero_rows() {
        let source = FakeSource::data(&[]);
        let warehouse = MemoryWarehouse::default();
        let audit = MemoryAudit::default();

        let report = run_load(&source, &warehouse, &audit, &config(&["A", "B"], &[]), d(5)).unwrap();
        assert_eq!(report.status, RunStatus::Success);
        assert_eq!(report.row_count, 0);
        assert_eq!(report.start_date, crate::config::default_epoch());
        assert!(warehouse.appended.borrow().is_empty());
        assert_eq!(audit.entries.borrow()[0].missing_series, "A;B");
    }

    #[test]
    fn exhausted_retries_fail_the_run_with_message_intact() {
        let inner = FakeSource::unavailable();
        let cfg = config(&["DGS10", "DGS2"], &[]);
        let source = Retrying::new(&inner, cfg.retry);
        let warehouse = MemoryWarehouse::default();
        let audit = MemoryAudit::default();

        let err = run_load(&source, &warehouse, &audit, &cfg, d(5)).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_FETCH);
        assert_eq!(inner.calls.get(), 3);
        assert!(warehouse.appended.borrow().is_empty());

        let entries = audit.entries.borrow();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, RunStatus::Failed);
        assert_eq!(entries[0].row_count, 0);
        let msg = entries[0].error_message.as_deref().unwrap();
        assert!(msg.contains("503 Service Unavailable"), "{msg}");
        assert!(msg.contains("3 attempts"), "{msg}");
    }

    #[test]
    fn checkpoint_failure_is_audited_as_failed() {
        let source = FakeSource::data(&[]);
        let warehouse = MemoryWarehouse { broken: true, ..Default::default() };
        let audit = MemoryAudit::default();

        let err = run_load(&source, &warehouse, &audit, &config(&["A"], &[]), d(5)).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_WAREHOUSE);
        let entries = audit.entries.borrow();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, RunStatus::Failed);
        assert_eq!(entries[0].error_message.as_deref(), Some("warehouse offline"));
    }

    #[test]
    fn run_window_skips_spreads_on_empty_table() {
        let source = FakeSource::data(&[]);
        let out = run_window(
            &source,
            &["A".to_string()],
            &[SpreadPair::new("A", "B")],
            DateRange::new(d(1), d(2)).unwrap(),
        )
        .unwrap();
        assert!(out.table.is_empty());
        assert!(out.skipped_spreads.is_empty());
        assert_eq!(out.missing_series, vec!["A".to_string()]);
    }
}
