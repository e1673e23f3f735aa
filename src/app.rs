//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - resolves configuration and credentials
//! - builds the FRED source and CSV warehouse
//! - runs the requested pipeline and prints the report

use chrono::{Local, NaiveDate};
use clap::Parser;
use tracing::info;

use crate::cli::{Cli, Command, FetchArgs, LoadArgs, TargetArgs};
use crate::config::PipelineConfig;
use crate::data::{FredClient, Retrying};
use crate::domain::DateRange;
use crate::error::AppError;
use crate::io::{CsvWarehouse, Warehouse};

pub mod incremental;
pub mod pipeline;

/// Entry point for the `mp` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    crate::logging::init_logging(cli.verbose);

    match cli.command {
        Command::Load(args) => handle_load(args),
        Command::Fetch(args) => handle_fetch(args),
        Command::Plan(args) => handle_plan(args),
    }
}

fn handle_load(args: LoadArgs) -> Result<(), AppError> {
    let config = resolve_config(&args.target)?;
    let today = today_or(args.target.today);

    let source = Retrying::new(FredClient::from_env()?, config.retry);
    let warehouse = CsvWarehouse::new(&args.target.warehouse, &config.dataset);

    let report = pipeline::run_load(&source, &warehouse, &warehouse, &config, today)?;
    println!("{}", crate::report::format_run_report(&report, args.preview));
    Ok(())
}

fn handle_fetch(args: FetchArgs) -> Result<(), AppError> {
    let mut config = PipelineConfig::load(args.config.as_deref())?;
    if !args.series.is_empty() {
        config.series_ids = args.series.clone();
        config.validate()?;
    }
    let spreads = if args.no_spreads { Vec::new() } else { config.spreads.clone() };

    let start = args.start.unwrap_or(config.observation_start);
    let end = args
        .end
        .or(config.observation_end)
        .unwrap_or_else(|| today_or(None));
    let range = DateRange::new(start, end)
        .ok_or_else(|| AppError::config(format!("Start date {start} is after end date {end}.")))?;

    let source = Retrying::new(FredClient::from_env()?, config.retry);
    let output = pipeline::run_window(&source, &config.series_ids, &spreads, range)?;

    println!("{}", crate::report::format_window_output(range, &output, args.preview));

    if let Some(path) = &args.export {
        crate::io::export::write_table_csv(path, &output.table)?;
        info!(path = %path.display(), rows = output.table.row_count(), "exported table");
    }
    Ok(())
}

fn handle_plan(args: TargetArgs) -> Result<(), AppError> {
    let config = resolve_config(&args)?;
    let today = today_or(args.today);
    let warehouse = CsvWarehouse::new(&args.warehouse, &config.dataset);

    let checkpoint = warehouse.latest_date(&config.table)?;
    let window = incremental::plan_window(checkpoint, today, config.observation_start);
    println!(
        "{}",
        crate::report::format_plan(&warehouse.destination(&config.table), checkpoint, &window)
    );
    Ok(())
}

/// Load the config file and apply destination overrides from the CLI.
pub fn resolve_config(target: &TargetArgs) -> Result<PipelineConfig, AppError> {
    let mut config = PipelineConfig::load(target.config.as_deref())?;
    if let Some(dataset) = &target.dataset {
        config.dataset = dataset.clone();
    }
    if let Some(table) = &target.table {
        config.table = table.clone();
    }
    config.validate()?;
    Ok(config)
}

fn today_or(date: Option<NaiveDate>) -> NaiveDate {
    date.unwrap_or_else(|| Local::now().date_naive())
}
