//! Command-line parsing for the macro yield loader.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! pipeline code: every run is fully described by explicit arguments.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "mp", version, about = "Incremental FRED treasury yield loader")]
pub struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load everything after the destination checkpoint, then write an audit entry.
    Load(LoadArgs),
    /// Fetch a fixed window and print/export it, without touching the destination.
    Fetch(FetchArgs),
    /// Show the window the next `load` would fetch.
    Plan(TargetArgs),
}

/// Where the run reads its configuration and writes its data.
#[derive(Debug, Args, Clone)]
pub struct TargetArgs {
    /// JSON config (series_ids, spreads, dateRange, dataset, table). Defaults to ./config.json if present.
    #[arg(short, long, value_name = "JSON")]
    pub config: Option<PathBuf>,

    /// Root directory of the CSV warehouse.
    #[arg(short, long, value_name = "DIR", default_value = "warehouse")]
    pub warehouse: PathBuf,

    /// Override the destination dataset from the config.
    #[arg(long)]
    pub dataset: Option<String>,

    /// Override the destination table from the config.
    #[arg(long)]
    pub table: Option<String>,

    /// Treat this date as "today" (YYYY-MM-DD). Defaults to the local date.
    #[arg(long, value_name = "DATE")]
    pub today: Option<NaiveDate>,
}

#[derive(Debug, Args, Clone)]
pub struct LoadArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Print the first/last N loaded rows.
    #[arg(long, default_value_t = 5)]
    pub preview: usize,
}

#[derive(Debug, Args, Clone)]
pub struct FetchArgs {
    /// JSON config providing the default series and spreads.
    #[arg(short, long, value_name = "JSON")]
    pub config: Option<PathBuf>,

    /// First date to fetch (defaults to the config's observationStart).
    #[arg(long, value_name = "DATE")]
    pub start: Option<NaiveDate>,

    /// Last date to fetch (defaults to the config's observationEnd, else today).
    #[arg(long, value_name = "DATE")]
    pub end: Option<NaiveDate>,

    /// Series to fetch instead of the configured list (repeatable).
    #[arg(short, long = "series", value_name = "ID")]
    pub series: Vec<String>,

    /// Do not derive spread columns.
    #[arg(long)]
    pub no_spreads: bool,

    /// Write the merged table to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Print the first/last N rows.
    #[arg(long, default_value_t = 10)]
    pub preview: usize,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_load_with_overrides() {
        let cli = Cli::try_parse_from([
            "mp", "load", "--warehouse", "/tmp/wh", "--today", "2024-01-05", "--table", "yields",
        ])
        .unwrap();
        let Command::Load(args) = cli.command else {
            panic!("expected load");
        };
        assert_eq!(args.target.warehouse, PathBuf::from("/tmp/wh"));
        assert_eq!(args.target.today, NaiveDate::from_ymd_opt(2024, 1, 5));
        assert_eq!(args.target.table.as_deref(), Some("yields"));
        assert_eq!(args.preview, 5);
    }

    #[test]
    fn parses_repeated_series() {
        let cli = Cli::try_parse_from([
            "mp", "fetch", "--start", "2024-01-01", "-s", "DGS10", "-s", "DGS2", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        let Command::Fetch(args) = cli.command else {
            panic!("expected fetch");
        };
        assert_eq!(args.series, vec!["DGS10", "DGS2"]);
        assert_eq!(args.start, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert!(args.end.is_none());
    }

    #[test]
    fn rejects_malformed_dates() {
        assert!(Cli::try_parse_from(["mp", "plan", "--today", "05/01/2024"]).is_err());
    }
}
