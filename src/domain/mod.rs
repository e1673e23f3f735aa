//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - per-series and merged tabular data (`SeriesColumn`, `MergedTable`)
//! - derived-column requests (`SpreadPair`)
//! - date windows and run outcomes (`DateRange`, `RunStatus`)

pub mod types;

pub use types::*;
