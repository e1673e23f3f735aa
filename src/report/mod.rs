//! Reporting utilities: run summaries and table previews.

pub mod format;

pub use format::*;
