//! `macro-pipeline` library crate.
//!
//! The binary (`mp`) is a thin wrapper around this library so that:
//!
//! - the fetch/clean/merge/spread pipeline is testable without network or processes
//! - the warehouse and audit sinks can be swapped behind traits
//! - presentation (CLI, reports) stays separate from data shaping

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod logging;
pub mod report;
pub mod transform;
