//! Input/output helpers.
//!
//! - destination table seam + CSV implementation (`warehouse`)
//! - per-run audit log (`audit`)
//! - merged table CSV export (`export`)

pub mod audit;
pub mod export;
pub mod warehouse;

pub use audit::*;
pub use export::*;
pub use warehouse::*;
