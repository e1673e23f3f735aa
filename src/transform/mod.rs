//! Pure data shaping: clean one series, merge many, derive spreads.

pub mod clean;
pub mod merge;
pub mod spread;

pub use clean::clean;
pub use merge::{MergeOutcome, merge};
pub use spread::add_spreads;
