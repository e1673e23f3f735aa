//! Upstream data access: the series source seam, FRED, and retries.

pub mod fred;
pub mod retry;
pub mod source;

pub use fred::FredClient;
pub use retry::{RetryPolicy, Retrying};
pub use source::{FetchError, RawObservation, SeriesSource};
