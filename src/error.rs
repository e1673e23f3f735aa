//! Application-level error type.
//!
//! Everything that reaches `main` is an `AppError`: a human-readable message
//! plus the process exit code to use.

use crate::data::FetchError;

/// Bad arguments, unreadable or invalid configuration, missing credentials.
pub const EXIT_CONFIG: u8 = 2;
/// Upstream series API failed (permanent error or retries exhausted).
pub const EXIT_FETCH: u8 = 4;
/// Destination table or audit log could not be read or written.
pub const EXIT_WAREHOUSE: u8 = 5;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(EXIT_CONFIG, message)
    }

    pub fn warehouse(message: impl Into<String>) -> Self {
        Self::new(EXIT_WAREHOUSE, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        Self::new(EXIT_FETCH, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
