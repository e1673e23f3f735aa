//! Structured logging initialization.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Set `MP_LOG_FORMAT=json` to get one JSON object per log line.
pub const LOG_FORMAT_VAR: &str = "MP_LOG_FORMAT";

/// Initialize the global subscriber.
///
/// Filtering follows `RUST_LOG` (default `info`). Logs go to stderr so that
/// reports printed on stdout stay clean for piping.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let json = std::env::var(LOG_FORMAT_VAR)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    // `try_init` so that repeated calls (tests, embedding) do not panic.
    if json {
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init();
    } else {
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init();
    }
}
