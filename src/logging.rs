// src/logging.rs

//! Logging setup for `deploydag` using `tracing` + `tracing-subscriber`.
//!
//! The log level is taken from the `DEPLOYDAG_LOG` environment variable
//! (e.g. "info", "debug"), defaulting to `info`.
//!
//! Logs are sent to STDERR so that stdout stays free for whatever the
//! embedding application wants to print.

use tracing_subscriber::fmt;

use crate::errors::Result;

/// Initialise the global logging subscriber.
///
/// Safe to call once at startup. Library consumers that install their own
/// subscriber should skip this.
pub fn init_logging() -> Result<()> {
    let level = std::env::var("DEPLOYDAG_LOG")
        .ok()
        .and_then(|s| parse_level_str(&s))
        .unwrap_or(tracing::Level::INFO);

    fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}
