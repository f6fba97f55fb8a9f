// src/logging.rs

//! Logging setup for `taskgraph` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. explicit level (`--log-level`, then `[logging].level` in the config)
//! 2. `TASKGRAPH_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `info`
//!
//! Logs are sent to STDERR so that stdout stays free for JSON events and,
//! in worker processes, for the worker protocol.

use anyhow::Result;
use tracing_subscriber::fmt;

use crate::cli::{LogFormat, LogLevel};

/// Environment variable consulted when no explicit level is given.
pub const LOG_ENV: &str = "TASKGRAPH_LOG";

/// Initialise global logging subscriber.
///
/// Safe to call once at startup. A second call (or a subscriber installed
/// elsewhere) is reported as an error.
pub fn init_logging(level: Option<LogLevel>, format: LogFormat) -> Result<()> {
    let level = resolve_level(level, std::env::var(LOG_ENV).ok().as_deref());

    let builder = fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder
            .try_init()
            .map_err(|e| anyhow::anyhow!("installing log subscriber: {e}"))?,
        LogFormat::Json => builder
            .json()
            .try_init()
            .map_err(|e| anyhow::anyhow!("installing log subscriber: {e}"))?,
    }

    Ok(())
}

/// Explicit level wins, then the environment value, then `info`.
pub fn resolve_level(explicit: Option<LogLevel>, env: Option<&str>) -> tracing::Level {
    match explicit {
        Some(lvl) => level_from_log_level(lvl),
        None => env.and_then(parse_level_str).unwrap_or(tracing::Level::INFO),
    }
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_level_beats_environment() {
        assert_eq!(
            resolve_level(Some(LogLevel::Debug), Some("error")),
            tracing::Level::DEBUG
        );
    }

    #[test]
    fn environment_level_is_parsed_leniently() {
        assert_eq!(resolve_level(None, Some(" WARNING ")), tracing::Level::WARN);
        assert_eq!(resolve_level(None, Some("nonsense")), tracing::Level::INFO);
        assert_eq!(resolve_level(None, None), tracing::Level::INFO);
    }
}
