//! Tracing setup: console output plus an optional plain-text log file.

use std::fs;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{AerisError, Result};

/// Keeps the file writer alive. Dropping it flushes pending lines.
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Accepts both tracing level names and the ones found in older `.env`
/// files (`WARNING`, `CRITICAL`).
fn normalize_level(level: &str) -> String {
    match level.trim().to_ascii_lowercase().as_str() {
        "warning" => "warn".to_string(),
        "critical" | "fatal" => "error".to_string(),
        other => other.to_string(),
    }
}

/// Builds the default filter: our crates at `level`, everything else at warn.
pub fn filter_directives(level: &str) -> String {
    let level = normalize_level(level);
    format!("warn,aeris={level},aqi={level}")
}

/// Installs the global subscriber. `RUST_LOG` takes precedence over `level`.
pub fn init(level: &str, log_file: Option<&Path>) -> Result<LogGuard> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(filter_directives(level))
            .map_err(|e| AerisError::Config(format!("invalid log level {level:?}: {e}")))?,
    };

    let mut guard = None;
    let file_layer = match log_file {
        Some(path) => {
            let dir = match path.parent() {
                Some(dir) if !dir.as_os_str().is_empty() => dir,
                _ => Path::new("."),
            };
            fs::create_dir_all(dir)?;
            let file_name = path
                .file_name()
                .ok_or_else(|| AerisError::Config(format!("invalid log file {}", path.display())))?;
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, file_guard) = tracing_appender::non_blocking(appender);
            guard = Some(file_guard);
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_line_number(true)
                    .with_writer(writer),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .try_init()
        .map_err(|e| AerisError::Config(format!("logging already initialized: {e}")))?;

    Ok(LogGuard { _file: guard })
}
