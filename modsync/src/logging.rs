//! Logging init: file under the platform state dir, or fallback to stderr.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::EnvFilter;

/// Errors from setting up file logging.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// No usable state directory on this platform.
    #[error("no state directory available for log files")]
    NoStateDir,

    /// The log directory could not be created.
    #[error("failed to create log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,modsync=debug"))
}

fn local_timer() -> OffsetTime<time::format_description::well_known::Rfc3339> {
    OffsetTime::local_rfc_3339().unwrap_or_else(|_| {
        OffsetTime::new(
            time::UtcOffset::UTC,
            time::format_description::well_known::Rfc3339,
        )
    })
}

/// Initialize structured logging to `<state dir>/modsync/modsync.log`.
///
/// Returns the appender's worker guard; hold it for the process lifetime or
/// buffered log lines are lost on exit. On failure (e.g. no writable state
/// dir) returns Err so the caller can fall back to [`init_logging_stderr`].
pub fn init_logging() -> Result<WorkerGuard, LoggingError> {
    let state = dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .ok_or(LoggingError::NoStateDir)?;
    let log_dir = state.join("modsync");
    std::fs::create_dir_all(&log_dir).map_err(|e| LoggingError::CreateDir {
        path: log_dir.clone(),
        source: e,
    })?;

    let appender = tracing_appender::rolling::never(&log_dir, "modsync.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_timer(local_timer())
        .with_writer(writer)
        .with_ansi(false)
        .init();

    tracing::info!(dir = %log_dir.display(), "logging initialized");
    Ok(guard)
}

/// Initialize logging to stderr only (no file).
///
/// Use when [`init_logging`] fails so the process still gets diagnostics.
pub fn init_logging_stderr() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_timer(local_timer())
        .with_writer(std::io::stderr)
        .init();
}
