//! Logging setup for embedding hosts.
//!
//! This crate logs through `tracing` and never installs a subscriber on
//! its own; hosts that don't have one already can call [`init`].

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;

/// Initialize logging to a file, or to stderr when no path is given.
///
/// The `RUST_LOG` environment variable overrides `level` when set.
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure
/// all buffered log entries are flushed; `None` when logging goes to
/// stderr directly.
pub fn init(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let Some(log_path) = file_path else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(env_filter)
            .init();
        return None;
    };

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}
