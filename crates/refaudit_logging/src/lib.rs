//! Logging setup for the refaudit binary.
//!
//! Two outputs:
//! - `~/.refaudit/logs/<app>.log`, size-rotated, filtered by `RUST_LOG`
//! - stderr, warnings only unless verbose

mod rotation;

pub use rotation::{file_stem, RotatingLog};

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "refaudit=info,refaudit_protocol=info";
const RETAINED_LOG_FILES: usize = 5;
const LOG_FILE_LIMIT_BYTES: u64 = 10 * 1024 * 1024;

pub struct LogConfig<'a> {
    pub app_name: &'a str,
    /// Mirror the file filter on stderr instead of warnings only.
    pub verbose: bool,
}

/// Install the global subscriber. Fails if one is already installed.
///
/// Reports go to stdout, so console logging always targets stderr.
pub fn init_logging(config: LogConfig<'_>) -> Result<()> {
    let dir = ensure_logs_dir()?;
    let log_file = RotatingLog::open(&dir, config.app_name, RETAINED_LOG_FILES, LOG_FILE_LIMIT_BYTES)
        .with_context(|| format!("Failed to open log file in {}", dir.display()))?;

    let file_filter = default_filter();
    let console_filter = if config.verbose {
        default_filter()
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(log_file)
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .try_init()
        .context("Failed to install tracing subscriber")
}

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Get the logs directory: ~/.refaudit/logs
pub fn logs_dir() -> PathBuf {
    refaudit_protocol::paths::default_logs_dir()
}

/// Ensure the logs directory exists.
pub fn ensure_logs_dir() -> Result<PathBuf> {
    let dir = logs_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create logs directory: {}", dir.display()))?;
    Ok(dir)
}
