//! Console plus daily-rotating file logging.
//!
//! Log files land in `<app data dir>/logs/qrledger.<date>.log`. The level
//! defaults to `info` and can be overridden with `RUST_LOG`.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _, EnvFilter};

const MAX_LOG_FILES: usize = 10;

pub fn log_dir(app_data_dir: &Path) -> PathBuf {
    app_data_dir.join("logs")
}

pub fn init(app_data_dir: &Path) -> Result<()> {
    let dir = log_dir(app_data_dir);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(MAX_LOG_FILES)
        .filename_prefix("qrledger")
        .filename_suffix("log")
        .build(&dir)
        .context("Failed to create log file appender")?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Failed to create env filter")?;

    let stdout_layer = fmt::layer().with_target(true).with_line_number(true);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_writer(file_appender);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::info!("Logging initialized, log directory: {:?}", dir);
    Ok(())
}
