//! File logging for the process
//!
//! Logging is initialised at most once. Later calls return the file chosen by
//! the first call. `RUST_LOG`, when set, takes precedence over the configured
//! level.

use anyhow::{Context, Result};
use chrono::Local;
use env_logger::{Builder, Target};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static LOG_FILE: OnceLock<PathBuf> = OnceLock::new();

/// Starts logging to `<log_dir>/<timestamp>.taskdesk.log`
///
/// Returns the path of the active log file.
pub fn init_logging(log_dir: &Path, level: &str) -> Result<PathBuf> {
    if let Some(path) = LOG_FILE.get() {
        return Ok(path.clone());
    }

    fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory: {:?}", log_dir))?;

    let file_name = format!("{}.taskdesk.log", Local::now().format("%Y-%m-%d_%H-%M-%S"));
    let path = log_dir.join(file_name);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file: {:?}", path))?;

    let mut builder = Builder::new();
    builder.parse_filters(level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder
        .target(Target::Pipe(Box::new(file)))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.args()
            )
        })
        .try_init()
        .context("Failed to initialise logger")?;

    let path = LOG_FILE.get_or_init(|| path).clone();
    log::info!("Logging to {:?}", path);
    Ok(path)
}

/// Path of the active log file, if logging was initialised
pub fn log_file_path() -> Option<&'static Path> {
    LOG_FILE.get().map(PathBuf::as_path)
}
