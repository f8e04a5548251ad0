//! Log output for scheduled runs
//!
//! A run writes to stderr at INFO and to a daily log file under
//! `[global].log_directory` at the configured level. `RUST_LOG` overrides both.

use crate::config::{expand_tilde, GlobalConfig};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

const LOG_FILE_PREFIX: &str = "journal-backup";
const LOG_FILE_SUFFIX: &str = "log";

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub log_directory: PathBuf,
    /// Level of the log file; the console stays at INFO
    pub log_level: Level,
    /// Log files kept after pruning
    pub max_files: u32,
}

impl LoggingConfig {
    pub fn from_config(global: &GlobalConfig) -> Self {
        Self::new(&global.log_directory, &global.log_level, global.log_max_files)
    }

    pub fn new(log_directory: &Path, log_level: &str, max_files: u32) -> Self {
        Self {
            log_directory: log_directory.to_path_buf(),
            log_level: parse_level(log_level),
            max_files,
        }
    }
}

/// Unknown names fall back to INFO
fn parse_level(name: &str) -> Level {
    match name.trim().to_ascii_lowercase().as_str() {
        "warning" => Level::WARN,
        other => other.parse().unwrap_or(Level::INFO),
    }
}

/// Install the file and console subscribers and prune old log files
///
/// Dropping the returned guard flushes buffered file output, so `main` holds it
/// until the process exits.
pub fn init_logging(config: &LoggingConfig) -> Result<LogGuard> {
    let log_dir = expand_tilde(&config.log_directory);
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory: {:?}", log_dir))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .build(&log_dir)
        .context("Failed to create log file appender")?;
    let (file_writer, worker) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(level_filter(config.log_level)),
        )
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(level_filter(Level::INFO)),
        )
        .init();

    let removed = cleanup_old_logs(&log_dir, config.max_files)?;
    if removed > 0 {
        tracing::debug!("Pruned {} old log files from {:?}", removed, log_dir);
    }

    Ok(LogGuard { _worker: worker })
}

/// Console-only logging for commands that run without a config file
pub fn init_console_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}

fn level_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("journal_backup={}", level))
            .add_directive(LevelFilter::from_level(level).into())
    })
}

fn is_log_file(name: &str) -> bool {
    name.starts_with(LOG_FILE_PREFIX) && name.ends_with(&format!(".{}", LOG_FILE_SUFFIX))
}

/// Delete all but the `max_files` newest log files; returns how many went
fn cleanup_old_logs(log_dir: &Path, max_files: u32) -> Result<usize> {
    let mut logs: Vec<(Option<SystemTime>, PathBuf)> = fs::read_dir(log_dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| is_log_file(&entry.file_name().to_string_lossy()))
        .map(|entry| {
            let modified = entry.metadata().and_then(|m| m.modified()).ok();
            (modified, entry.path())
        })
        .collect();

    logs.sort_by(|a, b| b.0.cmp(&a.0));

    let mut removed = 0;
    for (_, path) in logs.into_iter().skip(max_files as usize) {
        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!("Failed to remove old log file {:?}: {}", path, e),
        }
    }

    Ok(removed)
}

/// Keeps the background log writer alive
pub struct LogGuard {
    _worker: WorkerGuard,
}
