//! Logging Setup
//!
//! Logs go to stdout and to a daily rolling file (`chatrelay.log.YYYY-MM-DD`)
//! in the configured log directory. `RUST_LOG` overrides the configured level.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_FILE_PREFIX: &str = "chatrelay.log";
const SECS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct LogConfig {
    level: String,
    debug_mode: bool,
    log_dir: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self {
            level: "info".to_string(),
            debug_mode: false,
            log_dir: PathBuf::from("logs"),
        }
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Debug mode forces `debug` level for this crate.
    pub fn with_debug_mode(mut self, debug: bool) -> Self {
        self.debug_mode = debug;
        self
    }

    pub fn with_log_dir(mut self, dir: PathBuf) -> Self {
        self.log_dir = dir;
        self
    }

    pub fn log_dir(&self) -> &PathBuf {
        &self.log_dir
    }

    fn filter_directive(&self) -> String {
        if self.debug_mode {
            format!("{},chatrelay=debug", self.level)
        } else {
            // teloxide and reqwest are chatty below warn
            format!("{},teloxide=warn,reqwest=warn,hyper=warn", self.level)
        }
    }
}

/// Install the global subscriber. Keep the returned guard alive for the life
/// of the process or buffered file output is lost.
pub fn init_logging(config: LogConfig) -> Result<WorkerGuard> {
    std::fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("Failed to create log directory: {:?}", config.log_dir))?;

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.filter_directive()))
        .context("Invalid log filter")?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_target(true),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::debug!("Logging to {:?}", config.log_dir);
    Ok(guard)
}

/// Delete log files older than `max_age_days` from `dir`. Returns how many
/// files were removed.
pub fn cleanup_old_logs(dir: &std::path::Path, max_age_days: u64) -> Result<usize> {
    // Ages beyond what SystemTime can represent keep everything
    let cutoff = max_age_days
        .checked_mul(SECS_PER_DAY)
        .and_then(|secs| SystemTime::now().checked_sub(Duration::from_secs(secs)))
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e).with_context(|| format!("Failed to read log dir: {:?}", dir)),
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(LOG_FILE_PREFIX) {
            continue;
        }
        let Ok(meta) = entry.metadata() else { continue };
        let Ok(modified) = meta.modified() else { continue };
        if meta.is_file() && modified < cutoff {
            std::fs::remove_file(entry.path())
                .with_context(|| format!("Failed to remove old log: {:?}", entry.path()))?;
            removed += 1;
        }
    }
    Ok(removed)
}
