//! Tracing setup
//!
//! stdout carries the messaging channel, so logs go to a daily rolling JSON
//! file, or to stderr when the log directory cannot be used.

use std::{
    io,
    path::{Path, PathBuf},
};

use compact_str::CompactString;
use tracing::warn;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::result::{Result, StarsError};

/// Env var holding a filter directive, e.g. `debug` or `awesome_stars=trace`
pub const LOG_ENV: &str = "AWESOME_STARS_LOG";

/// Env var overriding the log directory
pub const LOG_DIR_ENV: &str = "AWESOME_STARS_LOG_DIR";

pub const DEFAULT_FILTER: &str = "info";

const LOG_FILE_PREFIX: &str = "awesome-stars";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingConfig {
    pub filter: Option<CompactString>,
    pub log_dir: Option<PathBuf>,
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self {
            filter: std::env::var(LOG_ENV)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(CompactString::from),
            log_dir: std::env::var_os(LOG_DIR_ENV).map(PathBuf::from),
        }
    }

    pub fn directive(&self) -> &str {
        self.filter.as_deref().unwrap_or(DEFAULT_FILTER)
    }

    pub fn is_disabled(&self) -> bool {
        self.directive().trim().eq_ignore_ascii_case("off")
    }

    fn env_filter(&self) -> Result<EnvFilter> {
        EnvFilter::try_new(self.directive())
            .map_err(|e| StarsError::general(format!("invalid log filter '{}': {e}", self.directive())))
    }
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the life of the process.
pub fn init_logging(config: LoggingConfig) -> Result<Option<WorkerGuard>> {
    if config.is_disabled() {
        return Ok(None);
    }

    let filter = config.env_filter()?;

    let Some(dir) = &config.log_dir else {
        return init_stderr(filter, None);
    };

    match file_appender(dir) {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_current_span(true)
                        .with_writer(writer),
                )
                .try_init()
                .map_err(|e| StarsError::general(format!("failed to install logger: {e}")))?;
            Ok(Some(guard))
        },
        Err(e) => init_stderr(filter, Some((dir.clone(), e))),
    }
}

fn file_appender(dir: &Path) -> std::result::Result<RollingFileAppender, String> {
    std::fs::create_dir_all(dir).map_err(|e| e.to_string())?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .build(dir)
        .map_err(|e| e.to_string())
}

fn init_stderr(
    filter: EnvFilter,
    failed_dir: Option<(PathBuf, String)>,
) -> Result<Option<WorkerGuard>> {
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .json()
                .with_writer(io::stderr),
        )
        .try_init()
        .map_err(|e| StarsError::general(format!("failed to install logger: {e}")))?;

    if let Some((dir, error)) = failed_dir {
        warn!(dir = %dir.display(), error = %error, "Log directory unusable, logging to stderr");
    }
    Ok(None)
}
