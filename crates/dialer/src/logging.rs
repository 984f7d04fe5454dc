//! File logging for the dialer.
//!
//! Format and filter come from the `[logging]` config section.
//! `POWERDIAL_LOG_FORMAT` and `POWERDIAL_LOG_FILTER` override either one
//! for a single run.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";
const LOG_FILE: &str = "dialer.log";
const FILTER_ENV: &str = "POWERDIAL_LOG_FILTER";
const FORMAT_ENV: &str = "POWERDIAL_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "pretty" => Some(LogFormat::Pretty),
            _ => None,
        }
    }
}

/// `[logging]` section of the dialer config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// `EnvFilter` directive, e.g. `"powerdial=debug"`. Defaults to `info`.
    pub filter: Option<String>,
}

impl LoggingConfig {
    /// Apply the env overrides. Unparseable values are ignored.
    fn resolve(&self, format_env: Option<String>, filter_env: Option<String>) -> (LogFormat, String) {
        let format = format_env
            .as_deref()
            .and_then(LogFormat::parse)
            .unwrap_or(self.format);
        let filter = filter_env
            .or_else(|| self.filter.clone())
            .filter(|directive| EnvFilter::try_new(directive).is_ok())
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());
        (format, filter)
    }
}

/// Keeps the non-blocking writer flushing. Drop it on exit.
pub struct LoggingHandle {
    _guard: WorkerGuard,
}

pub fn init_logging(log_dir: &Path, config: &LoggingConfig) -> anyhow::Result<LoggingHandle> {
    std::fs::create_dir_all(log_dir)?;
    let (format, filter) = config.resolve(std::env::var(FORMAT_ENV).ok(), std::env::var(FILTER_ENV).ok());

    let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let registry = tracing_subscriber::registry().with(EnvFilter::try_new(&filter)?);
    match format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(writer).with_ansi(false).pretty())
            .try_init()?,
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .with_writer(writer)
                    .json()
                    .flatten_event(true)
                    .with_target(true),
            )
            .try_init()?,
    }

    tracing::info!(
        component = "logging",
        event = "logging.initialized",
        log_path = %log_dir.join(LOG_FILE).display(),
        format = ?format,
        filter = %filter,
    );

    Ok(LoggingHandle { _guard: guard })
}
