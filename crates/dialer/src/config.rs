//! Dialer configuration
//!
//! Resolved from: explicit path > `POWERDIAL_CONFIG` env > `<data_dir>/config.toml`
//! (if present) > built-in defaults. `POWERDIAL_SETTLE_DELAY_MS` overrides the
//! delay from any source.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::logging::LoggingConfig;
use crate::snapshot::QueuePolicy;

pub const DEFAULT_SETTLE_DELAY_MS: u64 = 300;
pub const MAX_SETTLE_DELAY_MS: u64 = 5_000;

const CONFIG_ENV: &str = "POWERDIAL_CONFIG";
const SETTLE_DELAY_ENV: &str = "POWERDIAL_SETTLE_DELAY_MS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialerConfig {
    /// Pause between completing a target and dialing the next one
    pub settle_delay_ms: u64,
    /// Concurrent calls. Accepted for compatibility with existing config
    /// files; anything other than 1 is rejected.
    pub parallel_dials: u32,
    pub queue: QueuePolicy,
    pub logging: LoggingConfig,
}

impl Default for DialerConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            parallel_dials: 1,
            queue: QueuePolicy::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl DialerConfig {
    /// Load, apply env overrides, and validate.
    pub fn load(explicit: Option<&Path>, data_dir: &Path) -> Result<Self, ConfigError> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
            .or_else(|| {
                let default = crate::paths::config_path(data_dir);
                default.exists().then_some(default)
            });

        let mut config = match path {
            Some(path) => {
                debug!(component = "config", path = %path.display(), "Loading dialer config");
                Self::from_file(&path)?
            }
            None => Self::default(),
        };

        if let Ok(value) = std::env::var(SETTLE_DELAY_ENV) {
            config.settle_delay_ms =
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidEnv {
                        name: SETTLE_DELAY_ENV,
                        value,
                    })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.parallel_dials != 1 {
            return Err(ConfigError::UnsupportedParallelDials(self.parallel_dials));
        }
        if self.settle_delay_ms > MAX_SETTLE_DELAY_MS {
            return Err(ConfigError::SettleDelayOutOfRange(self.settle_delay_ms));
        }
        Ok(())
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_queue(mut self, queue: QueuePolicy) -> Self {
        self.queue = queue;
        self
    }
}
