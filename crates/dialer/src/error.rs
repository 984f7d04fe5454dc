//! Error types for the dialer crate.
//!
//! Lifecycle commands never fail: invalid transitions are silent no-ops.
//! These errors cover the surfaces around the sequencer (configuration,
//! lead files, a shut-down actor).

use std::path::PathBuf;

use thiserror::Error;

/// Errors loading or validating `DialerConfig`
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for {name}: {value:?}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("parallel_dials = {0} is not supported, only sequential dialing (1) is")]
    UnsupportedParallelDials(u32),

    #[error("settle_delay_ms = {0} is out of range (max {max})", max = crate::config::MAX_SETTLE_DELAY_MS)]
    SettleDelayOutOfRange(u64),
}

/// Errors from the dialer runtime and its drivers
#[derive(Debug, Error)]
pub enum DialerError {
    #[error("Dialer actor has shut down")]
    ActorClosed,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to read lead file at {path}: {source}")]
    LeadFileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse lead file at {path}: {source}")]
    LeadFileParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_into_dialer_error() {
        let err: DialerError = ConfigError::UnsupportedParallelDials(3).into();
        assert!(matches!(
            err,
            DialerError::Config(ConfigError::UnsupportedParallelDials(3))
        ));
        assert!(err.to_string().contains("parallel_dials = 3"));
    }

    #[test]
    fn lead_file_error_carries_path() {
        let err = DialerError::LeadFileRead {
            path: PathBuf::from("/leads.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().contains("/leads.json"));
    }
}
