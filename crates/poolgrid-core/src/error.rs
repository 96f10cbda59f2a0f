//! Error types shared by the pool manager and its adapters.

use thiserror::Error;

/// Result type alias for configuration handling.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type alias for adapter calls.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Errors raised while loading or validating a `PoolConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid duration for {field}: {value:?}")]
    Duration { field: &'static str, value: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors an adapter reports instead of metrics.
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    #[error("pool backend unavailable: {0}")]
    Unavailable(String),

    #[error("metrics collection failed: {0}")]
    Metrics(String),
}
