//! Pool manager error types.

use thiserror::Error;

use poolgrid_core::ConfigError;

/// Errors surfaced by `DynamicPoolManager` operations.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("pool already registered: {0}")]
    DuplicatePool(String),

    #[error("pool not registered: {0}")]
    UnknownPool(String),

    #[error("size {requested} for pool {pool} is outside [{min}, {max}]")]
    SizeOutOfBounds {
        pool: String,
        requested: u32,
        min: u32,
        max: u32,
    },

    #[error("adapter for pool {pool} declined resize to {requested}")]
    ResizeRejected { pool: String, requested: u32 },

    #[error("adapter call for pool {0} timed out")]
    AdapterTimeout(String),

    #[error("invalid config: {0}")]
    InvalidConfig(#[from] ConfigError),
}

pub type ManagerResult<T> = Result<T, ManagerError>;
