//! poolgrid-core — shared types for adaptive connection-pool management.
//!
//! Defines the observed state of a pool (`PoolMetrics`), the scaling
//! policy (`PoolConfig`), the append-only `AdjustmentRecord`, and the
//! `PoolAdapter` contract that concrete pools implement so the manager
//! can observe and resize them.
//!
//! # Data flow
//!
//! ```text
//! PoolAdapter::get_metrics() → AdapterMetrics
//!   → PoolMetrics::apply()     (utilization, peak, counters)
//!     → scaling decision       (poolgrid-autoscale)
//!       → PoolAdapter::resize_pool()
//!         → AdjustmentRecord
//! ```

pub mod adapter;
pub mod adjustment;
pub mod config;
pub mod error;
pub mod metrics;

pub use adapter::PoolAdapter;
pub use adjustment::{AdjustmentRecord, AdjustmentTrigger};
pub use config::{PoolConfig, PoolConfigFile};
pub use error::{AdapterError, AdapterResult, ConfigError, ConfigResult};
pub use metrics::{AdapterMetrics, PoolMetrics};
