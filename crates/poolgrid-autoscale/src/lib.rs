//! poolgrid-autoscale — adaptive sizing of heterogeneous connection pools.
//!
//! A single `DynamicPoolManager` per process owns every registered
//! `PoolAdapter`, polls them on a fixed interval, and grows or shrinks
//! each pool within its configured bounds.
//!
//! # Scaling Algorithm
//!
//! ```text
//! utilization = active_connections / max_size
//!
//! if size < min_size: new = min_size
//! if size > max_size: new = max_size
//!
//! if utilization > scale_up_threshold and size < max_size:
//!     new = min(max_size, max(size + 1, round(size * scale_factor)))
//!     (skipped while the host is under heavy memory/CPU load)
//!
//! if utilization < scale_down_threshold and size > min_size:
//!     new = max(min_size, round(size / scale_factor))
//! ```
//!
//! A pool that was adjusted (automatically or manually) is left alone by
//! the control loop until its cooldown window has elapsed.
//!
//! # Lifecycle
//!
//! ```text
//! DynamicPoolManager::new(config)
//!   ├── register_pool(...)        per pool
//!   ├── start_monitoring()        spawns the single monitoring task
//!   │     loop { run_cycle(); sleep(monitoring_interval) }
//!   └── shutdown()                stops the task, clears the registry
//! ```

pub mod decision;
pub mod error;
pub mod host;
pub mod manager;
pub mod recommend;

pub use decision::{ScaleDecision, evaluate};
pub use error::{ManagerError, ManagerResult};
pub use host::{GuardError, HostGuard, HostLoad, HostProbe, SysinfoProbe};
pub use manager::{CycleReport, DynamicPoolManager};
pub use recommend::{Priority, Recommendation, RecommendedAction, recommend};
