//! Adapter for a relational-database connection pool.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use poolgrid_core::{AdapterMetrics, AdapterResult, PoolAdapter};

use crate::counters::RequestCounters;

/// Point-in-time status of a queue-style database pool.
///
/// `overflow` is the number of connections opened beyond `size`; some
/// pools report it as negative while the base slots are not yet filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationalPoolStatus {
    pub size: u32,
    pub checked_in: u32,
    pub checked_out: u32,
    pub overflow: i64,
    pub max_overflow: u32,
}

/// The slice of a database pool the adapter needs.
#[async_trait]
pub trait RelationalConnectionPool: Send + Sync {
    fn status(&self) -> Result<RelationalPoolStatus, String>;

    /// Run a trivial query (`SELECT 1`).
    async fn ping(&self) -> Result<(), String>;
}

/// Reports a database pool's occupancy. The pool has to be rebuilt to
/// change its size, so resize requests are refused.
pub struct RelationalPoolAdapter {
    pool: Arc<dyn RelationalConnectionPool>,
    counters: RequestCounters,
}

impl RelationalPoolAdapter {
    pub fn new(pool: Arc<dyn RelationalConnectionPool>) -> Self {
        Self {
            pool,
            counters: RequestCounters::new(),
        }
    }
}

#[async_trait]
impl PoolAdapter for RelationalPoolAdapter {
    fn kind(&self) -> &'static str {
        "relational"
    }

    async fn get_metrics(&self) -> AdapterResult<AdapterMetrics> {
        match self.pool.status() {
            Ok(status) => {
                let overflow = u32::try_from(status.overflow.max(0)).unwrap_or(u32::MAX);
                Ok(AdapterMetrics {
                    current_size: status.size.saturating_add(overflow),
                    max_size: status.size.saturating_add(status.max_overflow),
                    active_connections: status.checked_out,
                    idle_connections: status.checked_in,
                    total_requests: self.counters.total(),
                    failed_requests: self.counters.failed(),
                    error: None,
                })
            }
            Err(e) => {
                warn!(error = %e, "failed to read database pool status");
                Ok(AdapterMetrics::degraded(e))
            }
        }
    }

    async fn resize_pool(&self, new_size: u32) -> bool {
        warn!(
            recommended_pool_size = new_size,
            "database pool cannot be resized at runtime; update pool_size and restart"
        );
        false
    }

    async fn health_check(&self) -> bool {
        let ok = match self.pool.ping().await {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "database ping failed");
                false
            }
        };
        self.counters.record(ok)
    }
}
