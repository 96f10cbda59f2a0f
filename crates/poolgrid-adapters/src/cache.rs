//! Adapter for a cache (Redis-style) connection pool.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use poolgrid_core::{AdapterMetrics, AdapterResult, PoolAdapter};

use crate::counters::RequestCounters;

/// Internal counters exposed by a cache client's connection pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePoolStats {
    /// Configured connection limit.
    pub max_connections: u32,
    /// Connections opened so far.
    pub created_connections: u32,
    /// Opened connections sitting idle.
    pub available_connections: u32,
    /// Connections currently checked out.
    pub in_use_connections: u32,
}

/// The slice of a cache client the adapter needs.
#[async_trait]
pub trait CacheConnectionPool: Send + Sync {
    fn stats(&self) -> Result<CachePoolStats, String>;

    async fn ping(&self) -> Result<(), String>;
}

/// Reports a cache pool's counters. Cache pools are sized at construction
/// and cannot be resized live.
pub struct CachePoolAdapter {
    pool: Arc<dyn CacheConnectionPool>,
    counters: RequestCounters,
}

impl CachePoolAdapter {
    pub fn new(pool: Arc<dyn CacheConnectionPool>) -> Self {
        Self {
            pool,
            counters: RequestCounters::new(),
        }
    }
}

#[async_trait]
impl PoolAdapter for CachePoolAdapter {
    fn kind(&self) -> &'static str {
        "cache"
    }

    async fn get_metrics(&self) -> AdapterResult<AdapterMetrics> {
        match self.pool.stats() {
            Ok(stats) => Ok(AdapterMetrics {
                current_size: stats.created_connections,
                max_size: stats.max_connections,
                active_connections: stats.in_use_connections,
                idle_connections: stats.available_connections,
                total_requests: self.counters.total(),
                failed_requests: self.counters.failed(),
                error: None,
            }),
            Err(e) => {
                warn!(error = %e, "failed to read cache pool stats");
                Ok(AdapterMetrics::degraded(e))
            }
        }
    }

    async fn resize_pool(&self, new_size: u32) -> bool {
        warn!(
            recommended_max_connections = new_size,
            "cache pool cannot be resized at runtime; update max_connections in its configuration"
        );
        false
    }

    async fn health_check(&self) -> bool {
        let ok = match self.pool.ping().await {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "cache ping failed");
                false
            }
        };
        self.counters.record(ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FakeCache {
        stats: Option<CachePoolStats>,
        reachable: AtomicBool,
    }

    #[async_trait]
    impl CacheConnectionPool for FakeCache {
        fn stats(&self) -> Result<CachePoolStats, String> {
            self.stats.ok_or_else(|| "pool closed".to_string())
        }

        async fn ping(&self) -> Result<(), String> {
            if self.reachable.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err("connection refused".to_string())
            }
        }
    }

    fn adapter(stats: Option<CachePoolStats>, reachable: bool) -> CachePoolAdapter {
        CachePoolAdapter::new(Arc::new(FakeCache {
            stats,
            reachable: AtomicBool::new(reachable),
        }))
    }

    fn stats() -> CachePoolStats {
        CachePoolStats {
            max_connections: 20,
            created_connections: 8,
            available_connections: 3,
            in_use_connections: 5,
        }
    }

    #[tokio::test]
    async fn metrics_map_pool_counters() {
        let adapter = adapter(Some(stats()), true);
        let m = adapter.get_metrics().await.unwrap();
        assert_eq!(m.current_size, 8);
        assert_eq!(m.max_size, 20);
        assert_eq!(m.active_connections, 5);
        assert_eq!(m.idle_connections, 3);
        assert!(!m.is_degraded());
    }

    #[tokio::test]
    async fn unreadable_stats_yield_degraded_metrics() {
        let adapter = adapter(None, true);
        let m = adapter.get_metrics().await.unwrap();
        assert!(m.is_degraded());
        assert_eq!(m.current_size, 0);
    }

    #[tokio::test]
    async fn resize_is_refused() {
        let adapter = adapter(Some(stats()), true);
        assert!(!adapter.resize_pool(30).await);
    }

    #[tokio::test]
    async fn failed_ping_counts_as_failed_request() {
        let adapter = adapter(Some(stats()), false);
        assert!(!adapter.health_check().await);
        let m = adapter.get_metrics().await.unwrap();
        assert_eq!(m.total_requests, 1);
        assert_eq!(m.failed_requests, 1);
    }

    #[tokio::test]
    async fn successful_ping_counts_request() {
        let adapter = adapter(Some(stats()), true);
        assert!(adapter.health_check().await);
        let m = adapter.get_metrics().await.unwrap();
        assert_eq!(m.total_requests, 1);
        assert_eq!(m.failed_requests, 0);
    }
}
