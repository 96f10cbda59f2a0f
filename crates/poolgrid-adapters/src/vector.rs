//! Adapter for a vector-store client.
//!
//! Vector-store clients hold a single multiplexed connection, so the pool
//! is reported as size 1 and resizing is a no-op.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::debug;

use poolgrid_core::{AdapterMetrics, AdapterResult, PoolAdapter};

use crate::counters::RequestCounters;

/// The slice of a vector-store client the adapter needs.
#[async_trait]
pub trait VectorStoreClient: Send + Sync {
    /// Cheap liveness call (e.g. listing collections).
    async fn ping(&self) -> Result<(), String>;
}

pub struct VectorStoreAdapter {
    client: Arc<dyn VectorStoreClient>,
    counters: RequestCounters,
    /// Result of the most recent health check.
    connected: AtomicBool,
}

impl VectorStoreAdapter {
    pub fn new(client: Arc<dyn VectorStoreClient>) -> Self {
        Self {
            client,
            counters: RequestCounters::new(),
            connected: AtomicBool::new(true),
        }
    }
}

#[async_trait]
impl PoolAdapter for VectorStoreAdapter {
    fn kind(&self) -> &'static str {
        "vector"
    }

    async fn get_metrics(&self) -> AdapterResult<AdapterMetrics> {
        let connected = self.connected.load(Ordering::Relaxed);
        Ok(AdapterMetrics {
            current_size: 1,
            max_size: 1,
            active_connections: 0,
            idle_connections: u32::from(connected),
            total_requests: self.counters.total(),
            failed_requests: self.counters.failed(),
            error: None,
        })
    }

    async fn resize_pool(&self, new_size: u32) -> bool {
        debug!(requested = new_size, "vector store uses a single connection; resize ignored");
        true
    }

    async fn health_check(&self) -> bool {
        let ok = match self.client.ping().await {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "vector store ping failed");
                false
            }
        };
        self.connected.store(ok, Ordering::Relaxed);
        self.counters.record(ok)
    }
}
