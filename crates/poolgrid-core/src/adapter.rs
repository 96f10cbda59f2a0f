//! The contract a resource pool implements to be managed dynamically.

use async_trait::async_trait;

use crate::error::AdapterResult;
use crate::metrics::AdapterMetrics;

/// Bridges a concrete pool (cache, relational, vector store, test double)
/// to a uniform metrics/resize/health surface.
///
/// Implementations must be cheap to call and must not hold the pool's own
/// locks across `.await`. The manager bounds every call with a timeout.
#[async_trait]
pub trait PoolAdapter: Send + Sync {
    /// Short label for the backing technology, used in logs.
    fn kind(&self) -> &'static str;

    /// Read the pool's current counters.
    ///
    /// Recoverable failures should be reported as
    /// `AdapterMetrics::degraded` rather than `Err`.
    async fn get_metrics(&self) -> AdapterResult<AdapterMetrics>;

    /// Change the pool's capacity to `new_size`.
    ///
    /// Returns `true` only if the capacity changed or a no-op resize is
    /// correct for this pool. Pools that cannot be resized while live
    /// return `false`.
    async fn resize_pool(&self, new_size: u32) -> bool;

    /// Liveness probe. A failure counts against the adapter's
    /// failed-request counter.
    async fn health_check(&self) -> bool;
}
