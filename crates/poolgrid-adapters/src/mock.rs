//! Simulated pool for exercising the control loop.
//!
//! The mock reports `active = round(max_size * utilization)` regardless of
//! its current size, so a small pool at high simulated utilization looks
//! overloaded to the manager. It is the only adapter whose size actually
//! changes on `resize_pool`. Sizes outside `[1, max_size]` are refused
//! rather than clamped, so a `true` result always means the pool now has
//! exactly the requested size.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use poolgrid_core::{AdapterError, AdapterMetrics, AdapterResult, PoolAdapter};

use crate::counters::RequestCounters;

#[derive(Debug)]
struct MockState {
    current_size: u32,
    max_size: u32,
    utilization: f64,
    fail_metrics: bool,
    healthy: bool,
    metrics_delay: Option<Duration>,
    resize_calls: u32,
    extra_requests: u64,
    extra_failures: u64,
}

/// In-memory pool with configurable utilization and failure modes.
#[derive(Debug)]
pub struct MockPoolAdapter {
    state: Mutex<MockState>,
    counters: RequestCounters,
}

impl MockPoolAdapter {
    pub fn new(current_size: u32, max_size: u32, utilization: f64) -> Self {
        Self {
            state: Mutex::new(MockState {
                current_size,
                max_size,
                utilization: utilization.clamp(0.0, 1.0),
                fail_metrics: false,
                healthy: true,
                metrics_delay: None,
                resize_calls: 0,
                extra_requests: 0,
                extra_failures: 0,
            }),
            counters: RequestCounters::new(),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Change the simulated utilization (fraction of `max_size` in use).
    pub fn set_utilization(&self, utilization: f64) {
        self.state().utilization = utilization.clamp(0.0, 1.0);
    }

    /// Make `get_metrics` return an error until cleared.
    pub fn set_fail_metrics(&self, fail: bool) {
        self.state().fail_metrics = fail;
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.state().healthy = healthy;
    }

    /// Delay every `get_metrics` call, to simulate a stalled backend.
    pub fn set_metrics_delay(&self, delay: Option<Duration>) {
        self.state().metrics_delay = delay;
    }

    /// Add simulated traffic on top of health-check counts.
    pub fn record_requests(&self, total: u64, failed: u64) {
        let mut state = self.state();
        state.extra_requests += total;
        state.extra_failures += failed;
    }

    pub fn current_size(&self) -> u32 {
        self.state().current_size
    }

    /// Number of successful `resize_pool` calls.
    pub fn resize_calls(&self) -> u32 {
        self.state().resize_calls
    }
}

#[async_trait]
impl PoolAdapter for MockPoolAdapter {
    fn kind(&self) -> &'static str {
        "mock"
    }

    async fn get_metrics(&self) -> AdapterResult<AdapterMetrics> {
        let delay = self.state().metrics_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state();
        if state.fail_metrics {
            return Err(AdapterError::Metrics("simulated metrics failure".to_string()));
        }

        let active = (f64::from(state.max_size) * state.utilization).round() as u32;
        Ok(AdapterMetrics {
            current_size: state.current_size,
            max_size: state.max_size,
            active_connections: active,
            idle_connections: state.current_size.saturating_sub(active),
            total_requests: self.counters.total() + state.extra_requests,
            failed_requests: self.counters.failed() + state.extra_failures,
            error: None,
        })
    }

    async fn resize_pool(&self, new_size: u32) -> bool {
        let mut state = self.state();
        if new_size == 0 || new_size > state.max_size {
            warn!(
                requested = new_size,
                max = state.max_size,
                "mock pool cannot reach requested size"
            );
            return false;
        }
        debug!(from = state.current_size, to = new_size, "mock pool resized");
        state.current_size = new_size;
        state.resize_calls += 1;
        true
    }

    async fn health_check(&self) -> bool {
        let healthy = self.state().healthy;
        self.counters.record(healthy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn active_tracks_simulated_utilization() {
        let mock = MockPoolAdapter::new(10, 50, 0.9);
        let m = mock.get_metrics().await.unwrap();
        assert_eq!(m.active_connections, 45);
        assert_eq!(m.current_size, 10);
        assert_eq!(m.idle_connections, 0);

        mock.set_utilization(0.1);
        let m = mock.get_metrics().await.unwrap();
        assert_eq!(m.active_connections, 5);
        assert_eq!(m.idle_connections, 5);
    }

    #[tokio::test]
    async fn resize_within_capacity_succeeds() {
        let mock = MockPoolAdapter::new(5, 20, 0.5);
        assert!(mock.resize_pool(12).await);
        assert_eq!(mock.current_size(), 12);
        assert!(mock.resize_pool(20).await);
        assert_eq!(mock.current_size(), 20);
        assert_eq!(mock.resize_calls(), 2);
    }

    #[tokio::test]
    async fn resize_beyond_capacity_is_refused() {
        let mock = MockPoolAdapter::new(5, 20, 0.5);
        assert!(!mock.resize_pool(100).await);
        assert!(!mock.resize_pool(0).await);
        assert_eq!(mock.current_size(), 5);
        assert_eq!(mock.resize_calls(), 0);
    }

    #[tokio::test]
    async fn metrics_failure_is_reported_as_error() {
        let mock = MockPoolAdapter::new(5, 20, 0.5);
        mock.set_fail_metrics(true);
        assert!(mock.get_metrics().await.is_err());
        mock.set_fail_metrics(false);
        assert!(mock.get_metrics().await.is_ok());
    }

    #[tokio::test]
    async fn unhealthy_mock_counts_failures() {
        let mock = MockPoolAdapter::new(5, 20, 0.5);
        mock.set_healthy(false);
        assert!(!mock.health_check().await);
        mock.record_requests(10, 1);
        let m = mock.get_metrics().await.unwrap();
        assert_eq!(m.total_requests, 11);
        assert_eq!(m.failed_requests, 2);
    }
}
