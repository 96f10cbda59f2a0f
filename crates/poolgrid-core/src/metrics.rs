//! Observed pool state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single metrics reading returned by a `PoolAdapter`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterMetrics {
    pub current_size: u32,
    pub max_size: u32,
    pub active_connections: u32,
    pub idle_connections: u32,
    pub total_requests: u64,
    pub failed_requests: u64,
    /// Set when the adapter could only produce a degraded (zeroed) reading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AdapterMetrics {
    /// A zeroed reading carrying an error marker.
    pub fn degraded(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Whether the reading carries an error marker.
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

/// Per-pool state maintained by the manager across collection cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolMetrics {
    pub pool_name: String,
    pub current_size: u32,
    pub max_size: u32,
    pub active_connections: u32,
    pub idle_connections: u32,
    /// `active_connections / max_size * 100`, 0 when `max_size` is 0.
    pub utilization_percentage: f64,
    /// Highest `active_connections` observed since registration.
    pub peak_connections: u32,
    pub total_requests: u64,
    pub failed_requests: u64,
    /// Time of the last successful collection; `None` until the first one.
    pub last_updated: Option<DateTime<Utc>>,
}

impl PoolMetrics {
    /// Fresh metrics for a newly registered pool.
    pub fn new(pool_name: &str, initial_size: u32, max_size: u32) -> Self {
        Self {
            pool_name: pool_name.to_string(),
            current_size: initial_size,
            max_size: max_size.max(initial_size),
            active_connections: 0,
            idle_connections: 0,
            utilization_percentage: 0.0,
            peak_connections: 0,
            total_requests: 0,
            failed_requests: 0,
            last_updated: None,
        }
    }

    /// Fold an adapter reading into this record.
    ///
    /// Request counters and the peak never move backwards, even if the
    /// adapter's own counters were reset.
    pub fn apply(&mut self, reading: &AdapterMetrics, now: DateTime<Utc>) {
        self.current_size = reading.current_size;
        self.max_size = reading.max_size;
        self.active_connections = reading.active_connections;
        self.idle_connections = reading.idle_connections;
        self.total_requests = self.total_requests.max(reading.total_requests);
        self.failed_requests = self.failed_requests.max(reading.failed_requests);
        self.peak_connections = self.peak_connections.max(reading.active_connections);
        self.utilization_percentage = utilization_percentage(self.active_connections, self.max_size);
        self.last_updated = Some(now);
    }

    /// Record a completed resize.
    pub fn resized(&mut self, new_size: u32) {
        self.current_size = new_size;
        if new_size > self.max_size {
            self.max_size = new_size;
        }
        self.utilization_percentage = utilization_percentage(self.active_connections, self.max_size);
    }

    /// Utilization as a fraction in `[0, 1]`.
    pub fn utilization(&self) -> f64 {
        self.utilization_percentage / 100.0
    }

    /// `failed_requests / total_requests`, 0 when nothing was counted.
    pub fn failure_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.failed_requests as f64 / self.total_requests as f64
        }
    }

    /// Whether `active + idle` exceeds the reported size.
    ///
    /// Adapters sample racy pools, so this is informational only.
    pub fn is_inconsistent(&self) -> bool {
        u64::from(self.active_connections) + u64::from(self.idle_connections)
            > u64::from(self.current_size)
    }
}

fn utilization_percentage(active: u32, max_size: u32) -> f64 {
    if max_size == 0 {
        return 0.0;
    }
    (f64::from(active) / f64::from(max_size) * 100.0).clamp(0.0, 100.0)
}
