//! Host-resource guard consulted before growing a pool.
//!
//! Growing a pool when the host is already short on memory or CPU only
//! makes things worse, so scale-ups are deferred while either limit is
//! exceeded. If the host cannot be sampled at all, scaling is allowed.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use sysinfo::System;
use thiserror::Error;
use tracing::{debug, warn};

use poolgrid_core::PoolConfig;

/// Errors from sampling host load.
#[derive(Debug, Error)]
pub enum GuardError {
    #[error("host metrics unavailable: {0}")]
    Unavailable(String),

    #[error("host probe task failed: {0}")]
    Task(String),
}

/// Memory and CPU usage of the host, in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostLoad {
    pub memory_percent: f64,
    pub cpu_percent: f64,
}

/// Source of host load samples.
///
/// `sample` may block (CPU usage needs two readings a short window
/// apart); `HostGuard` always calls it from a blocking task.
pub trait HostProbe: Send + Sync {
    fn sample(&self) -> Result<HostLoad, GuardError>;
}

/// `HostProbe` backed by `sysinfo`.
pub struct SysinfoProbe {
    system: Mutex<System>,
    window: Duration,
}

impl SysinfoProbe {
    pub fn new(window: Duration) -> Self {
        Self {
            system: Mutex::new(System::new()),
            window,
        }
    }
}

impl HostProbe for SysinfoProbe {
    fn sample(&self) -> Result<HostLoad, GuardError> {
        let mut system = self.system.lock().unwrap_or_else(PoisonError::into_inner);

        system.refresh_memory();
        let total = system.total_memory();
        if total == 0 {
            return Err(GuardError::Unavailable("total memory reported as zero".into()));
        }
        let memory_percent = system.used_memory() as f64 / total as f64 * 100.0;

        // CPU usage is the delta between two refreshes.
        system.refresh_cpu();
        std::thread::sleep(self.window);
        system.refresh_cpu();
        if system.cpus().is_empty() {
            return Err(GuardError::Unavailable("no CPUs reported".into()));
        }
        let cpu_percent = f64::from(system.global_cpu_info().cpu_usage());

        Ok(HostLoad {
            memory_percent,
            cpu_percent,
        })
    }
}

/// Decides whether the host can afford a pool scale-up.
#[derive(Clone)]
pub struct HostGuard {
    probe: Arc<dyn HostProbe>,
    memory_limit_percent: f64,
    cpu_limit_percent: f64,
}

impl HostGuard {
    pub fn new(probe: Arc<dyn HostProbe>, memory_limit_percent: f64, cpu_limit_percent: f64) -> Self {
        Self {
            probe,
            memory_limit_percent,
            cpu_limit_percent,
        }
    }

    /// A `sysinfo`-backed guard using the limits and window from `config`.
    pub fn from_config(config: &PoolConfig) -> Self {
        Self::with_probe(Arc::new(SysinfoProbe::new(config.host_sample_window)), config)
    }

    /// A guard over a custom probe using the limits from `config`.
    pub fn with_probe(probe: Arc<dyn HostProbe>, config: &PoolConfig) -> Self {
        Self::new(
            probe,
            config.host_memory_limit_percent,
            config.host_cpu_limit_percent,
        )
    }

    /// Whether a scale-up may proceed right now.
    ///
    /// Returns `true` when the probe fails.
    pub async fn permits_scale_up(&self) -> bool {
        let probe = Arc::clone(&self.probe);
        let sampled = tokio::task::spawn_blocking(move || probe.sample())
            .await
            .map_err(|e| GuardError::Task(e.to_string()))
            .and_then(|r| r);

        match sampled {
            Ok(load) => {
                let overloaded = load.memory_percent > self.memory_limit_percent
                    || load.cpu_percent > self.cpu_limit_percent;
                if overloaded {
                    warn!(
                        memory_percent = load.memory_percent,
                        cpu_percent = load.cpu_percent,
                        memory_limit = self.memory_limit_percent,
                        cpu_limit = self.cpu_limit_percent,
                        "host under heavy load"
                    );
                } else {
                    debug!(
                        memory_percent = load.memory_percent,
                        cpu_percent = load.cpu_percent,
                        "host load within limits"
                    );
                }
                !overloaded
            }
            Err(e) => {
                warn!(error = %e, "host load check failed; allowing scale-up");
                true
            }
        }
    }
}
