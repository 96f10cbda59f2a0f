//! Dynamic pool manager — the registry and control loop.
//!
//! One monitoring task iterates every registered pool in turn: collect
//! metrics, evaluate, resize. Each pool's work happens under that pool's
//! resize lock, which manual resizes also take, so automatic and manual
//! adjustments of the same pool never interleave. The registry lock itself
//! is only held for map updates, never across adapter calls.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use poolgrid_core::{
    AdapterMetrics, AdjustmentRecord, AdjustmentTrigger, PoolAdapter, PoolConfig, PoolMetrics,
};

use crate::decision::{ScaleDecision, evaluate, out_of_bounds};
use crate::error::{ManagerError, ManagerResult};
use crate::host::HostGuard;
use crate::recommend::{Recommendation, recommend};

/// Registry entry for one managed pool.
struct PoolEntry {
    /// Distinguishes re-registrations under the same name.
    id: u64,
    adapter: Arc<dyn PoolAdapter>,
    config: Arc<PoolConfig>,
    metrics: PoolMetrics,
    /// Last automatic or manual adjustment, for the cooldown window.
    last_adjustment: Option<Instant>,
    resize_lock: Arc<Mutex<()>>,
}

/// What a cycle needs from an entry without holding the registry lock.
#[derive(Clone)]
struct PoolHandle {
    name: String,
    id: u64,
    adapter: Arc<dyn PoolAdapter>,
    config: Arc<PoolConfig>,
    resize_lock: Arc<Mutex<()>>,
}

impl PoolEntry {
    fn handle(&self, name: &str) -> PoolHandle {
        PoolHandle {
            name: name.to_string(),
            id: self.id,
            adapter: Arc::clone(&self.adapter),
            config: Arc::clone(&self.config),
            resize_lock: Arc::clone(&self.resize_lock),
        }
    }
}

/// Outcome of one collection and decision pass.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Pools whose metrics were refreshed.
    pub collected: Vec<String>,
    /// Pools whose metrics could not be collected this cycle.
    pub failed: Vec<String>,
    /// Adjustments applied this cycle.
    pub adjustments: Vec<AdjustmentRecord>,
}

struct ManagerInner {
    config: PoolConfig,
    guard: HostGuard,
    /// Registered pools: name → entry.
    pools: RwLock<HashMap<String, PoolEntry>>,
    /// Adjustment history, oldest first.
    history: Mutex<VecDeque<AdjustmentRecord>>,
    next_id: AtomicU64,
}

/// Running monitoring task.
struct MonitorTask {
    handle: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
}

/// Owns the pool registry and the monitoring loop.
///
/// Construct one at application startup, register pools, call
/// `start_monitoring`, and call `shutdown` on the way out.
pub struct DynamicPoolManager {
    inner: Arc<ManagerInner>,
    monitor: Mutex<Option<MonitorTask>>,
}

impl DynamicPoolManager {
    /// Create a manager with a `sysinfo`-backed host guard.
    pub fn new(config: PoolConfig) -> ManagerResult<Self> {
        let guard = HostGuard::from_config(&config);
        Self::with_host_guard(config, guard)
    }

    /// Create a manager with a custom host guard.
    pub fn with_host_guard(config: PoolConfig, guard: HostGuard) -> ManagerResult<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(ManagerInner {
                config,
                guard,
                pools: RwLock::new(HashMap::new()),
                history: Mutex::new(VecDeque::new()),
                next_id: AtomicU64::new(1),
            }),
            monitor: Mutex::new(None),
        })
    }

    /// The default policy applied to pools registered without their own.
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Register a pool under the manager's default policy.
    pub async fn register_pool(
        &self,
        name: &str,
        adapter: Arc<dyn PoolAdapter>,
        initial_size: u32,
        max_size: u32,
    ) -> ManagerResult<()> {
        let config = self.inner.config.clone();
        self.register_pool_with_config(name, adapter, initial_size, max_size, config)
            .await
    }

    /// Register a pool with its own policy.
    ///
    /// Fails with `DuplicatePool` if `name` is taken; the existing entry is
    /// left untouched.
    pub async fn register_pool_with_config(
        &self,
        name: &str,
        adapter: Arc<dyn PoolAdapter>,
        initial_size: u32,
        max_size: u32,
        config: PoolConfig,
    ) -> ManagerResult<()> {
        config.validate()?;

        let mut pools = self.inner.pools.write().await;
        if pools.contains_key(name) {
            warn!(pool = %name, "pool already registered");
            return Err(ManagerError::DuplicatePool(name.to_string()));
        }

        if !config.contains_size(initial_size) {
            warn!(
                pool = %name,
                initial_size,
                min = config.min_size,
                max = config.max_size,
                "initial size outside scaling bounds, first adjustment will restore them"
            );
        }

        let kind = adapter.kind();
        pools.insert(
            name.to_string(),
            PoolEntry {
                id: self.inner.next_id.fetch_add(1, Ordering::Relaxed),
                adapter,
                config: Arc::new(config),
                metrics: PoolMetrics::new(name, initial_size, max_size),
                last_adjustment: None,
                resize_lock: Arc::new(Mutex::new(())),
            },
        );

        info!(pool = %name, kind, initial_size, max_size, "pool registered");
        Ok(())
    }

    /// Remove a pool's adapter, metrics and cooldown state.
    ///
    /// Returns whether the pool was registered.
    pub async fn unregister_pool(&self, name: &str) -> bool {
        let removed = self.inner.pools.write().await.remove(name).is_some();
        if removed {
            info!(pool = %name, "pool unregistered");
        }
        removed
    }

    /// Names of all registered pools, sorted.
    pub async fn pool_names(&self) -> Vec<String> {
        let pools = self.inner.pools.read().await;
        let mut names: Vec<String> = pools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Spawn the monitoring task.
    ///
    /// Returns `false` if it is already running.
    pub async fn start_monitoring(&self) -> bool {
        let mut monitor = self.monitor.lock().await;
        if monitor.as_ref().is_some_and(|task| !task.handle.is_finished()) {
            warn!("pool monitoring already running");
            return false;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            inner.run(shutdown_rx).await;
        });
        *monitor = Some(MonitorTask {
            handle,
            shutdown_tx,
        });

        info!(
            interval_secs = self.inner.config.monitoring_interval.as_secs_f64(),
            auto_scaling = self.inner.config.auto_scaling_enabled,
            "pool monitoring started"
        );
        true
    }

    /// Signal the monitoring task and wait for it to exit.
    ///
    /// Returns `false` if it was not running.
    pub async fn stop_monitoring(&self) -> bool {
        let mut monitor = self.monitor.lock().await;
        let Some(task) = monitor.take() else {
            return false;
        };

        let _ = task.shutdown_tx.send(true);
        match task.handle.await {
            Ok(()) => {}
            Err(e) if e.is_cancelled() => {}
            Err(e) => error!(error = %e, "pool monitoring task failed"),
        }

        info!("pool monitoring stopped");
        true
    }

    /// Whether the monitoring task is running.
    ///
    /// A task that exited on its own counts as stopped.
    pub async fn is_monitoring(&self) -> bool {
        self.monitor
            .lock()
            .await
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    /// Stop monitoring and drop every registered pool.
    pub async fn shutdown(&self) {
        self.stop_monitoring().await;
        let mut pools = self.inner.pools.write().await;
        let count = pools.len();
        pools.clear();
        info!(pools = count, "pool manager shut down");
    }

    /// Run one collection and decision pass over all pools.
    pub async fn run_cycle(&self) -> CycleReport {
        self.inner.run_cycle().await
    }

    /// Snapshot of one pool's metrics, or all pools' when `name` is `None`.
    ///
    /// An unknown name yields an empty list.
    pub async fn get_pool_metrics(&self, name: Option<&str>) -> Vec<PoolMetrics> {
        let pools = self.inner.pools.read().await;
        let mut out: Vec<PoolMetrics> = match name {
            Some(name) => pools.get(name).map(|e| e.metrics.clone()).into_iter().collect(),
            None => pools.values().map(|e| e.metrics.clone()).collect(),
        };
        out.sort_by(|a, b| a.pool_name.cmp(&b.pool_name));
        out
    }

    /// The most recent `limit` adjustments, oldest first, optionally for
    /// one pool only.
    pub async fn get_adjustment_history(
        &self,
        name: Option<&str>,
        limit: usize,
    ) -> Vec<AdjustmentRecord> {
        let history = self.inner.history.lock().await;
        let matching: Vec<&AdjustmentRecord> = history
            .iter()
            .filter(|r| name.is_none_or(|n| r.pool_name == n))
            .collect();
        let skip = matching.len().saturating_sub(limit);
        matching.into_iter().skip(skip).cloned().collect()
    }

    /// Resize a pool on an operator's request.
    ///
    /// The size must lie within the pool's bounds. Manual resizes ignore
    /// the cooldown but restart it, so the control loop leaves the pool
    /// alone for a full window afterwards.
    pub async fn force_pool_resize(
        &self,
        name: &str,
        new_size: u32,
        reason: &str,
    ) -> ManagerResult<AdjustmentRecord> {
        let handle = self
            .inner
            .handle(name)
            .await
            .ok_or_else(|| ManagerError::UnknownPool(name.to_string()))?;

        if !handle.config.contains_size(new_size) {
            warn!(
                pool = %name,
                requested = new_size,
                min = handle.config.min_size,
                max = handle.config.max_size,
                "manual resize outside bounds"
            );
            return Err(ManagerError::SizeOutOfBounds {
                pool: name.to_string(),
                requested: new_size,
                min: handle.config.min_size,
                max: handle.config.max_size,
            });
        }

        let _resize = handle.resize_lock.lock().await;
        let record = self
            .inner
            .apply_resize(&handle, new_size, reason.to_string(), AdjustmentTrigger::Manual)
            .await?;
        info!(pool = %name, from = record.old_size, to = new_size, reason, "manual pool resize");
        Ok(record)
    }

    /// Heuristic sizing advice for every pool, without side effects.
    pub async fn get_recommendations(&self) -> Vec<Recommendation> {
        let pools = self.inner.pools.read().await;
        let mut entries: Vec<&PoolEntry> = pools.values().collect();
        entries.sort_by(|a, b| a.metrics.pool_name.cmp(&b.metrics.pool_name));
        entries
            .into_iter()
            .flat_map(|e| recommend(&e.metrics, &e.config))
            .collect()
    }

    /// Run each adapter's health check (one pool or all).
    pub async fn check_pool_health(&self, name: Option<&str>) -> BTreeMap<String, bool> {
        let handles: Vec<PoolHandle> = {
            let pools = self.inner.pools.read().await;
            pools
                .iter()
                .filter(|(n, _)| name.is_none_or(|want| n.as_str() == want))
                .map(|(n, e)| e.handle(n))
                .collect()
        };

        let mut out = BTreeMap::new();
        for handle in handles {
            let healthy = tokio::time::timeout(
                handle.config.adapter_timeout,
                handle.adapter.health_check(),
            )
            .await
            .unwrap_or(false);
            if !healthy {
                warn!(pool = %handle.name, "pool health check failed");
            }
            out.insert(handle.name, healthy);
        }
        out
    }
}

impl ManagerInner {
    async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        debug!("pool monitoring loop starting");
        loop {
            tokio::select! {
                report = self.run_cycle() => {
                    debug!(
                        collected = report.collected.len(),
                        failed = report.failed.len(),
                        adjusted = report.adjustments.len(),
                        "monitoring cycle complete"
                    );
                }
                _ = shutdown.changed() => break,
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.monitoring_interval) => {}
                _ = shutdown.changed() => break,
            }
        }
        debug!("pool monitoring loop exited");
    }

    async fn handle(&self, name: &str) -> Option<PoolHandle> {
        let pools = self.pools.read().await;
        pools.get(name).map(|e| e.handle(name))
    }

    async fn run_cycle(&self) -> CycleReport {
        let mut handles: Vec<PoolHandle> = {
            let pools = self.pools.read().await;
            pools.iter().map(|(n, e)| e.handle(n)).collect()
        };
        handles.sort_by(|a, b| a.name.cmp(&b.name));

        let mut report = CycleReport::default();
        for handle in handles {
            let _resize = handle.resize_lock.lock().await;

            if !self.collect(&handle).await {
                report.failed.push(handle.name);
                continue;
            }
            report.collected.push(handle.name.clone());

            if let Some(record) = self.auto_scale(&handle).await {
                report.adjustments.push(record);
            }
        }
        report
    }

    /// Refresh one pool's metrics. Returns false if nothing was applied.
    async fn collect(&self, handle: &PoolHandle) -> bool {
        let pool = &handle.name;
        let reading: AdapterMetrics =
            match tokio::time::timeout(handle.config.adapter_timeout, handle.adapter.get_metrics())
                .await
            {
                Ok(Ok(reading)) => {
                    if let Some(e) = &reading.error {
                        warn!(%pool, error = %e, "adapter returned degraded metrics");
                        return false;
                    }
                    reading
                }
                Ok(Err(e)) => {
                    warn!(%pool, error = %e, "failed to collect pool metrics");
                    return false;
                }
                Err(_) => {
                    warn!(
                        %pool,
                        timeout_secs = handle.config.adapter_timeout.as_secs_f64(),
                        "metrics collection timed out"
                    );
                    return false;
                }
            };

        let mut pools = self.pools.write().await;
        let Some(entry) = pools.get_mut(pool).filter(|e| e.id == handle.id) else {
            debug!(%pool, "pool unregistered during collection");
            return false;
        };

        entry.metrics.apply(&reading, Utc::now());
        if entry.metrics.is_inconsistent() {
            warn!(
                %pool,
                current_size = entry.metrics.current_size,
                active = entry.metrics.active_connections,
                idle = entry.metrics.idle_connections,
                "adapter reported more connections than the pool size"
            );
        }
        debug!(
            %pool,
            size = entry.metrics.current_size,
            active = entry.metrics.active_connections,
            utilization = entry.metrics.utilization_percentage,
            "pool metrics collected"
        );
        true
    }

    /// Apply the scaling algorithm to one pool. The caller holds the
    /// pool's resize lock.
    async fn auto_scale(&self, handle: &PoolHandle) -> Option<AdjustmentRecord> {
        let config = &handle.config;
        if !config.auto_scaling_enabled {
            return None;
        }

        let (decision, utilization, current, outside) = {
            let pools = self.pools.read().await;
            let entry = pools.get(&handle.name).filter(|e| e.id == handle.id)?;

            if let Some(elapsed) = entry.last_adjustment.map(|last| last.elapsed())
                && elapsed < config.cooldown
            {
                debug!(
                    pool = %handle.name,
                    remaining_secs = (config.cooldown - elapsed).as_secs_f64(),
                    "pool in cooldown"
                );
                return None;
            }

            (
                evaluate(&entry.metrics, config),
                entry.metrics.utilization(),
                entry.metrics.current_size,
                out_of_bounds(&entry.metrics, config),
            )
        };

        let new_size = decision.target()?;
        if matches!(decision, ScaleDecision::ScaleUp(_)) && !self.guard.permits_scale_up().await {
            info!(pool = %handle.name, "scale-up deferred, host under heavy load");
            return None;
        }

        let reason = if outside {
            format!(
                "size {current} outside scaling bounds [{}, {}]",
                config.min_size, config.max_size
            )
        } else if matches!(decision, ScaleDecision::ScaleUp(_)) {
            format!(
                "utilization {:.1}% above scale-up threshold {:.1}%",
                utilization * 100.0,
                config.scale_up_threshold * 100.0
            )
        } else {
            format!(
                "utilization {:.1}% below scale-down threshold {:.1}%",
                utilization * 100.0,
                config.scale_down_threshold * 100.0
            )
        };

        match self
            .apply_resize(handle, new_size, reason, AdjustmentTrigger::Automatic { utilization })
            .await
        {
            Ok(record) => {
                info!(
                    pool = %handle.name,
                    from = record.old_size,
                    to = record.new_size,
                    utilization,
                    "pool resized"
                );
                Some(record)
            }
            Err(e) => {
                warn!(pool = %handle.name, target = new_size, error = %e, "automatic resize failed");
                None
            }
        }
    }

    /// Ask the adapter to resize and, on success, update metrics, restart
    /// the cooldown and append to history. The caller holds the pool's
    /// resize lock.
    async fn apply_resize(
        &self,
        handle: &PoolHandle,
        new_size: u32,
        reason: String,
        trigger: AdjustmentTrigger,
    ) -> ManagerResult<AdjustmentRecord> {
        let resized = tokio::time::timeout(
            handle.config.adapter_timeout,
            handle.adapter.resize_pool(new_size),
        )
        .await
        .map_err(|_| ManagerError::AdapterTimeout(handle.name.clone()))?;

        if !resized {
            warn!(pool = %handle.name, target = new_size, "adapter declined resize");
            return Err(ManagerError::ResizeRejected {
                pool: handle.name.clone(),
                requested: new_size,
            });
        }

        let record = {
            let mut pools = self.pools.write().await;
            let entry = pools
                .get_mut(&handle.name)
                .filter(|e| e.id == handle.id)
                .ok_or_else(|| ManagerError::UnknownPool(handle.name.clone()))?;

            let old_size = entry.metrics.current_size;
            entry.metrics.resized(new_size);
            entry.last_adjustment = Some(Instant::now());

            AdjustmentRecord {
                timestamp: Utc::now(),
                pool_name: handle.name.clone(),
                old_size,
                new_size,
                reason,
                trigger,
            }
        };

        let mut history = self.history.lock().await;
        history.push_back(record.clone());
        while history.len() > self.config.history_limit {
            history.pop_front();
        }

        Ok(record)
    }
}
