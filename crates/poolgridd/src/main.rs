//! poolgridd — hosts a `DynamicPoolManager` for the process lifetime.
//!
//! Loads the scaling policy, registers the configured pools, starts the
//! monitoring loop, and periodically logs pool status until interrupted.
//!
//! # Usage
//!
//! ```text
//! poolgridd run --config poolgrid.toml
//! poolgridd check-config --config poolgrid.toml
//! ```

mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use poolgrid_adapters::MockPoolAdapter;
use poolgrid_autoscale::DynamicPoolManager;
use poolgrid_core::PoolAdapter;

use crate::config::{DaemonConfig, PoolKind, PoolSpec};

#[derive(Parser)]
#[command(name = "poolgridd", about = "Adaptive connection-pool manager")]
struct Cli {
    /// Log output format.
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Run the manager until interrupted.
    Run {
        /// Path to poolgrid.toml. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Seconds between status reports.
        #[arg(long, default_value = "60")]
        status_interval: u64,
    },
    /// Validate a config file and print the effective config as JSON.
    CheckConfig {
        #[arg(long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Command::Run {
            config,
            status_interval,
        } => run(config, Duration::from_secs(status_interval.max(1))).await,
        Command::CheckConfig { config } => check_config(config),
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new("info,poolgrid=debug,poolgridd=debug")
    });

    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
    }
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<DaemonConfig> {
    match path {
        Some(path) => {
            let config = DaemonConfig::from_file(&path)?;
            info!(path = %path.display(), "config loaded");
            Ok(config)
        }
        None => Ok(DaemonConfig::default()),
    }
}

async fn run(config_path: Option<PathBuf>, status_interval: Duration) -> anyhow::Result<()> {
    info!("poolgridd starting");

    let file = load_config(config_path)?;
    file.effective()?;
    let manager = DynamicPoolManager::new(file.manager_config()?)?;

    for pool in &file.pools {
        let adapter = build_adapter(pool);
        match file.pool_config(pool)? {
            Some(pool_config) => {
                manager
                    .register_pool_with_config(
                        &pool.name,
                        adapter,
                        pool.initial_size,
                        pool.max_size,
                        pool_config,
                    )
                    .await?
            }
            None => {
                manager
                    .register_pool(&pool.name, adapter, pool.initial_size, pool.max_size)
                    .await?
            }
        }
    }

    if file.pools.is_empty() {
        warn!("no pools configured; the monitoring loop will idle");
    }

    manager.start_monitoring().await;

    let mut ticker = tokio::time::interval(status_interval);
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = ticker.tick() => report_status(&manager).await,
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!(error = %e, "failed to listen for shutdown signal");
                }
                break;
            }
        }
    }

    info!("shutdown signal received");
    report_status(&manager).await;
    manager.shutdown().await;
    info!("poolgridd stopped");
    Ok(())
}

fn build_adapter(pool: &PoolSpec) -> Arc<dyn PoolAdapter> {
    match pool.kind {
        PoolKind::Mock => Arc::new(MockPoolAdapter::new(
            pool.initial_size,
            pool.max_size,
            pool.utilization,
        )),
    }
}

async fn report_status(manager: &DynamicPoolManager) {
    for m in manager.get_pool_metrics(None).await {
        info!(
            pool = %m.pool_name,
            size = m.current_size,
            max = m.max_size,
            active = m.active_connections,
            idle = m.idle_connections,
            peak = m.peak_connections,
            utilization = %format!("{:.1}%", m.utilization_percentage),
            "pool status"
        );
    }

    let health = manager.check_pool_health(None).await;
    let unhealthy: Vec<&String> = health.iter().filter(|(_, ok)| !**ok).map(|(n, _)| n).collect();
    if !unhealthy.is_empty() {
        warn!(pools = ?unhealthy, "unhealthy pools");
    }

    for rec in manager.get_recommendations().await {
        match serde_json::to_string(&rec) {
            Ok(json) => info!(recommendation = %json, "pool recommendation"),
            Err(e) => warn!(error = %e, "failed to encode recommendation"),
        }
    }

    let recent = manager.get_adjustment_history(None, 1).await;
    if let Some(last) = recent.last() {
        info!(
            pool = %last.pool_name,
            from = last.old_size,
            to = last.new_size,
            reason = %last.reason,
            manual = last.is_manual(),
            "most recent adjustment"
        );
    }
}

fn check_config(path: PathBuf) -> anyhow::Result<()> {
    println!("{}", effective_config_json(&DaemonConfig::from_file(&path)?)?);
    Ok(())
}

fn effective_config_json(file: &DaemonConfig) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(&file.effective()?)?)
}
