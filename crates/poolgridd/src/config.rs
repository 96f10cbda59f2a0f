//! Daemon configuration file.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use poolgrid_core::{ConfigError, ConfigResult, PoolConfig, PoolConfigFile};

/// Top-level `poolgrid.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DaemonConfig {
    /// Manager-wide policy.
    #[serde(default)]
    pub manager: PoolConfigFile,
    /// Pools registered at startup.
    #[serde(default)]
    pub pools: Vec<PoolSpec>,
}

/// Backend behind a configured pool.
///
/// Only simulated pools can be declared in the file; real backends are
/// wired in by the embedding application through their adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolKind {
    Mock,
}

/// A pool declared in the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolSpec {
    pub name: String,
    pub kind: PoolKind,
    pub initial_size: u32,
    pub max_size: u32,
    /// Simulated fraction of `max_size` in use.
    pub utilization: f64,
    /// Per-pool policy, layered over `[manager]`.
    pub overrides: Option<PoolConfigFile>,
}

/// The fully resolved configuration, as printed by `check-config`.
#[derive(Debug, Serialize)]
pub struct EffectiveConfig {
    pub manager: PoolConfigFile,
    pub pools: Vec<EffectivePool>,
}

#[derive(Debug, Serialize)]
pub struct EffectivePool {
    pub name: String,
    pub kind: PoolKind,
    pub initial_size: u32,
    pub max_size: u32,
    pub utilization: f64,
    /// Policy after merging overrides over the manager policy.
    pub policy: PoolConfigFile,
}

impl DaemonConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// The validated manager-wide policy.
    pub fn manager_config(&self) -> ConfigResult<PoolConfig> {
        self.manager.clone().into_config()
    }

    /// The validated policy for one pool, if it overrides any.
    pub fn pool_config(&self, pool: &PoolSpec) -> ConfigResult<Option<PoolConfig>> {
        pool.overrides
            .clone()
            .map(|o| o.overlay(&self.manager).into_config())
            .transpose()
    }

    /// Validate everything and resolve each pool's policy.
    pub fn effective(&self) -> ConfigResult<EffectiveConfig> {
        let manager = self.manager_config()?;

        let mut seen = HashSet::new();
        let mut pools = Vec::with_capacity(self.pools.len());
        for pool in &self.pools {
            if !seen.insert(pool.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "pool '{}' declared more than once",
                    pool.name
                )));
            }
            if !(0.0..=1.0).contains(&pool.utilization) {
                return Err(ConfigError::Invalid(format!(
                    "pool '{}': utilization must be within [0, 1], got {}",
                    pool.name, pool.utilization
                )));
            }

            let policy = self.pool_config(pool)?.unwrap_or_else(|| manager.clone());
            pools.push(EffectivePool {
                name: pool.name.clone(),
                kind: pool.kind,
                initial_size: pool.initial_size,
                max_size: pool.max_size,
                utilization: pool.utilization,
                policy: PoolConfigFile::from(&policy),
            });
        }

        Ok(EffectiveConfig {
            manager: PoolConfigFile::from(&manager),
            pools,
        })
    }
}
