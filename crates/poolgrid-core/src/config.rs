//! Scaling policy for managed pools.
//!
//! `PoolConfig` is the runtime form used by the manager. `PoolConfigFile`
//! is its TOML representation: every field optional, durations written as
//! strings (`"30s"`, `"500ms"`, `"2m"`), merged over `PoolConfig::default()`.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Bounds, thresholds and cadence for adaptive pool sizing.
///
/// One instance is shared by every pool registered on a manager unless a
/// pool is registered with its own copy.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolConfig {
    /// Smallest size the manager will shrink a pool to.
    pub min_size: u32,
    /// Largest size the manager will grow a pool to.
    pub max_size: u32,
    /// Desired steady-state utilization, as a fraction.
    pub target_utilization: f64,
    /// Utilization above which a pool is grown.
    pub scale_up_threshold: f64,
    /// Utilization below which a pool is shrunk.
    pub scale_down_threshold: f64,
    /// Growth multiplier; shrinking divides by the same factor.
    pub scale_factor: f64,
    /// Time between collection cycles.
    pub monitoring_interval: Duration,
    /// When false, metrics are still collected but pools are never resized.
    pub auto_scaling_enabled: bool,
    /// Minimum time between adjustments of the same pool.
    pub cooldown: Duration,
    /// Maximum number of adjustment records retained.
    pub history_limit: usize,
    /// Upper bound on any single adapter call.
    pub adapter_timeout: Duration,
    /// Host memory usage (percent) above which scale-ups are vetoed.
    pub host_memory_limit_percent: f64,
    /// Host CPU usage (percent) above which scale-ups are vetoed.
    pub host_cpu_limit_percent: f64,
    /// CPU sampling window used by the host probe.
    pub host_sample_window: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_size: 2,
            max_size: 50,
            target_utilization: 0.7,
            scale_up_threshold: 0.8,
            scale_down_threshold: 0.3,
            scale_factor: 1.5,
            monitoring_interval: Duration::from_secs(30),
            auto_scaling_enabled: true,
            cooldown: Duration::from_secs(60),
            history_limit: 100,
            adapter_timeout: Duration::from_secs(10),
            host_memory_limit_percent: 90.0,
            host_cpu_limit_percent: 80.0,
            host_sample_window: Duration::from_millis(500),
        }
    }
}

impl PoolConfig {
    /// Check the invariants the scaling algorithm relies on.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.min_size == 0 {
            return Err(ConfigError::Invalid("min_size must be at least 1".into()));
        }
        if self.min_size > self.max_size {
            return Err(ConfigError::Invalid(format!(
                "min_size ({}) exceeds max_size ({})",
                self.min_size, self.max_size
            )));
        }
        for (name, value) in [
            ("target_utilization", self.target_utilization),
            ("scale_up_threshold", self.scale_up_threshold),
            ("scale_down_threshold", self.scale_down_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if !(self.scale_down_threshold < self.target_utilization
            && self.target_utilization < self.scale_up_threshold)
        {
            return Err(ConfigError::Invalid(format!(
                "thresholds must satisfy scale_down ({}) < target ({}) < scale_up ({})",
                self.scale_down_threshold, self.target_utilization, self.scale_up_threshold
            )));
        }
        if self.scale_factor.is_nan() || self.scale_factor <= 1.0 {
            return Err(ConfigError::Invalid(format!(
                "scale_factor must be greater than 1, got {}",
                self.scale_factor
            )));
        }
        if self.monitoring_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "monitoring_interval must be non-zero".into(),
            ));
        }
        if self.history_limit == 0 {
            return Err(ConfigError::Invalid("history_limit must be non-zero".into()));
        }
        Ok(())
    }

    /// Whether `size` lies within `[min_size, max_size]`.
    pub fn contains_size(&self, size: u32) -> bool {
        (self.min_size..=self.max_size).contains(&size)
    }

    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a config from TOML text.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let file: PoolConfigFile = toml::from_str(content)?;
        file.into_config()
    }
}

/// On-disk form of `PoolConfig`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolConfigFile {
    pub min_size: Option<u32>,
    pub max_size: Option<u32>,
    pub target_utilization: Option<f64>,
    pub scale_up_threshold: Option<f64>,
    pub scale_down_threshold: Option<f64>,
    pub scale_factor: Option<f64>,
    pub monitoring_interval: Option<String>,
    pub auto_scaling_enabled: Option<bool>,
    pub cooldown: Option<String>,
    pub history_limit: Option<usize>,
    pub adapter_timeout: Option<String>,
    pub host_memory_limit_percent: Option<f64>,
    pub host_cpu_limit_percent: Option<f64>,
    pub host_sample_window: Option<String>,
}

impl PoolConfigFile {
    /// Merge the file over the defaults and validate the result.
    pub fn into_config(self) -> ConfigResult<PoolConfig> {
        let defaults = PoolConfig::default();
        let config = PoolConfig {
            min_size: self.min_size.unwrap_or(defaults.min_size),
            max_size: self.max_size.unwrap_or(defaults.max_size),
            target_utilization: self
                .target_utilization
                .unwrap_or(defaults.target_utilization),
            scale_up_threshold: self
                .scale_up_threshold
                .unwrap_or(defaults.scale_up_threshold),
            scale_down_threshold: self
                .scale_down_threshold
                .unwrap_or(defaults.scale_down_threshold),
            scale_factor: self.scale_factor.unwrap_or(defaults.scale_factor),
            monitoring_interval: duration_field(
                "monitoring_interval",
                self.monitoring_interval,
                defaults.monitoring_interval,
            )?,
            auto_scaling_enabled: self
                .auto_scaling_enabled
                .unwrap_or(defaults.auto_scaling_enabled),
            cooldown: duration_field("cooldown", self.cooldown, defaults.cooldown)?,
            history_limit: self.history_limit.unwrap_or(defaults.history_limit),
            adapter_timeout: duration_field(
                "adapter_timeout",
                self.adapter_timeout,
                defaults.adapter_timeout,
            )?,
            host_memory_limit_percent: self
                .host_memory_limit_percent
                .unwrap_or(defaults.host_memory_limit_percent),
            host_cpu_limit_percent: self
                .host_cpu_limit_percent
                .unwrap_or(defaults.host_cpu_limit_percent),
            host_sample_window: duration_field(
                "host_sample_window",
                self.host_sample_window,
                defaults.host_sample_window,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Fields set in `self` win; the rest come from `base`.
    pub fn overlay(self, base: &PoolConfigFile) -> PoolConfigFile {
        let base = base.clone();
        PoolConfigFile {
            min_size: self.min_size.or(base.min_size),
            max_size: self.max_size.or(base.max_size),
            target_utilization: self.target_utilization.or(base.target_utilization),
            scale_up_threshold: self.scale_up_threshold.or(base.scale_up_threshold),
            scale_down_threshold: self.scale_down_threshold.or(base.scale_down_threshold),
            scale_factor: self.scale_factor.or(base.scale_factor),
            monitoring_interval: self.monitoring_interval.or(base.monitoring_interval),
            auto_scaling_enabled: self.auto_scaling_enabled.or(base.auto_scaling_enabled),
            cooldown: self.cooldown.or(base.cooldown),
            history_limit: self.history_limit.or(base.history_limit),
            adapter_timeout: self.adapter_timeout.or(base.adapter_timeout),
            host_memory_limit_percent: self
                .host_memory_limit_percent
                .or(base.host_memory_limit_percent),
            host_cpu_limit_percent: self.host_cpu_limit_percent.or(base.host_cpu_limit_percent),
            host_sample_window: self.host_sample_window.or(base.host_sample_window),
        }
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl From<&PoolConfig> for PoolConfigFile {
    fn from(config: &PoolConfig) -> Self {
        Self {
            min_size: Some(config.min_size),
            max_size: Some(config.max_size),
            target_utilization: Some(config.target_utilization),
            scale_up_threshold: Some(config.scale_up_threshold),
            scale_down_threshold: Some(config.scale_down_threshold),
            scale_factor: Some(config.scale_factor),
            monitoring_interval: Some(format_duration(config.monitoring_interval)),
            auto_scaling_enabled: Some(config.auto_scaling_enabled),
            cooldown: Some(format_duration(config.cooldown)),
            history_limit: Some(config.history_limit),
            adapter_timeout: Some(format_duration(config.adapter_timeout)),
            host_memory_limit_percent: Some(config.host_memory_limit_percent),
            host_cpu_limit_percent: Some(config.host_cpu_limit_percent),
            host_sample_window: Some(format_duration(config.host_sample_window)),
        }
    }
}

fn duration_field(
    field: &'static str,
    value: Option<String>,
    default: Duration,
) -> ConfigResult<Duration> {
    match value {
        None => Ok(default),
        Some(raw) => parse_duration(&raw).ok_or(ConfigError::Duration { field, value: raw }),
    }
}

/// Parse a duration string like "5s", "500ms", "1m".
///
/// A bare number is read as seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        ms.parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>().ok().map(|m| Duration::from_secs(m * 60))
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

/// Inverse of `parse_duration`, choosing the coarsest exact unit.
pub fn format_duration(d: Duration) -> String {
    let millis = d.as_millis();
    if millis % 1000 != 0 {
        format!("{millis}ms")
    } else if d.as_secs() > 0 && d.as_secs() % 60 == 0 {
        format!("{}m", d.as_secs() / 60)
    } else {
        format!("{}s", d.as_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        PoolConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_min_above_max() {
        let config = PoolConfig {
            min_size: 20,
            max_size: 10,
            ..PoolConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_zero_min_size() {
        let config = PoolConfig {
            min_size: 0,
            ..PoolConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_misordered_thresholds() {
        let config = PoolConfig {
            scale_down_threshold: 0.75,
            ..PoolConfig::default()
        };
        assert!(config.validate().is_err());

        let config = PoolConfig {
            scale_up_threshold: 0.6,
            ..PoolConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_threshold_outside_unit_interval() {
        let config = PoolConfig {
            scale_up_threshold: 1.2,
            ..PoolConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_non_growing_scale_factor() {
        let config = PoolConfig {
            scale_factor: 1.0,
            ..PoolConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn contains_size_is_inclusive() {
        let config = PoolConfig {
            min_size: 2,
            max_size: 20,
            ..PoolConfig::default()
        };
        assert!(config.contains_size(2));
        assert!(config.contains_size(20));
        assert!(!config.contains_size(1));
        assert!(!config.contains_size(21));
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let config = PoolConfig::from_toml_str("").unwrap();
        assert_eq!(config, PoolConfig::default());
    }

    #[test]
    fn toml_overrides_merge_over_defaults() {
        let config = PoolConfig::from_toml_str(
            r#"
            min_size = 4
            max_size = 40
            monitoring_interval = "5s"
            cooldown = "2m"
            host_sample_window = "250ms"
            auto_scaling_enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.min_size, 4);
        assert_eq!(config.max_size, 40);
        assert_eq!(config.monitoring_interval, Duration::from_secs(5));
        assert_eq!(config.cooldown, Duration::from_secs(120));
        assert_eq!(config.host_sample_window, Duration::from_millis(250));
        assert!(!config.auto_scaling_enabled);
        assert_eq!(config.scale_factor, 1.5);
    }

    #[test]
    fn toml_with_bad_duration_is_rejected() {
        let err = PoolConfig::from_toml_str(r#"cooldown = "soon""#).unwrap_err();
        assert!(matches!(err, ConfigError::Duration { field: "cooldown", .. }));
    }

    #[test]
    fn toml_with_invalid_bounds_is_rejected() {
        let err = PoolConfig::from_toml_str("min_size = 60").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn from_file_reads_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_size = 12\nscale_factor = 2.0").unwrap();

        let config = PoolConfig::from_file(file.path()).unwrap();
        assert_eq!(config.max_size, 12);
        assert_eq!(config.scale_factor, 2.0);
    }

    #[test]
    fn from_file_missing_path_is_read_error() {
        let err = PoolConfig::from_file(Path::new("/nonexistent/poolgrid.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read(_)));
    }

    #[test]
    fn file_form_round_trips_through_toml() {
        let config = PoolConfig {
            host_sample_window: Duration::from_millis(750),
            cooldown: Duration::from_secs(90),
            ..PoolConfig::default()
        };
        let text = PoolConfigFile::from(&config).to_toml_string().unwrap();
        assert_eq!(PoolConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn overlay_prefers_own_fields() {
        let base = PoolConfigFile {
            max_size: Some(40),
            cooldown: Some("30s".to_string()),
            ..PoolConfigFile::default()
        };
        let own = PoolConfigFile {
            max_size: Some(10),
            ..PoolConfigFile::default()
        };
        let config = own.overlay(&base).into_config().unwrap();
        assert_eq!(config.max_size, 10);
        assert_eq!(config.cooldown, Duration::from_secs(30));
    }

    #[test]
    fn parse_duration_units() {
        assert_eq!(parse_duration("30s"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("10"), Some(Duration::from_secs(10)));
        assert_eq!(parse_duration("fast"), None);
    }

    #[test]
    fn format_duration_picks_exact_unit() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(120)), "2m");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1500ms");
        assert_eq!(format_duration(Duration::ZERO), "0s");
    }
}
