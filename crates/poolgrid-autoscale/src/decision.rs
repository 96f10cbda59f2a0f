//! Scaling decision for a single pool.

use poolgrid_core::{PoolConfig, PoolMetrics};

/// What the control loop should do with a pool this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleDecision {
    /// Grow to the given size.
    ScaleUp(u32),
    /// Shrink to the given size.
    ScaleDown(u32),
    /// Utilization is within the band, or the pool is already at a bound.
    NoChange,
}

impl ScaleDecision {
    pub fn target(self) -> Option<u32> {
        match self {
            ScaleDecision::ScaleUp(n) | ScaleDecision::ScaleDown(n) => Some(n),
            ScaleDecision::NoChange => None,
        }
    }
}

/// Compare a pool's utilization against the config thresholds.
///
/// A pool whose size lies outside `[min_size, max_size]` is moved to the
/// nearest bound first, whatever its utilization. Every returned target
/// lies within the bounds. Cooldowns and host load are the caller's
/// concern; this only looks at the metrics and bounds.
pub fn evaluate(metrics: &PoolMetrics, config: &PoolConfig) -> ScaleDecision {
    let utilization = metrics.utilization();
    let current = metrics.current_size;

    if current < config.min_size {
        return ScaleDecision::ScaleUp(config.min_size);
    }
    if current > config.max_size {
        return ScaleDecision::ScaleDown(config.max_size);
    }

    if utilization > config.scale_up_threshold && current < config.max_size {
        let scaled = (f64::from(current) * config.scale_factor).round() as u32;
        let desired = scaled
            .max(current + 1)
            .clamp(config.min_size, config.max_size);
        return ScaleDecision::ScaleUp(desired);
    }

    if utilization < config.scale_down_threshold && current > config.min_size {
        let scaled = (f64::from(current) / config.scale_factor).round() as u32;
        let desired = scaled.clamp(config.min_size, config.max_size);
        if desired < current {
            return ScaleDecision::ScaleDown(desired);
        }
    }

    ScaleDecision::NoChange
}

/// Whether the pool is outside its configured bounds.
pub fn out_of_bounds(metrics: &PoolMetrics, config: &PoolConfig) -> bool {
    !config.contains_size(metrics.current_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use poolgrid_core::AdapterMetrics;

    fn metrics(current: u32, max: u32, active: u32) -> PoolMetrics {
        let mut m = PoolMetrics::new("test_pool", current, max);
        m.apply(
            &AdapterMetrics {
                current_size: current,
                max_size: max,
                active_connections: active,
                idle_connections: current.saturating_sub(active),
                ..AdapterMetrics::default()
            },
            Utc::now(),
        );
        m
    }

    #[test]
    fn scale_up_above_threshold() {
        let config = PoolConfig::default();
        // 45 of 50 active → 90%.
        let decision = evaluate(&metrics(5, 50, 45), &config);
        assert_eq!(decision, ScaleDecision::ScaleUp(8));
    }

    #[test]
    fn scale_up_grows_by_at_least_one() {
        let config = PoolConfig {
            scale_factor: 1.1,
            ..PoolConfig::default()
        };
        let decision = evaluate(&metrics(3, 50, 45), &config);
        assert_eq!(decision, ScaleDecision::ScaleUp(4));
    }

    #[test]
    fn scale_up_is_capped_at_max_size() {
        let config = PoolConfig {
            max_size: 20,
            ..PoolConfig::default()
        };
        let decision = evaluate(&metrics(18, 50, 48), &config);
        assert_eq!(decision, ScaleDecision::ScaleUp(20));
    }

    #[test]
    fn no_scale_up_at_max_size() {
        let config = PoolConfig {
            max_size: 20,
            ..PoolConfig::default()
        };
        assert_eq!(evaluate(&metrics(20, 20, 20), &config), ScaleDecision::NoChange);
    }

    #[test]
    fn scale_down_below_threshold() {
        let config = PoolConfig::default();
        // 5 of 50 active → 10%.
        let decision = evaluate(&metrics(10, 50, 5), &config);
        assert_eq!(decision, ScaleDecision::ScaleDown(7));
    }

    #[test]
    fn scale_down_respects_min_size() {
        let config = PoolConfig {
            min_size: 4,
            ..PoolConfig::default()
        };
        let decision = evaluate(&metrics(5, 50, 0), &config);
        assert_eq!(decision, ScaleDecision::ScaleDown(4));
        assert_eq!(evaluate(&metrics(4, 50, 0), &config), ScaleDecision::NoChange);
    }

    #[test]
    fn scale_down_that_rounds_back_to_current_is_no_change() {
        let config = PoolConfig {
            min_size: 1,
            scale_factor: 1.05,
            ..PoolConfig::default()
        };
        assert_eq!(evaluate(&metrics(5, 50, 0), &config), ScaleDecision::NoChange);
    }

    #[test]
    fn no_change_inside_band() {
        let config = PoolConfig::default();
        // 25 of 50 → 50%.
        assert_eq!(evaluate(&metrics(10, 50, 25), &config), ScaleDecision::NoChange);
    }

    #[test]
    fn thresholds_are_strict() {
        let config = PoolConfig::default();
        // Exactly 80% and exactly 30% sit on the band edges.
        assert_eq!(evaluate(&metrics(10, 50, 40), &config), ScaleDecision::NoChange);
        assert_eq!(evaluate(&metrics(10, 50, 15), &config), ScaleDecision::NoChange);
    }

    #[test]
    fn undersized_pool_grows_to_min_size() {
        let config = PoolConfig {
            min_size: 4,
            ..PoolConfig::default()
        };
        // Saturated, but a single growth step would still leave it at 2.
        assert_eq!(evaluate(&metrics(1, 50, 48), &config), ScaleDecision::ScaleUp(4));
        // Inside the utilization band, the bound alone drives the resize.
        assert_eq!(evaluate(&metrics(1, 50, 25), &config), ScaleDecision::ScaleUp(4));
        // Idle pools below the floor still grow, never shrink.
        assert_eq!(evaluate(&metrics(1, 50, 0), &config), ScaleDecision::ScaleUp(4));
    }

    #[test]
    fn oversized_pool_shrinks_to_max_size() {
        let config = PoolConfig {
            max_size: 20,
            ..PoolConfig::default()
        };
        // 40 / 1.5 would land at 27, still above the ceiling.
        assert_eq!(evaluate(&metrics(40, 100, 5), &config), ScaleDecision::ScaleDown(20));
        assert_eq!(evaluate(&metrics(40, 100, 50), &config), ScaleDecision::ScaleDown(20));
        assert_eq!(evaluate(&metrics(40, 100, 95), &config), ScaleDecision::ScaleDown(20));
    }

    #[test]
    fn targets_always_land_within_bounds() {
        let config = PoolConfig {
            min_size: 3,
            max_size: 12,
            ..PoolConfig::default()
        };
        for current in 0..=30 {
            for active in [0, 10, 25, 40, 50] {
                let m = metrics(current, 50, active);
                if let Some(target) = evaluate(&m, &config).target() {
                    assert!(config.contains_size(target), "{current}/{active} -> {target}");
                }
            }
        }
    }

    #[test]
    fn out_of_bounds_reports_pool_position() {
        let config = PoolConfig {
            min_size: 3,
            max_size: 12,
            ..PoolConfig::default()
        };
        assert!(out_of_bounds(&metrics(2, 50, 0), &config));
        assert!(out_of_bounds(&metrics(13, 50, 0), &config));
        assert!(!out_of_bounds(&metrics(3, 50, 0), &config));
        assert!(!out_of_bounds(&metrics(12, 50, 0), &config));
    }

    #[test]
    fn target_extracts_size() {
        assert_eq!(ScaleDecision::ScaleUp(8).target(), Some(8));
        assert_eq!(ScaleDecision::ScaleDown(3).target(), Some(3));
        assert_eq!(ScaleDecision::NoChange.target(), None);
    }
}
