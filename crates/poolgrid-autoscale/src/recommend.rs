//! Advisory sizing report for operators.
//!
//! Unlike the control loop, recommendations ignore cooldowns and the host
//! guard and never change anything; they describe what an operator may
//! want to do given the latest metrics.

use serde::Serialize;

use poolgrid_core::{PoolConfig, PoolMetrics};

const HIGH_UTILIZATION_PERCENT: f64 = 90.0;
const LOW_UTILIZATION_PERCENT: f64 = 20.0;
const FAILURE_RATE_LIMIT: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    ScaleUp,
    ScaleDown,
    Investigate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub pool_name: String,
    pub action: RecommendedAction,
    pub priority: Priority,
    pub current_size: u32,
    /// Proposed size for scale actions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_size: Option<u32>,
    pub utilization_percentage: f64,
    pub reason: String,
}

/// Build recommendations for one pool.
pub fn recommend(metrics: &PoolMetrics, config: &PoolConfig) -> Vec<Recommendation> {
    let mut out = Vec::new();
    let current = metrics.current_size;
    let utilization = metrics.utilization_percentage;

    let base = |action, priority, suggested_size, reason: String| Recommendation {
        pool_name: metrics.pool_name.clone(),
        action,
        priority,
        current_size: current,
        suggested_size,
        utilization_percentage: utilization,
        reason,
    };

    if utilization > HIGH_UTILIZATION_PERCENT && current < config.max_size {
        let suggested = ((f64::from(current) * 1.5) as u32)
            .max(current + 1)
            .min(config.max_size);
        out.push(base(
            RecommendedAction::ScaleUp,
            Priority::High,
            Some(suggested),
            format!("utilization at {utilization:.1}%, pool is close to saturation"),
        ));
    } else if utilization < LOW_UTILIZATION_PERCENT && current > config.min_size {
        let suggested = ((f64::from(current) * 0.7) as u32).max(config.min_size);
        out.push(base(
            RecommendedAction::ScaleDown,
            Priority::Medium,
            Some(suggested),
            format!("utilization at {utilization:.1}%, pool is oversized"),
        ));
    }

    let failure_rate = metrics.failure_rate();
    if failure_rate > FAILURE_RATE_LIMIT {
        out.push(base(
            RecommendedAction::Investigate,
            Priority::High,
            None,
            format!(
                "failure rate {:.1}% ({} of {} requests)",
                failure_rate * 100.0,
                metrics.failed_requests,
                metrics.total_requests
            ),
        ));
    }

    out
}
