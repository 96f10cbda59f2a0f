//! Records of pool size changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What caused an adjustment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "trigger", rename_all = "snake_case")]
pub enum AdjustmentTrigger {
    /// The control loop resized the pool at the given utilization (fraction).
    Automatic { utilization: f64 },
    /// An operator forced the size.
    Manual,
}

/// One entry in the manager's bounded adjustment history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentRecord {
    pub timestamp: DateTime<Utc>,
    pub pool_name: String,
    pub old_size: u32,
    pub new_size: u32,
    pub reason: String,
    #[serde(flatten)]
    pub trigger: AdjustmentTrigger,
}

impl AdjustmentRecord {
    pub fn is_manual(&self) -> bool {
        self.trigger == AdjustmentTrigger::Manual
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_record_serializes_trigger_tag() {
        let record = AdjustmentRecord {
            timestamp: Utc::now(),
            pool_name: "redis".to_string(),
            old_size: 10,
            new_size: 15,
            reason: "maintenance window".to_string(),
            trigger: AdjustmentTrigger::Manual,
        };
        assert!(record.is_manual());

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["trigger"], "manual");
        assert_eq!(json["new_size"], 15);
    }

    #[test]
    fn automatic_record_carries_utilization() {
        let record = AdjustmentRecord {
            timestamp: Utc::now(),
            pool_name: "postgres".to_string(),
            old_size: 5,
            new_size: 8,
            reason: "high utilization".to_string(),
            trigger: AdjustmentTrigger::Automatic { utilization: 0.9 },
        };
        assert!(!record.is_manual());

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["trigger"], "automatic");
        assert_eq!(json["utilization"], 0.9);
    }
}
