//! Reward metrics exposed by each service instance and read by the fleet orchestrator

use serde::{Deserialize, Serialize};

/// Body of `GET /metrics`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardMetrics {
    /// Sum of cumulative reward over the currently live workers
    pub cumulative_reward: f64,
    /// Live population size
    #[serde(default)]
    pub population: usize,
    /// Current epoch's mean rollback rate
    #[serde(default)]
    pub avg_rollback: f64,
    /// Number of completed controller epochs
    #[serde(default)]
    pub epoch: u64,
}

/// Public view of one live worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSnapshot {
    pub name: String,
    pub beta: f64,
    pub gamma: f64,
    pub delta_ms: u64,
    pub cumulative_reward: f64,
    pub last_collision: bool,
    pub alive: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_metrics_body_parses() {
        // Older instances only report the reward
        let metrics: RewardMetrics =
            serde_json::from_str(r#"{"cumulative_reward": -12.5}"#).unwrap();
        assert_eq!(metrics.cumulative_reward, -12.5);
        assert_eq!(metrics.population, 0);
    }
}
