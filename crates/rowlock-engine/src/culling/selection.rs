//! Selection arithmetic shared by the in-process controller and the fleet
//! orchestrator.
//!
//! Both the bottom and the top `k = max(1, n / 5)` are taken from the same
//! ranking, so for `n < 5` they can overlap. With `n == 1` the only member is
//! both culled and cloned.

use rowlock_common::{selection_size, MIN_POPULATION};

/// Which members to cull and which to clone, by index into the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionPlan {
    /// Indices ordered by reward, highest first; ties keep input order
    pub ranked: Vec<usize>,
    /// Bottom `k`, lowest reward last
    pub terminate: Vec<usize>,
    /// Top `k`, highest reward first
    pub clone_from: Vec<usize>,
}

impl SelectionPlan {
    /// Rank `rewards` (given in creation order) and pick the cull/clone sets.
    /// `None` for an empty population.
    pub fn from_rewards(rewards: &[f64]) -> Option<Self> {
        if rewards.is_empty() {
            return None;
        }

        let mut ranked: Vec<usize> = (0..rewards.len()).collect();
        // sort_by is stable: equal rewards stay in creation order
        ranked.sort_by(|&a, &b| rewards[b].total_cmp(&rewards[a]));

        let n = ranked.len();
        let k = selection_size(n);
        Some(Self {
            terminate: ranked[n - k..].to_vec(),
            clone_from: ranked[..k].to_vec(),
            ranked,
        })
    }

    pub fn k(&self) -> usize {
        self.clone_from.len()
    }

    /// Population size once the plan is applied
    pub fn population_after(&self) -> usize {
        self.ranked.len() - self.terminate.len() + self.clone_from.len()
    }
}

/// Desired instance count for a fleet: instances strictly above the mean
/// reward, never fewer than the minimum population. `None` when no instance
/// reported.
pub fn fleet_target(rewards: &[f64]) -> Option<usize> {
    if rewards.is_empty() {
        return None;
    }
    let mean = rewards.iter().sum::<f64>() / rewards.len() as f64;
    let above = rewards.iter().filter(|&&r| r > mean).count();
    Some(above.max(MIN_POPULATION))
}
