//! Reward accounting shared across the population

pub mod aggregator;

pub use aggregator::{RewardAggregator, RollbackSnapshot};
