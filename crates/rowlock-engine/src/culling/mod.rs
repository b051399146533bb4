//! Replicator-style selection: cull the bottom fifth, clone the top fifth

pub mod selection;

pub use selection::{fleet_target, SelectionPlan};
