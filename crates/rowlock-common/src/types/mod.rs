//! Core data types shared by the engine and its shells

pub mod attempt;
pub mod metrics;
pub mod policy;
