//! # Rowlock Engine
//!
//! Row-lock contention simulation with responsibility-aware rewards and
//! replicator-style population scaling.
//!
//! ## Reward
//!
//! ```text
//! r = -latency_ms - β·rollback - γ·avg_rollback
//! ```
//!
//! Where:
//! - latency_ms: whole milliseconds from try-acquire to release
//! - rollback: 1 if the row was already held, else 0
//! - avg_rollback: population mean rollback rate for the current epoch
//!
//! ## Backoff
//!
//! Memory-1 tit-for-tat: a worker whose last attempt collided waits δ ms
//! before its next attempt.
//!
//! ## Selection
//!
//! Every epoch the bottom `max(1, n/5)` workers by cumulative reward are
//! terminated and the top `max(1, n/5)` are cloned with fresh reward.

pub mod config;
pub mod controller;
pub mod culling;
pub mod delay;
pub mod engine;
pub mod fitness;
pub mod ledger;
pub mod source;
pub mod table;
pub mod telemetry;
pub mod worker;

pub use config::EngineConfig;
pub use controller::{EpochReport, PopulationController};
pub use culling::{fleet_target, SelectionPlan};
pub use delay::{Delay, NoDelay, Pause, RecordingDelay, TokioDelay};
pub use engine::Engine;
pub use fitness::{RewardAggregator, RollbackSnapshot};
pub use ledger::Ledger;
pub use source::{LockRequest, RequestSource, SyntheticTraffic};
pub use table::{ResourceLockTable, RowGuard};
pub use telemetry::EngineMetrics;
pub use worker::{Worker, WorkerContext};
