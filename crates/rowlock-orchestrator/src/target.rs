//! Where scaling decisions go

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rowlock_common::Result;
use tracing::info;

/// Receiver of desired replica counts
#[async_trait]
pub trait ScaleTarget: Send + Sync {
    async fn set_desired(&self, replicas: usize) -> Result<()>;
}

/// Logs every decision and keeps a history; applies nothing
#[derive(Debug, Default)]
pub struct LoggingScaleTarget {
    name: String,
    history: Mutex<Vec<(DateTime<Utc>, usize)>>,
}

impl LoggingScaleTarget {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Desired counts in the order they were decided
    pub fn decisions(&self) -> Vec<usize> {
        self.history.lock().iter().map(|&(_, n)| n).collect()
    }

    pub fn last(&self) -> Option<usize> {
        self.history.lock().last().map(|&(_, n)| n)
    }
}

#[async_trait]
impl ScaleTarget for LoggingScaleTarget {
    async fn set_desired(&self, replicas: usize) -> Result<()> {
        info!(target_name = %self.name, replicas, "Scaling decision");
        self.history.lock().push((Utc::now(), replicas));
        Ok(())
    }
}
