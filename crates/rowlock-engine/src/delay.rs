//! Pluggable pauses for backoff and simulated transaction work
//!
//! Workers never call `tokio::time::sleep` directly. Production uses
//! [`TokioDelay`]; tests use [`NoDelay`] or [`RecordingDelay`] to assert on
//! which pauses happened instead of on wall-clock time.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

/// Why a worker is pausing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pause {
    /// Tit-for-tat backoff before the attempt that follows a collision
    Backoff,
    /// Simulated work while holding a row
    CriticalSection,
}

/// Suspension point used by workers
#[async_trait]
pub trait Delay: Send + Sync + 'static {
    async fn pause(&self, kind: Pause, duration: Duration);
}

/// Sleeps on the tokio timer (honours a paused test clock)
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn pause(&self, _kind: Pause, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Never waits
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDelay;

#[async_trait]
impl Delay for NoDelay {
    async fn pause(&self, _kind: Pause, _duration: Duration) {}
}

/// Records every pause, then sleeps on the tokio timer
#[derive(Debug, Default)]
pub struct RecordingDelay {
    log: Mutex<Vec<(Pause, Duration)>>,
}

impl RecordingDelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// All pauses so far, in order
    pub fn pauses(&self) -> Vec<(Pause, Duration)> {
        self.log.lock().clone()
    }

    /// Pauses of one kind
    pub fn count(&self, kind: Pause) -> usize {
        self.log.lock().iter().filter(|(k, _)| *k == kind).count()
    }
}

#[async_trait]
impl Delay for RecordingDelay {
    async fn pause(&self, kind: Pause, duration: Duration) {
        self.log.lock().push((kind, duration));
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_recording_delay_keeps_order() {
        let delay = RecordingDelay::new();
        let start = tokio::time::Instant::now();

        delay.pause(Pause::Backoff, Duration::from_millis(10)).await;
        delay
            .pause(Pause::CriticalSection, Duration::from_millis(5))
            .await;

        assert_eq!(
            delay.pauses(),
            vec![
                (Pause::Backoff, Duration::from_millis(10)),
                (Pause::CriticalSection, Duration::from_millis(5)),
            ]
        );
        assert_eq!(delay.count(Pause::Backoff), 1);
        assert!(start.elapsed() >= Duration::from_millis(15));
    }
}
