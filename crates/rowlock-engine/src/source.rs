//! Request source: bounded hand-off queue between producers and workers
//!
//! Producers (the transport shell, [`SyntheticTraffic`]) push [`LockRequest`]s;
//! every worker pulls from the same queue with a bounded wait so it can
//! recheck its liveness between requests. Each request is consumed by exactly
//! one worker.

use std::sync::Arc;
use std::time::Duration;

use rand::{rngs::StdRng, Rng, SeedableRng};
use rowlock_common::{AttemptOutcome, ConfigError, LockError};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// One lock request
#[derive(Debug)]
pub struct LockRequest {
    /// Row to lock
    pub row: usize,
    /// Amount credited to the row's balance while it is held
    pub amount: Option<i64>,
    /// Where to deliver the attempt outcome, if anyone is waiting
    pub reply: Option<oneshot::Sender<AttemptOutcome>>,
}

impl LockRequest {
    /// Fire-and-forget request with no payload
    pub fn new(row: usize) -> Self {
        Self {
            row,
            amount: None,
            reply: None,
        }
    }

    pub fn with_amount(mut self, amount: i64) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Attach a reply channel and return its receiving half
    pub fn with_reply(mut self) -> (Self, oneshot::Receiver<AttemptOutcome>) {
        let (tx, rx) = oneshot::channel();
        self.reply = Some(tx);
        (self, rx)
    }
}

/// Multi-producer, multi-consumer request queue
#[derive(Debug, Clone)]
pub struct RequestSource {
    tx: mpsc::Sender<LockRequest>,
    rx: Arc<Mutex<mpsc::Receiver<LockRequest>>>,
}

impl RequestSource {
    /// Create a queue holding at most `capacity` pending requests
    pub fn bounded(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
        }
    }

    /// Enqueue without waiting
    pub fn submit(&self, request: LockRequest) -> Result<(), LockError> {
        self.tx.try_send(request).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => LockError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => LockError::SourceClosed,
        })
    }

    /// Enqueue, waiting for queue space
    pub async fn send(&self, request: LockRequest) -> Result<(), LockError> {
        self.tx
            .send(request)
            .await
            .map_err(|_| LockError::SourceClosed)
    }

    /// Pull the next request, waiting at most `wait`.
    ///
    /// `Ok(None)` means nothing arrived in time, which is the normal idle
    /// state under sparse load. `Err(SourceClosed)` means the queue was closed
    /// and drained.
    pub async fn next(&self, wait: Duration) -> Result<Option<LockRequest>, LockError> {
        let recv = async {
            let mut rx = self.rx.lock().await;
            rx.recv().await
        };
        match tokio::time::timeout(wait, recv).await {
            Ok(Some(request)) => Ok(Some(request)),
            Ok(None) => Err(LockError::SourceClosed),
            Err(_) => Ok(None),
        }
    }

    /// Stop accepting requests. Already queued requests are still delivered.
    pub async fn close(&self) {
        self.rx.lock().await.close();
    }

    /// Approximate number of queued requests
    pub fn pending(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }
}

/// Synthetic producer: uniform random rows at a fixed rate
#[derive(Debug, Clone)]
pub struct SyntheticTraffic {
    rate: f64,
    rows: usize,
    period: Duration,
    seed: Option<u64>,
}

impl SyntheticTraffic {
    /// `rate` requests per second over rows `0..rows`
    pub fn new(rate: f64, rows: usize) -> Result<Self, ConfigError> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(ConfigError::NotPositive {
                field: "rate",
                actual: rate,
            });
        }
        if rows == 0 {
            return Err(ConfigError::TooSmall {
                field: "rows",
                minimum: 1,
                actual: 0,
            });
        }
        // Rates too small for a representable period are rejected too
        let period = Duration::try_from_secs_f64(1.0 / rate).map_err(|_| {
            ConfigError::NotPositive {
                field: "rate",
                actual: rate,
            }
        })?;
        Ok(Self {
            rate,
            rows,
            period,
            seed: None,
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Time between two requests
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Spawn the producer; it stops when the source closes
    pub fn spawn(self, source: RequestSource) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut rng = match self.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let mut ticker = tokio::time::interval(self.period);
            info!(rate = self.rate, rows = self.rows, "Synthetic traffic started");

            let mut produced = 0u64;
            loop {
                ticker.tick().await;
                let row = rng.gen_range(0..self.rows);
                match source.submit(LockRequest::new(row)) {
                    Ok(()) => produced += 1,
                    Err(LockError::QueueFull) => debug!(row, "Queue full, dropping request"),
                    Err(_) => break,
                }
            }
            info!(produced, "Synthetic traffic stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_submit_and_next() {
        let source = RequestSource::bounded(4);
        source.submit(LockRequest::new(2).with_amount(7)).unwrap();
        assert_eq!(source.pending(), 1);

        let req = source
            .next(Duration::from_millis(10))
            .await
            .unwrap()
            .expect("request queued");
        assert_eq!(req.row, 2);
        assert_eq!(req.amount, Some(7));
        assert!(req.reply.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_is_not_an_error() {
        let source = RequestSource::bounded(4);
        let got = source.next(Duration::from_millis(50)).await.unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn test_queue_full() {
        let source = RequestSource::bounded(1);
        source.submit(LockRequest::new(0)).unwrap();
        assert_eq!(
            source.submit(LockRequest::new(0)).unwrap_err(),
            LockError::QueueFull
        );
    }

    #[tokio::test]
    async fn test_close_drains_then_reports_closed() {
        let source = RequestSource::bounded(4);
        source.submit(LockRequest::new(1)).unwrap();
        source.close().await;

        assert_eq!(
            source.submit(LockRequest::new(1)).unwrap_err(),
            LockError::SourceClosed
        );
        assert!(source.next(Duration::from_millis(10)).await.unwrap().is_some());
        assert_eq!(
            source.next(Duration::from_millis(10)).await.unwrap_err(),
            LockError::SourceClosed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_synthetic_traffic_stays_in_range() {
        let source = RequestSource::bounded(64);
        let handle = SyntheticTraffic::new(1000.0, 3)
            .unwrap()
            .with_seed(7)
            .spawn(source.clone());

        for _ in 0..20 {
            let req = source
                .next(Duration::from_secs(1))
                .await
                .unwrap()
                .expect("traffic is flowing");
            assert!(req.row < 3);
        }

        source.close().await;
        // Drain whatever is left so the producer observes the closed queue
        while source.next(Duration::from_millis(5)).await.is_ok() {}
        handle.await.unwrap();
    }

    #[test]
    fn test_synthetic_traffic_rejects_unusable_rates() {
        for rate in [0.0, -5.0, f64::NAN, f64::INFINITY, f64::MIN_POSITIVE] {
            let err = SyntheticTraffic::new(rate, 1).unwrap_err();
            assert!(
                matches!(err, ConfigError::NotPositive { field: "rate", .. }),
                "rate {rate} accepted"
            );
        }
        assert!(matches!(
            SyntheticTraffic::new(10.0, 0).unwrap_err(),
            ConfigError::TooSmall { field: "rows", .. }
        ));

        let traffic = SyntheticTraffic::new(4.0, 4).unwrap();
        assert_eq!(traffic.period(), Duration::from_millis(250));
        assert_eq!(traffic.rate(), 4.0);
    }
}
