//! End-to-end contention and scaling scenarios

use std::sync::Arc;
use std::time::Duration;

use rowlock_common::{AttemptStatus, LockError, RowlockError, WorkerPolicy};
use rowlock_engine::{
    Engine, EngineConfig, EngineMetrics, Ledger, NoDelay, Pause, RecordingDelay, RequestSource,
    ResourceLockTable, RewardAggregator, Worker, WorkerContext,
};
use tokio::time::Instant;

fn shared_context(rows: usize) -> WorkerContext {
    WorkerContext {
        table: Arc::new(ResourceLockTable::new(rows)),
        source: RequestSource::bounded(64),
        aggregator: Arc::new(RewardAggregator::new()),
        ledger: Arc::new(Ledger::new()),
        delay: Arc::new(NoDelay),
        metrics: Arc::new(EngineMetrics::new().unwrap()),
        critical_section: Duration::from_millis(5),
        idle_poll: Duration::from_millis(50),
    }
}

fn config(rows: usize, workers: usize) -> EngineConfig {
    EngineConfig {
        rows,
        workers,
        epoch_interval_ms: 3_600_000,
        idle_poll_ms: 20,
        critical_section_ms: 1,
        ..EngineConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn two_workers_race_for_one_row() {
    let base = shared_context(1);
    let delay_a = Arc::new(RecordingDelay::new());
    let delay_b = Arc::new(RecordingDelay::new());
    let ctx_a = WorkerContext {
        delay: delay_a.clone(),
        ..base.clone()
    };
    let ctx_b = WorkerContext {
        delay: delay_b.clone(),
        ..base.clone()
    };

    let a = Worker::new("a", 1, WorkerPolicy::default());
    let b = Worker::new("b", 2, WorkerPolicy::default());

    // a acquires and parks in its critical section; b tries while a holds the row
    let (ra, rb) = tokio::join!(a.attempt(&ctx_a, 0, None), b.attempt(&ctx_b, 0, None));
    let (ra, rb) = (ra.unwrap(), rb.unwrap());

    assert_eq!(ra.status, AttemptStatus::Ok);
    assert_eq!(ra.rollback(), 0);
    assert_eq!(rb.status, AttemptStatus::Collision);
    assert_eq!(rb.rollback(), 1);
    assert!(!a.last_collision());
    assert!(b.last_collision());

    // b saw an empty epoch; a saw b's rollback
    assert_eq!(rb.reward, -5.0);
    assert_eq!(ra.latency_ms, 5);
    assert!((ra.reward - (-5.0 - 0.3)).abs() < 1e-9);
    assert_eq!(base.aggregator.average_rollback(), 0.5);

    // Only the collided worker backs off before its next attempt
    let start = Instant::now();
    let next_b = b.attempt(&ctx_b, 0, None).await.unwrap();
    assert_eq!(delay_b.count(Pause::Backoff), 1);
    assert_eq!(delay_b.pauses()[0], (Pause::Backoff, Duration::from_millis(10)));
    assert!(start.elapsed() >= Duration::from_millis(10));
    assert_eq!(next_b.status, AttemptStatus::Ok);
    assert!(!b.last_collision());

    a.attempt(&ctx_a, 0, None).await.unwrap();
    assert_eq!(delay_a.count(Pause::Backoff), 0);
}

#[tokio::test]
async fn submitted_request_is_answered_and_credited() {
    let engine = Engine::with_delay(config(2, 3), Arc::new(NoDelay)).unwrap();
    engine.start();

    let outcome = engine.submit(1, Some(10)).unwrap().await.unwrap();
    assert_eq!(outcome.status, AttemptStatus::Ok);
    assert_eq!(outcome.row, 1);
    assert_eq!(engine.balance(1).unwrap(), 10);
    assert_eq!(engine.balance(0).unwrap(), 0);

    let metrics = engine.reward_metrics();
    assert_eq!(metrics.population, 3);
    assert_eq!(metrics.epoch, 0);

    engine.shutdown().await;
}

#[tokio::test]
async fn second_start_keeps_one_population() {
    let engine = Engine::with_delay(config(1, 3), Arc::new(NoDelay)).unwrap();
    engine.start();
    engine.start();

    assert_eq!(engine.controller().population(), 3);
    assert_eq!(engine.metrics().population.get(), 3);

    let outcome = engine.submit(0, Some(2)).unwrap().await.unwrap();
    assert_eq!(outcome.status, AttemptStatus::Ok);

    engine.shutdown().await;
}

#[tokio::test]
async fn unknown_rows_are_rejected_at_submit() {
    let engine = Engine::with_delay(config(2, 1), Arc::new(NoDelay)).unwrap();
    engine.start();

    let err = engine.submit(2, None).unwrap_err();
    assert!(matches!(
        err,
        RowlockError::Lock(LockError::UnknownRow { row: 2, rows: 2 })
    ));
    assert!(engine.balance(5).is_err());

    engine.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn hot_row_under_parallel_workers() {
    let engine = Engine::new(config(1, 4)).unwrap();
    engine.start();

    let replies: Vec<_> = (0..200)
        .map(|_| engine.submit(0, Some(1)).unwrap())
        .collect();

    let mut ok = 0i64;
    let mut collisions = 0i64;
    for reply in replies {
        match reply.await.unwrap().status {
            AttemptStatus::Ok => ok += 1,
            AttemptStatus::Collision => collisions += 1,
        }
    }

    assert_eq!(ok + collisions, 200);
    assert!(ok > 0);
    // Only attempts that held the row may write
    assert_eq!(engine.balance(0).unwrap(), ok);
    assert_eq!(engine.context().table.held_count(), 0);
    assert_eq!(engine.metrics().attempts_total.get(), 200);
    assert_eq!(engine.metrics().collisions_total.get() as i64, collisions);

    engine.shutdown().await;
}

#[tokio::test]
async fn evaluation_keeps_population_and_zeroes_clones() {
    let engine = Engine::with_delay(config(1, 10), Arc::new(NoDelay)).unwrap();
    engine.start();

    for _ in 0..30 {
        engine.submit(0, None).unwrap().await.unwrap();
    }

    let report = engine.evaluate().unwrap();
    assert_eq!(report.population_before, 10);
    assert_eq!(report.population_after, 10);
    assert_eq!(report.terminated.len(), 2);
    assert_eq!(report.cloned.len(), 2);

    let workers = engine.workers();
    assert_eq!(workers.len(), 10);
    for (_, clone) in &report.cloned {
        let snap = workers.iter().find(|w| &w.name == clone).unwrap();
        assert_eq!(snap.cumulative_reward, 0.0);
        assert!(!snap.last_collision);
    }
    assert_eq!(engine.reward_metrics().epoch, 1);

    engine.shutdown().await;
}
