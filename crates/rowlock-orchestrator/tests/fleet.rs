//! Scaling rounds against in-process metrics endpoints

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Json, Router};
use rowlock_common::RewardMetrics;
use rowlock_orchestrator::{LoggingScaleTarget, Orchestrator, OrchestratorConfig};
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Serve a fixed `/metrics` body on an ephemeral port
async fn instance(reward: f64) -> String {
    let app = Router::new().route(
        "/metrics",
        get(move || async move {
            Json(RewardMetrics {
                cumulative_reward: reward,
                population: 3,
                avg_rollback: 0.0,
                epoch: 1,
            })
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// An address nothing listens on
async fn dead_instance() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

fn orchestrator(instances: Vec<String>) -> (Orchestrator, Arc<LoggingScaleTarget>) {
    let target = Arc::new(LoggingScaleTarget::new("test"));
    let config = OrchestratorConfig {
        instances,
        poll_timeout_ms: 500,
        ..OrchestratorConfig::default()
    };
    (Orchestrator::new(config, target.clone()).unwrap(), target)
}

#[tokio::test]
async fn two_instances_above_mean() {
    let mut instances = Vec::new();
    for reward in [-10.0, -20.0, -30.0, -40.0] {
        instances.push(instance(reward).await);
    }
    let (orch, target) = orchestrator(instances);

    assert_eq!(orch.round().await.unwrap(), Some(2));
    assert_eq!(target.decisions(), vec![2]);
}

#[tokio::test]
async fn equal_rewards_keep_one() {
    let mut instances = Vec::new();
    for _ in 0..3 {
        instances.push(instance(-15.0).await);
    }
    let (orch, target) = orchestrator(instances);

    assert_eq!(orch.round().await.unwrap(), Some(1));
    assert_eq!(target.last(), Some(1));
}

#[tokio::test]
async fn unreachable_instances_are_skipped() {
    let instances = vec![
        instance(-10.0).await,
        dead_instance().await,
        instance(-30.0).await,
    ];
    let (orch, target) = orchestrator(instances);

    // Mean of the two that answered is -20; one is above it
    assert_eq!(orch.round().await.unwrap(), Some(1));
    assert_eq!(target.decisions(), vec![1]);
}

#[tokio::test]
async fn silent_fleet_makes_no_call() {
    let (orch, target) = orchestrator(vec![dead_instance().await]);

    assert_eq!(orch.round().await.unwrap(), None);
    assert!(target.decisions().is_empty());

    let (orch, target) = orchestrator(Vec::new());
    assert_eq!(orch.round().await.unwrap(), None);
    assert!(target.decisions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn first_round_waits_one_interval() {
    let target = Arc::new(LoggingScaleTarget::new("test"));
    let config = OrchestratorConfig {
        interval_secs: 30,
        ..OrchestratorConfig::default()
    };
    let orch = Arc::new(Orchestrator::new(config, target.clone()).unwrap());
    let (stop_tx, stop_rx) = watch::channel(false);
    let runner = {
        let orch = Arc::clone(&orch);
        tokio::spawn(async move { orch.run(stop_rx).await })
    };

    tokio::time::sleep(Duration::from_secs(29)).await;
    assert_eq!(orch.rounds(), 0);
    assert!(target.decisions().is_empty());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(orch.rounds(), 1);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(orch.rounds(), 2);

    stop_tx.send(true).unwrap();
    runner.await.unwrap();
}
