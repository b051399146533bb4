//! Router tests driven through `tower::ServiceExt::oneshot`

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use rowlock_engine::{Engine, EngineConfig, NoDelay};
use rowlock_service::{router, AppState};
use serde_json::Value;
use tower::ServiceExt;

fn engine(rows: usize, workers: usize) -> Arc<Engine> {
    let config = EngineConfig {
        rows,
        workers,
        epoch_interval_ms: 3_600_000,
        idle_poll_ms: 20,
        ..EngineConfig::default()
    };
    Arc::new(Engine::with_delay(config, Arc::new(NoDelay)).unwrap())
}

fn app(engine: &Arc<Engine>, timeout: Duration) -> Router {
    router(AppState::new(Arc::clone(engine), timeout))
}

async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_lock(row: usize, body: Option<&str>) -> Request<Body> {
    let builder = Request::post(format!("/accounts/{row}/lock"));
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn lock_on_free_row_credits_balance() {
    let engine = engine(2, 2);
    engine.start();
    let app = app(&engine, Duration::from_secs(5));

    let (status, body) = call(app.clone(), post_lock(1, Some(r#"{"amount": 25}"#))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "OK");
    assert!(body["latency_ms"].is_u64());

    let (status, body) = call(app.clone(), get("/accounts/1/balance")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance"], 25);

    let (_, body) = call(app, get("/accounts/0/balance")).await;
    assert_eq!(body["balance"], 0);

    engine.shutdown().await;
}

#[tokio::test]
async fn lock_without_body_is_accepted() {
    let engine = engine(1, 1);
    engine.start();
    let app = app(&engine, Duration::from_secs(5));

    let (status, body) = call(app.clone(), post_lock(0, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "OK");

    let (_, body) = call(app, get("/accounts/0/balance")).await;
    assert_eq!(body["balance"], 0);

    engine.shutdown().await;
}

#[tokio::test]
async fn malformed_payload_is_rejected_before_any_attempt() {
    let engine = engine(1, 1);
    engine.start();
    let app = app(&engine, Duration::from_secs(5));

    for payload in [r#"{"amount": "fifty"}"#, r#"{"amount": 5"#] {
        let (status, body) = call(app.clone(), post_lock(0, Some(payload))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload {payload}");
        assert!(body["error"].is_string());
    }

    assert_eq!(engine.metrics().attempts_total.get(), 0);
    assert_eq!(engine.context().aggregator.epoch_len(), 0);
    let (_, body) = call(app.clone(), get("/accounts/0/balance")).await;
    assert_eq!(body["balance"], 0);

    // A JSON content type with an empty body is still "no payload"
    let (status, body) = call(app, post_lock(0, Some(""))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "OK");

    engine.shutdown().await;
}

#[tokio::test]
async fn unknown_row_is_not_found() {
    let engine = engine(2, 1);
    engine.start();
    let app = app(&engine, Duration::from_secs(5));

    let (status, body) = call(app.clone(), post_lock(7, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains('7'));

    let (status, _) = call(app, get("/accounts/2/balance")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    engine.shutdown().await;
}

#[tokio::test]
async fn unanswered_lock_times_out() {
    // Never started: nothing drains the queue
    let engine = engine(1, 1);
    let app = app(&engine, Duration::from_millis(50));

    let (status, body) = call(app, post_lock(0, None)).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn metrics_sum_live_rewards() {
    let engine = engine(1, 3);
    engine.start();
    let app = app(&engine, Duration::from_secs(5));

    for _ in 0..5 {
        let (status, _) = call(app.clone(), post_lock(0, None)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = call(app.clone(), get("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["population"], 3);
    assert_eq!(body["epoch"], 0);

    let expected: f64 = engine.workers().iter().map(|w| w.cumulative_reward).sum();
    let reported = body["cumulative_reward"].as_f64().unwrap();
    assert!((reported - expected).abs() < 1e-9);

    let (status, body) = call(app, get("/workers")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);

    engine.shutdown().await;
}

#[tokio::test]
async fn prometheus_and_health() {
    let engine = engine(1, 1);
    engine.start();
    let app = app(&engine, Duration::from_secs(5));

    call(app.clone(), post_lock(0, None)).await;

    let response = app.clone().oneshot(get("/metrics/prometheus")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("rowlock_attempts_total 1"));

    let (status, body) = call(app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    engine.shutdown().await;
}
