//! # Rowlock Service
//!
//! HTTP/JSON shell around one [`Engine`]:
//!
//! | Route | Method | Body |
//! |-------|--------|------|
//! | `/accounts/:row/lock` | POST | `{"result": "OK"\|"COLLISION", "latency_ms"}` |
//! | `/accounts/:row/balance` | GET | `{"balance", "latency_ms"}` |
//! | `/metrics` | GET | reward metrics read by the fleet orchestrator |
//! | `/metrics/prometheus` | GET | Prometheus text exposition |
//! | `/workers` | GET | live worker snapshots |
//! | `/health` | GET | liveness |

pub mod config;

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rowlock_common::{
    BalanceReply, LockError, LockReply, RewardMetrics, RowlockError, WorkerSnapshot, VERSION,
};
use rowlock_engine::Engine;
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, warn};

pub use config::ServiceConfig;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(engine: Arc<Engine>, request_timeout: Duration) -> Self {
        Self {
            engine,
            request_timeout,
        }
    }
}

/// Handler error rendered as `(status, {"error": ...})`
#[derive(Debug)]
pub enum ApiError {
    Engine(RowlockError),
    /// Request body present but not a valid lock payload
    BadPayload(String),
}

impl From<RowlockError> for ApiError {
    fn from(err: RowlockError) -> Self {
        Self::Engine(err)
    }
}

impl From<LockError> for ApiError {
    fn from(err: LockError) -> Self {
        Self::Engine(err.into())
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        let err = match self {
            ApiError::BadPayload(_) => return StatusCode::BAD_REQUEST,
            ApiError::Engine(err) => err,
        };
        match err {
            RowlockError::Lock(LockError::UnknownRow { .. }) => StatusCode::NOT_FOUND,
            RowlockError::Lock(LockError::QueueFull | LockError::SourceClosed) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            RowlockError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            RowlockError::Config(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Engine(err) => err.to_string(),
            ApiError::BadPayload(msg) => format!("Invalid lock payload: {msg}"),
        };
        if status.is_server_error() {
            warn!(status = status.as_u16(), error = %message, "Request failed");
        }
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LockBody {
    pub amount: Option<i64>,
}

impl LockBody {
    /// An empty (or all-whitespace) body means no payload; anything else must
    /// be a valid JSON lock body.
    pub fn parse(body: &[u8]) -> Result<Self, ApiError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body).map_err(|e| ApiError::BadPayload(e.to_string()))
    }
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": VERSION,
    }))
}

async fn lock_row(
    State(state): State<AppState>,
    Path(row): Path<usize>,
    body: Bytes,
) -> Result<Json<LockReply>, ApiError> {
    let LockBody { amount } = LockBody::parse(&body)?;
    let reply = state.engine.submit(row, amount)?;

    let outcome = match tokio::time::timeout(state.request_timeout, reply).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(_)) => {
            return Err(RowlockError::Internal(format!("row {row}: worker dropped the request")).into())
        }
        Err(_) => {
            return Err(RowlockError::Timeout(format!(
                "row {row}: no worker answered within {} ms",
                state.request_timeout.as_millis()
            ))
            .into())
        }
    };

    debug!(row, worker = %outcome.worker, status = ?outcome.status, "Lock request answered");
    Ok(Json(LockReply::from(&outcome)))
}

async fn get_balance(
    State(state): State<AppState>,
    Path(row): Path<usize>,
) -> Result<Json<BalanceReply>, ApiError> {
    let start = Instant::now();
    let balance = state.engine.balance(row)?;
    Ok(Json(BalanceReply {
        balance,
        latency_ms: start.elapsed().as_millis() as u64,
    }))
}

async fn get_metrics(State(state): State<AppState>) -> Json<RewardMetrics> {
    Json(state.engine.reward_metrics())
}

async fn get_prometheus(State(state): State<AppState>) -> Result<Response, ApiError> {
    let text = state.engine.metrics().encode()?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        text,
    )
        .into_response())
}

async fn list_workers(State(state): State<AppState>) -> Json<Vec<WorkerSnapshot>> {
    Json(state.engine.workers())
}

/// Routes with tracing and permissive CORS
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/accounts/:row/lock", post(lock_row))
        .route("/accounts/:row/balance", get(get_balance))
        .route("/metrics", get(get_metrics))
        .route("/metrics/prometheus", get(get_prometheus))
        .route("/workers", get(list_workers))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
