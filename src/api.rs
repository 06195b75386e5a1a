use std::collections::HashMap;
use std::sync::Arc;

use shuttle_axum::axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::history::RunHistory;
use crate::pipeline::{Pipeline, RunReport};

const DEFAULT_RUNS_LIMIT: usize = 20;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub history: Arc<RunHistory>,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self {
            pipeline,
            history: Arc::new(RunHistory::with_capacity(200)),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/run", post(trigger_run))
        .route("/runs", get(recent_runs))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// One synchronous run. The HTTP status mirrors the report.
async fn trigger_run(State(state): State<AppState>) -> Response {
    let report = state.pipeline.run_report().await;
    state.history.push(&report);
    tracing::info!(
        status = report.status.as_str(),
        stage = %report.stage,
        duration_ms = report.duration_ms,
        "run triggered over http"
    );
    let code = StatusCode::from_u16(report.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (code, Json(report)).into_response()
}

async fn recent_runs(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Json<Vec<RunReport>> {
    let n = q
        .get("limit")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(DEFAULT_RUNS_LIMIT);
    let mut rows = state.history.snapshot_last_n(n);
    rows.reverse();
    Json(rows)
}
