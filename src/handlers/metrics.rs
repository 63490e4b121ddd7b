use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::metrics::{AggregatePoint, Method, MetricsSnapshot, Sample};
use crate::AppState;

use super::AppError;

// ─── GET /api/metrics ────────────────────────────────────────────
/// Per-method summaries, handy for curl.

pub async fn get_snapshot(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.distributor.snapshot())
}

// ─── GET /api/metrics/:method ────────────────────────────────────

pub async fn get_latest(
    State(state): State<Arc<AppState>>,
    Path(tag): Path<String>,
) -> Result<Json<Sample>, AppError> {
    let method: Method = tag.parse()?;
    state
        .distributor
        .latest(method)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("no {method} sample delivered yet")))
}

// ─── GET /api/timeseries ─────────────────────────────────────────

pub async fn get_timeseries(State(state): State<Arc<AppState>>) -> Json<Vec<AggregatePoint>> {
    Json(state.distributor.rolling_buffer().to_vec())
}
