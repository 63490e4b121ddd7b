use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub timestamp: String,
    pub uptime_secs: f64,
    pub version: &'static str,
    pub subscriptions: usize,
}

// ─── GET /api/health ─────────────────────────────────────────────

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Health> {
    let distributor = &state.distributor;
    Json(Health {
        status: if distributor.is_disposed() { "stopping" } else { "ok" },
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime_secs: state.started_at.elapsed().as_secs_f64(),
        version: env!("CARGO_PKG_VERSION"),
        subscriptions: distributor.subscription_count(),
    })
}
