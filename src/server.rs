use axum::{middleware as axum_mw, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::metrics::stream;
use crate::middleware::timing;
use crate::AppState;

/// Builds the full Axum `Router` with all routes and middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health::health))
        // ── Samples ─────────────────────────────────────────────
        .route("/api/metrics", get(handlers::metrics::get_snapshot))
        .route("/api/metrics/:method", get(handlers::metrics::get_latest))
        .route("/api/metrics/:method/stream", get(stream::method_stream))
        // ── Chart series ────────────────────────────────────────
        .route("/api/timeseries", get(handlers::metrics::get_timeseries))
        .route("/api/timeseries/stream", get(stream::timeseries_stream))
        .with_state(state)
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(axum_mw::from_fn(timing::timing_middleware))
        .layer(CorsLayer::permissive())
}
