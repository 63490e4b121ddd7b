use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body, BodyDataStream};
use axum::http::{Request, StatusCode};
use rendering_vitals::metrics::SyntheticSampler;
use rendering_vitals::{server, AppState, Distributor, DistributorConfig, Method, VirtualScheduler};
use serde_json::Value;
use tokio_stream::StreamExt;
use tower::ServiceExt;

fn app_state() -> (Arc<VirtualScheduler>, Arc<AppState>) {
    let sched = Arc::new(VirtualScheduler::starting_at(1_700_000_000_000));
    let dist = Distributor::create(
        sched.clone(),
        Arc::new(SyntheticSampler::seeded(5)),
        DistributorConfig {
            seed: Some(6),
            ..Default::default()
        },
    );
    (sched, Arc::new(AppState::new(dist)))
}

async fn get(state: &Arc<AppState>, uri: &str) -> (StatusCode, Value) {
    let response = server::create_router(state.clone())
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    assert!(response.headers().contains_key("x-response-time-us"));
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn health_reports_ok() {
    let (_sched, state) = app_state();
    let (status, body) = get(&state, "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["subscriptions"], 0);
}

#[tokio::test]
async fn unknown_method_is_a_bad_request() {
    let (_sched, state) = app_state();
    let (status, body) = get(&state, "/api/metrics/AMP").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
    assert!(body["error"].as_str().unwrap().contains("AMP"));
}

#[tokio::test]
async fn latest_sample_appears_after_delivery() {
    let (sched, state) = app_state();

    let (status, _) = get(&state, "/api/metrics/CSR").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let _sub = state.distributor.subscribe(Method::Csr, |_| {});
    sched.advance(Duration::from_secs(2));

    let (status, body) = get(&state, "/api/metrics/csr").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["method"], "CSR");
    assert!(body["hydration_time"].is_null());
    assert!(body["ttfb"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn snapshot_lists_all_methods() {
    let (_sched, state) = app_state();
    let (status, body) = get(&state, "/api/metrics").await;
    assert_eq!(status, StatusCode::OK);
    let methods = body["methods"].as_array().unwrap();
    let tags: Vec<&str> = methods.iter().map(|m| m["method"].as_str().unwrap()).collect();
    assert_eq!(tags, ["SSR", "SSG", "ISR", "CSR", "Streaming"]);
}

#[tokio::test]
async fn timeseries_returns_the_rolling_buffer() {
    let (sched, state) = app_state();
    sched.advance(Duration::from_secs(9));

    let (status, body) = get(&state, "/api/timeseries").await;
    assert_eq!(status, StatusCode::OK);
    let points = body.as_array().unwrap();
    assert_eq!(points.len(), 3);
    assert!(points[0]["SSG"].as_f64().is_some());
    assert!(points[0]["time"].as_str().unwrap().len() == 8);
}

async fn open_stream(state: &Arc<AppState>, uri: &str) -> BodyDataStream {
    let response = server::create_router(state.clone())
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/event-stream");
    response.into_body().into_data_stream()
}

async fn next_event(body: &mut BodyDataStream) -> (String, Value) {
    let chunk = body.next().await.expect("stream ended").unwrap();
    let text = String::from_utf8(chunk.to_vec()).unwrap();
    let name = text
        .lines()
        .find_map(|l| l.strip_prefix("event: "))
        .unwrap_or_default()
        .to_owned();
    let data = text
        .lines()
        .find_map(|l| l.strip_prefix("data: "))
        .unwrap_or_default();
    let value = serde_json::from_str(data).unwrap_or_else(|_| Value::String(data.to_owned()));
    (name, value)
}

#[tokio::test]
async fn method_stream_opens_with_loading_then_forwards_samples() {
    let (sched, state) = app_state();
    let mut body = open_stream(&state, "/api/metrics/ssr/stream").await;
    assert_eq!(state.distributor.subscription_count(), 1);

    let (event, data) = next_event(&mut body).await;
    assert_eq!(event, "loading");
    assert_eq!(data, "SSR");

    sched.advance(Duration::from_secs(2));
    let (event, sample) = next_event(&mut body).await;
    assert_eq!(event, "sample");
    assert_eq!(sample["method"], "SSR");
    assert!(sample["ttfb"].as_f64().unwrap() > 0.0);

    // Client disconnect.
    drop(body);
    assert_eq!(state.distributor.subscription_count(), 0);

    sched.advance(Duration::from_secs(60));
    assert_eq!(state.distributor.subscription_count(), 0);
}

#[tokio::test]
async fn method_stream_rejects_unknown_methods() {
    let (_sched, state) = app_state();
    let (status, body) = get(&state, "/api/metrics/AMP/stream").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("AMP"));
    assert_eq!(state.distributor.subscription_count(), 0);
}

#[tokio::test]
async fn timeseries_stream_pushes_the_rolling_buffer() {
    let (sched, state) = app_state();
    sched.advance(Duration::from_secs(6));

    let mut body = open_stream(&state, "/api/timeseries/stream").await;
    let (event, points) = next_event(&mut body).await;
    assert_eq!(event, "timeseries");
    let points = points.as_array().unwrap();
    assert_eq!(points.len(), 2);
    assert!(points[1]["CSR"].as_f64().is_some());
}
