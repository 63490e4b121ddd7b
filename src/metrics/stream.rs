use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::{IntervalStream, UnboundedReceiverStream};
use tokio_stream::{Stream, StreamExt};

use super::{Method, Sample};
use crate::handlers::AppError;
use crate::AppState;

fn keep_alive() -> KeepAlive {
    KeepAlive::new()
        .interval(Duration::from_secs(15))
        .text("keep-alive")
}

// ─── GET /api/metrics/:method/stream ─────────────────────────────
/// Server-Sent Events for one rendering method.
/// Opens a subscription on connect: a `loading` event first, then one
/// `sample` event per delivery. Disconnecting drops the subscription.

pub async fn method_stream(
    State(state): State<Arc<AppState>>,
    Path(tag): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let method: Method = tag.parse()?;

    let (tx, rx) = mpsc::unbounded_channel::<Sample>();
    let subscription = state.distributor.subscribe(method, move |sample| {
        // Receiver gone means the client left; the stream drop disposes us.
        let _ = tx.send(sample.clone());
    });

    let loading = Event::default().event("loading").data(method.as_str());
    let samples = UnboundedReceiverStream::new(rx).map(move |sample| {
        // Owned by the stream so the subscription lives exactly as long.
        let _subscription = &subscription;
        let json = serde_json::to_string(&sample).unwrap_or_default();
        Ok::<_, Infallible>(Event::default().event("sample").data(json))
    });

    let stream = tokio_stream::once(Ok::<_, Infallible>(loading)).chain(samples);
    Ok(Sse::new(stream).keep_alive(keep_alive()))
}

// ─── GET /api/timeseries/stream ──────────────────────────────────
/// Pushes the rolling chart series on the aggregate cadence.

pub async fn timeseries_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let every = state.distributor.config().aggregate_interval;
    let interval = tokio::time::interval(every);

    let stream = IntervalStream::new(interval).map(move |_| {
        let points = state.distributor.rolling_buffer();
        let json = serde_json::to_string(&*points).unwrap_or_default();
        Ok::<_, Infallible>(Event::default().event("timeseries").data(json))
    });

    Sse::new(stream).keep_alive(keep_alive())
}
