use std::sync::Arc;

use rendering_vitals::metrics::{MeasurementSource, SyntheticSampler};
use rendering_vitals::{logging, server, AppState, Config, Distributor, TokioScheduler};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    println!();
    println!("╔══════════════════════════════════════════════════╗");
    println!("║   📊  RENDERING STRATEGY VITALS                  ║");
    println!("╚══════════════════════════════════════════════════╝");
    println!();

    // ── 1. Load configuration ────────────────────────────────────
    let config = match std::env::args_os().nth(1) {
        Some(path) => Config::load(&path),
        None => Ok(Config::default()),
    }
    .unwrap_or_else(|e| {
        eprintln!("❌ {e}");
        std::process::exit(1);
    });

    let level = config.level().unwrap_or(tracing::Level::INFO);
    logging::init(level);

    // ── 2. Build the distributor ─────────────────────────────────
    let scheduler = TokioScheduler::current().unwrap_or_else(|e| {
        error!("{e}");
        std::process::exit(1);
    });
    let source: Arc<dyn MeasurementSource> = match config.seed {
        Some(seed) => Arc::new(SyntheticSampler::seeded(seed)),
        None => Arc::new(SyntheticSampler::new()),
    };
    let distributor = Distributor::create(Arc::new(scheduler), source, config.distributor());

    let state = Arc::new(AppState::new(distributor));

    // ── 3. Build Axum router ─────────────────────────────────────
    let app = server::create_router(state.clone());

    // ── 4. Bind & serve ──────────────────────────────────────────
    let addr = config.listen_addr().unwrap_or_else(|e| {
        error!("{e}");
        std::process::exit(1);
    });
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap_or_else(|e| {
        error!(%addr, "failed to bind: {e}");
        std::process::exit(1);
    });

    info!(%addr, "listening");
    println!("Health          → http://{addr}/api/health");
    println!("Metrics JSON    → http://{addr}/api/metrics");
    println!("Method SSE      → http://{addr}/api/metrics/SSR/stream");
    println!("Time series     → http://{addr}/api/timeseries");
    println!();

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await;

    state.distributor.dispose();

    if let Err(e) = served {
        error!("server exited with error: {e}");
        std::process::exit(1);
    }
}
