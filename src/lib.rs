//! Synthetic web-rendering performance samples for SSR, SSG, ISR, CSR and
//! Streaming, distributed to subscribers on independent timers.

use std::time::Instant;

pub mod config;
pub mod distributor;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod scheduler;
pub mod server;

pub use config::Config;
pub use distributor::{Distributor, DistributorConfig, Subscription, SubscriptionState};
pub use error::VitalsError;
pub use metrics::{Method, Sample};
pub use scheduler::{Scheduler, TimerHandle, TokioScheduler, VirtualScheduler};

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// Sample source for every route.
    pub distributor: Distributor,

    /// Process start, for the health endpoint.
    pub started_at: Instant,
}

impl AppState {
    pub fn new(distributor: Distributor) -> Self {
        Self {
            distributor,
            started_at: Instant::now(),
        }
    }
}
