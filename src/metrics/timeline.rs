use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;

use super::Method;

/// One point on the comparison chart: a load-time figure for every method
/// captured at the same instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatePoint {
    pub timestamp_ms: u64,
    /// Wall-clock label for the x-axis, `HH:MM:SS`.
    pub time: String,
    #[serde(rename = "SSR")]
    pub ssr: f64,
    #[serde(rename = "SSG")]
    pub ssg: f64,
    #[serde(rename = "ISR")]
    pub isr: f64,
    #[serde(rename = "CSR")]
    pub csr: f64,
    #[serde(rename = "Streaming")]
    pub streaming: f64,
}

impl AggregatePoint {
    pub fn value(&self, method: Method) -> f64 {
        match method {
            Method::Ssr => self.ssr,
            Method::Ssg => self.ssg,
            Method::Isr => self.isr,
            Method::Csr => self.csr,
            Method::Streaming => self.streaming,
        }
    }
}

// ─── Chart profiles ──────────────────────────────────────────────

/// (center, total variance) per method, in ms.
const SSG_CHART: (f64, f64) = (600.0, 200.0);
const ISR_CHART: (f64, f64) = (800.0, 300.0);
/// Variance while a background regeneration is in progress.
const ISR_SPIKE_VARIANCE: f64 = 600.0;
const ISR_SPIKE_PROBABILITY: f64 = 0.2;
const STREAMING_CHART: (f64, f64) = (1000.0, 400.0);
const SSR_CHART: (f64, f64) = (1200.0, 500.0);
const CSR_CHART: (f64, f64) = (1800.0, 700.0);

/// `max(0, center + (U - 0.5) * variance)`
fn around<R: Rng + ?Sized>(rng: &mut R, center: f64, variance: f64) -> f64 {
    (center + (rng.gen::<f64>() - 0.5) * variance).max(0.0)
}

fn time_label(timestamp_ms: u64) -> String {
    i64::try_from(timestamp_ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_default()
}

/// Build one combined chart point across all five methods.
pub fn aggregate_point<R: Rng + ?Sized>(rng: &mut R, timestamp_ms: u64) -> AggregatePoint {
    let isr_variance = if rng.gen_bool(ISR_SPIKE_PROBABILITY) {
        ISR_SPIKE_VARIANCE
    } else {
        ISR_CHART.1
    };

    AggregatePoint {
        timestamp_ms,
        time: time_label(timestamp_ms),
        ssg: around(rng, SSG_CHART.0, SSG_CHART.1),
        isr: around(rng, ISR_CHART.0, isr_variance),
        streaming: around(rng, STREAMING_CHART.0, STREAMING_CHART.1),
        ssr: around(rng, SSR_CHART.0, SSR_CHART.1),
        csr: around(rng, CSR_CHART.0, CSR_CHART.1),
    }
}
