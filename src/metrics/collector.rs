use std::collections::VecDeque;

use parking_lot::Mutex;
use serde::Serialize;

use super::grade::performance_score;
use super::percentiles::PercentileSet;
use super::{Method, Sample};

// ─── Configuration ───────────────────────────────────────────────

/// Default number of delivered samples kept per method
pub const DEFAULT_WINDOW: usize = 50;

// ─── Public types ────────────────────────────────────────────────

/// Thread-safe per-method summary of delivered samples.
/// The distributor calls `record()`, the HTTP layer calls `snapshot()`.
pub struct MetricsCollector {
    window: usize,
    inner: Mutex<[MethodWindow; 5]>,
}

/// Summary card for one rendering method.
#[derive(Debug, Clone, Serialize)]
pub struct MethodSummary {
    pub method: Method,
    pub latest: Option<Sample>,
    pub ttfb: PercentileSet,
    pub fcp: PercentileSet,
    pub lcp: PercentileSet,
    pub delivered: u64,
    pub cache_hit_rate: f64,
    /// Web Vitals score of the latest sample
    pub score: f64,
}

/// Complete snapshot shipped to the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub methods: Vec<MethodSummary>,
}

impl MetricsSnapshot {
    pub fn method(&self, method: Method) -> Option<&MethodSummary> {
        self.methods.iter().find(|s| s.method == method)
    }
}

// ─── Internal state ──────────────────────────────────────────────

#[derive(Default)]
struct MethodWindow {
    recent: VecDeque<Sample>,
    delivered: u64,
    cache_hits: u64,
}

// ─── MetricsCollector impl ───────────────────────────────────────

impl MetricsCollector {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            inner: Mutex::new(Default::default()),
        }
    }

    pub fn record(&self, sample: &Sample) {
        let mut inner = self.inner.lock();
        let w = &mut inner[sample.method.index()];

        w.delivered += 1;
        if sample.cache_hit {
            w.cache_hits += 1;
        }

        w.recent.push_back(sample.clone());
        while w.recent.len() > self.window {
            w.recent.pop_front();
        }
    }

    pub fn latest(&self, method: Method) -> Option<Sample> {
        self.inner.lock()[method.index()].recent.back().cloned()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.inner.lock();
        let methods = Method::ALL
            .iter()
            .map(|&m| summarize(m, &inner[m.index()]))
            .collect();
        MetricsSnapshot { methods }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

fn summarize(method: Method, w: &MethodWindow) -> MethodSummary {
    let latest = w.recent.back().cloned();
    let score = latest.as_ref().map(performance_score).unwrap_or(0.0);
    let cache_hit_rate = if w.delivered > 0 {
        w.cache_hits as f64 / w.delivered as f64
    } else {
        0.0
    };

    MethodSummary {
        method,
        ttfb: PercentileSet::from_millis(w.recent.iter().map(|s| s.ttfb)),
        fcp: PercentileSet::from_millis(w.recent.iter().map(|s| s.fcp)),
        lcp: PercentileSet::from_millis(w.recent.iter().map(|s| s.lcp)),
        delivered: w.delivered,
        cache_hit_rate,
        score,
        latest,
    }
}
