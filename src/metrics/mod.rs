pub mod collector;
pub mod grade;
pub mod percentiles;
pub mod profile;
pub mod rolling;
pub mod sampler;
pub mod stream;
pub mod timeline;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::VitalsError;

pub use collector::{MetricsCollector, MetricsSnapshot};
pub use rolling::RollingBuffer;
pub use sampler::{MeasurementSource, SyntheticSampler, UnavailableSource};
pub use timeline::AggregatePoint;

// ─── Rendering methods ───────────────────────────────────────────

/// The five rendering strategies being compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Method {
    #[serde(rename = "SSR")]
    Ssr,
    #[serde(rename = "SSG")]
    Ssg,
    #[serde(rename = "ISR")]
    Isr,
    #[serde(rename = "CSR")]
    Csr,
    Streaming,
}

impl Method {
    pub const ALL: [Method; 5] = [
        Method::Ssr,
        Method::Ssg,
        Method::Isr,
        Method::Csr,
        Method::Streaming,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ssr => "SSR",
            Self::Ssg => "SSG",
            Self::Isr => "ISR",
            Self::Csr => "CSR",
            Self::Streaming => "Streaming",
        }
    }

    /// Position in [`Method::ALL`]; used to index per-method arrays.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = VitalsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| VitalsError::UnknownMethod(s.to_owned()))
    }
}

// ─── Samples ─────────────────────────────────────────────────────

/// One generated observation for a rendering method.
///
/// Every signal is optional: `None` means "not applicable" (hydration for
/// CSR) or "no data available" when the measurement backend is missing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub method: Method,
    /// Time to first byte (ms)
    pub ttfb: Option<f64>,
    /// First contentful paint (ms)
    pub fcp: Option<f64>,
    /// Largest contentful paint (ms)
    pub lcp: Option<f64>,
    /// Interaction to next paint (ms)
    pub inp: Option<f64>,
    /// Cumulative layout shift (unitless)
    pub cls: Option<f64>,
    pub load_time: Option<f64>,
    pub dom_content_loaded: Option<f64>,
    pub render_time: Option<f64>,
    pub hydration_time: Option<f64>,
    /// Bytes
    pub js_heap_size: Option<f64>,
    /// Bytes of JavaScript shipped to the client
    pub bundle_size: Option<f64>,
    pub request_count: Option<u32>,
    pub cache_hit: bool,
    /// Milliseconds since the Unix epoch (or since the virtual clock's origin)
    pub timestamp_ms: u64,
    /// ISR only: background regeneration time (ms)
    pub revalidation_time: Option<f64>,
}

impl Sample {
    /// The "no data available" sample reported when no backend can measure.
    pub fn unavailable(method: Method, timestamp_ms: u64) -> Self {
        Self {
            method,
            ttfb: None,
            fcp: None,
            lcp: None,
            inp: None,
            cls: None,
            load_time: None,
            dom_content_loaded: None,
            render_time: None,
            hydration_time: None,
            js_heap_size: None,
            bundle_size: None,
            request_count: None,
            cache_hit: false,
            timestamp_ms,
            revalidation_time: None,
        }
    }

    /// All continuous signals, in a fixed order, for bulk checks.
    pub fn continuous(&self) -> [Option<f64>; 12] {
        [
            self.ttfb,
            self.fcp,
            self.lcp,
            self.inp,
            self.cls,
            self.load_time,
            self.dom_content_loaded,
            self.render_time,
            self.hydration_time,
            self.js_heap_size,
            self.bundle_size,
            self.revalidation_time,
        ]
    }

    pub fn has_data(&self) -> bool {
        self.continuous().iter().any(Option::is_some) || self.request_count.is_some()
    }
}
