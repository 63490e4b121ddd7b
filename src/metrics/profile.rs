use rand::Rng;

use super::Method;

// ─── Signal profiles ─────────────────────────────────────────────

/// `base + U[0,1) * spread` before jitter is applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalProfile {
    pub base: f64,
    pub spread: f64,
}

impl SignalProfile {
    const fn new(base: f64, spread: f64) -> Self {
        Self { base, spread }
    }

    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.base + rng.gen::<f64>() * self.spread
    }

    /// Largest value `draw` can return.
    pub fn upper(&self) -> f64 {
        self.base + self.spread
    }
}

/// How a method reports cache hits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CacheBehavior {
    Always,
    Never,
    /// Hit with the given probability.
    Probability(f64),
}

impl CacheBehavior {
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        match *self {
            Self::Always => true,
            Self::Never => false,
            Self::Probability(p) => rng.gen_bool(p.clamp(0.0, 1.0)),
        }
    }
}

/// Characteristic performance profile of one rendering method.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub ttfb: SignalProfile,
    pub fcp: SignalProfile,
    pub lcp: SignalProfile,
    pub inp: SignalProfile,
    pub cls: SignalProfile,
    pub bundle_size: SignalProfile,
    pub request_count: SignalProfile,
    pub load_time: SignalProfile,
    pub dom_content_loaded: SignalProfile,
    pub render_time: SignalProfile,
    /// `None` when the method has no hydration phase.
    pub hydration_time: Option<SignalProfile>,
    pub js_heap_size: SignalProfile,
    pub cache: CacheBehavior,
    /// Only meaningful for incremental regeneration.
    pub revalidation: Option<SignalProfile>,
    /// Artificial delay before a new subscription sees its first sample.
    pub loading: SignalProfile,
}

/// Multiplicative jitter band applied to every continuous signal.
pub const JITTER_LOW: f64 = 0.8;
pub const JITTER_HIGH: f64 = 1.2;

// Server renders per request: higher TTFB, moderate bundle.
static SSR: Profile = Profile {
    ttfb: SignalProfile::new(300.0, 200.0),
    fcp: SignalProfile::new(800.0, 400.0),
    lcp: SignalProfile::new(1200.0, 600.0),
    inp: SignalProfile::new(150.0, 100.0),
    cls: SignalProfile::new(0.05, 0.1),
    bundle_size: SignalProfile::new(150_000.0, 50_000.0),
    request_count: SignalProfile::new(8.0, 4.0),
    load_time: SignalProfile::new(1500.0, 500.0),
    dom_content_loaded: SignalProfile::new(900.0, 300.0),
    render_time: SignalProfile::new(50.0, 30.0),
    hydration_time: Some(SignalProfile::new(200.0, 100.0)),
    js_heap_size: SignalProfile::new(5_000_000.0, 2_000_000.0),
    cache: CacheBehavior::Never,
    revalidation: None,
    loading: SignalProfile::new(800.0, 400.0),
};

// Pre-generated at build time: very low TTFB, smallest bundle.
static SSG: Profile = Profile {
    ttfb: SignalProfile::new(50.0, 100.0),
    fcp: SignalProfile::new(400.0, 200.0),
    lcp: SignalProfile::new(600.0, 300.0),
    inp: SignalProfile::new(80.0, 50.0),
    cls: SignalProfile::new(0.02, 0.05),
    bundle_size: SignalProfile::new(120_000.0, 30_000.0),
    request_count: SignalProfile::new(4.0, 3.0),
    load_time: SignalProfile::new(800.0, 200.0),
    dom_content_loaded: SignalProfile::new(500.0, 150.0),
    render_time: SignalProfile::new(20.0, 15.0),
    hydration_time: Some(SignalProfile::new(100.0, 50.0)),
    js_heap_size: SignalProfile::new(3_500_000.0, 1_500_000.0),
    cache: CacheBehavior::Always,
    revalidation: None,
    loading: SignalProfile::new(200.0, 200.0),
};

// Cached with background regeneration: low TTFB, occasional misses.
static ISR: Profile = Profile {
    ttfb: SignalProfile::new(100.0, 150.0),
    fcp: SignalProfile::new(500.0, 250.0),
    lcp: SignalProfile::new(800.0, 400.0),
    inp: SignalProfile::new(100.0, 70.0),
    cls: SignalProfile::new(0.03, 0.07),
    bundle_size: SignalProfile::new(140_000.0, 40_000.0),
    request_count: SignalProfile::new(6.0, 3.0),
    load_time: SignalProfile::new(1000.0, 300.0),
    dom_content_loaded: SignalProfile::new(700.0, 200.0),
    render_time: SignalProfile::new(35.0, 20.0),
    hydration_time: Some(SignalProfile::new(150.0, 75.0)),
    js_heap_size: SignalProfile::new(4_200_000.0, 1_800_000.0),
    cache: CacheBehavior::Probability(0.7),
    revalidation: Some(SignalProfile::new(500.0, 1000.0)),
    loading: SignalProfile::new(400.0, 300.0),
};

// Client renders everything: fast TTFB, slow paint, largest bundle, no hydration.
static CSR: Profile = Profile {
    ttfb: SignalProfile::new(80.0, 120.0),
    fcp: SignalProfile::new(1200.0, 600.0),
    lcp: SignalProfile::new(1800.0, 800.0),
    inp: SignalProfile::new(200.0, 150.0),
    cls: SignalProfile::new(0.08, 0.15),
    bundle_size: SignalProfile::new(200_000.0, 80_000.0),
    request_count: SignalProfile::new(12.0, 6.0),
    load_time: SignalProfile::new(2000.0, 800.0),
    dom_content_loaded: SignalProfile::new(400.0, 100.0),
    render_time: SignalProfile::new(150.0, 100.0),
    hydration_time: None,
    js_heap_size: SignalProfile::new(6_500_000.0, 2_500_000.0),
    cache: CacheBehavior::Never,
    revalidation: None,
    loading: SignalProfile::new(1000.0, 600.0),
};

// Progressive rendering: moderate TTFB, good FCP.
static STREAMING: Profile = Profile {
    ttfb: SignalProfile::new(200.0, 150.0),
    fcp: SignalProfile::new(600.0, 300.0),
    lcp: SignalProfile::new(1000.0, 500.0),
    inp: SignalProfile::new(120.0, 80.0),
    cls: SignalProfile::new(0.04, 0.08),
    bundle_size: SignalProfile::new(160_000.0, 50_000.0),
    request_count: SignalProfile::new(10.0, 5.0),
    load_time: SignalProfile::new(1300.0, 400.0),
    dom_content_loaded: SignalProfile::new(800.0, 250.0),
    render_time: SignalProfile::new(80.0, 50.0),
    hydration_time: Some(SignalProfile::new(180.0, 90.0)),
    js_heap_size: SignalProfile::new(5_500_000.0, 2_000_000.0),
    cache: CacheBehavior::Never,
    revalidation: None,
    loading: SignalProfile::new(600.0, 400.0),
};

impl Profile {
    pub fn of(method: Method) -> &'static Profile {
        match method {
            Method::Ssr => &SSR,
            Method::Ssg => &SSG,
            Method::Isr => &ISR,
            Method::Csr => &CSR,
            Method::Streaming => &STREAMING,
        }
    }
}
