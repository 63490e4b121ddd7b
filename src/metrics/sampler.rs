use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use super::profile::{Profile, SignalProfile, JITTER_HIGH, JITTER_LOW};
use super::{Method, Sample};
use crate::error::VitalsError;

// ─── Measurement capability ──────────────────────────────────────

/// Anything that can produce a [`Sample`] for a rendering method.
///
/// The distributor only talks to this trait, so the synthetic generator can
/// be swapped for a real measurement backend without touching it.
pub trait MeasurementSource: Send + Sync {
    fn measure(&self, method: Method, now_ms: u64) -> Result<Sample, VitalsError>;
}

// ─── Synthetic sampler ───────────────────────────────────────────

/// Generates samples from the fixed per-method [`Profile`]s.
///
/// Each continuous signal gets its own jitter draw, so fields vary
/// independently within one sample.
pub struct SyntheticSampler {
    rng: Mutex<StdRng>,
}

impl SyntheticSampler {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic generator, useful for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn sample(&self, method: Method, now_ms: u64) -> Sample {
        let mut rng = self.rng.lock();
        generate(&mut *rng, method, Profile::of(method), now_ms)
    }
}

impl Default for SyntheticSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl MeasurementSource for SyntheticSampler {
    fn measure(&self, method: Method, now_ms: u64) -> Result<Sample, VitalsError> {
        Ok(self.sample(method, now_ms))
    }
}

/// Pure generation step: (method, profile, time) → sample.
pub fn generate<R: Rng + ?Sized>(
    rng: &mut R,
    method: Method,
    profile: &Profile,
    now_ms: u64,
) -> Sample {
    let mut jittered = |p: &SignalProfile| {
        let raw = p.draw(&mut *rng);
        let jitter = rng.gen_range(JITTER_LOW..JITTER_HIGH);
        (raw * jitter).max(0.0)
    };

    let ttfb = jittered(&profile.ttfb);
    let fcp = jittered(&profile.fcp);
    let lcp = jittered(&profile.lcp);
    let inp = jittered(&profile.inp);
    let cls = jittered(&profile.cls);
    let load_time = jittered(&profile.load_time);
    let dom_content_loaded = jittered(&profile.dom_content_loaded);
    let render_time = jittered(&profile.render_time);
    let hydration_time = profile.hydration_time.as_ref().map(&mut jittered);
    let js_heap_size = jittered(&profile.js_heap_size);
    let bundle_size = jittered(&profile.bundle_size);

    // Integer count: floor(base) + floor(U * spread), no jitter.
    let rc = &profile.request_count;
    let request_count =
        rc.base.floor() as u32 + (rng.gen::<f64>() * rc.spread).floor() as u32;

    let cache_hit = profile.cache.draw(rng);
    let revalidation_time = profile.revalidation.map(|p| p.draw(rng).max(0.0));

    Sample {
        method,
        ttfb: Some(ttfb),
        fcp: Some(fcp),
        lcp: Some(lcp),
        inp: Some(inp),
        cls: Some(cls),
        load_time: Some(load_time),
        dom_content_loaded: Some(dom_content_loaded),
        render_time: Some(render_time),
        hydration_time,
        js_heap_size: Some(js_heap_size),
        bundle_size: Some(bundle_size),
        request_count: Some(request_count),
        cache_hit,
        timestamp_ms: now_ms,
        revalidation_time,
    }
}

// ─── Missing backend ─────────────────────────────────────────────

/// Stand-in for a real measurement backend in an environment that has none
/// (e.g. no browser context). Every call fails with `ResourceUnavailable`.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableSource;

impl MeasurementSource for UnavailableSource {
    fn measure(&self, _method: Method, _now_ms: u64) -> Result<Sample, VitalsError> {
        Err(VitalsError::ResourceUnavailable("no browser performance API"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn within(v: Option<f64>, p: &SignalProfile) -> bool {
        let v = v.expect("signal present");
        v >= p.base * JITTER_LOW && v <= p.upper() * JITTER_HIGH && v >= 0.0
    }

    #[test]
    fn every_signal_stays_within_profile_bounds() {
        let sampler = SyntheticSampler::seeded(7);
        for m in Method::ALL {
            let p = Profile::of(m);
            for _ in 0..200 {
                let s = sampler.sample(m, 0);
                assert_eq!(s.method, m);
                assert!(within(s.ttfb, &p.ttfb));
                assert!(within(s.fcp, &p.fcp));
                assert!(within(s.lcp, &p.lcp));
                assert!(within(s.inp, &p.inp));
                assert!(within(s.cls, &p.cls));
                assert!(within(s.load_time, &p.load_time));
                assert!(within(s.dom_content_loaded, &p.dom_content_loaded));
                assert!(within(s.render_time, &p.render_time));
                assert!(within(s.js_heap_size, &p.js_heap_size));
                assert!(within(s.bundle_size, &p.bundle_size));
                if let Some(h) = &p.hydration_time {
                    assert!(within(s.hydration_time, h));
                }
                let rc = s.request_count.unwrap() as f64;
                assert!(rc >= p.request_count.base);
                assert!(rc < p.request_count.upper());
            }
        }
    }

    #[test]
    fn hydration_is_null_only_for_csr() {
        let sampler = SyntheticSampler::seeded(11);
        for m in Method::ALL {
            for _ in 0..50 {
                let s = sampler.sample(m, 0);
                assert_eq!(s.hydration_time.is_none(), m == Method::Csr, "{m}");
            }
        }
    }

    #[test]
    fn revalidation_only_for_isr() {
        let sampler = SyntheticSampler::seeded(13);
        for m in Method::ALL {
            let s = sampler.sample(m, 0);
            assert_eq!(s.revalidation_time.is_some(), m == Method::Isr);
        }
        let s = sampler.sample(Method::Isr, 0);
        let r = s.revalidation_time.unwrap();
        assert!((500.0..1500.0).contains(&r));
    }

    #[test]
    fn cache_hits_follow_method_rules() {
        let sampler = SyntheticSampler::seeded(17);
        for _ in 0..100 {
            assert!(sampler.sample(Method::Ssg, 0).cache_hit);
            assert!(!sampler.sample(Method::Ssr, 0).cache_hit);
            assert!(!sampler.sample(Method::Csr, 0).cache_hit);
            assert!(!sampler.sample(Method::Streaming, 0).cache_hit);
        }
    }

    #[test]
    fn isr_cache_hit_rate_is_about_seventy_percent() {
        let sampler = SyntheticSampler::seeded(19);
        let hits = (0..200)
            .filter(|_| sampler.sample(Method::Isr, 0).cache_hit)
            .count();
        let rate = hits as f64 / 200.0;
        assert!((0.55..=0.85).contains(&rate), "rate {rate}");
    }

    #[test]
    fn timestamp_is_passed_through() {
        let sampler = SyntheticSampler::seeded(23);
        assert_eq!(sampler.sample(Method::Ssr, 12_345).timestamp_ms, 12_345);
    }

    #[test]
    fn unavailable_source_reports_resource_error() {
        let err = UnavailableSource.measure(Method::Ssr, 0).unwrap_err();
        assert!(err.is_unavailable());
    }
}
