use serde::Serialize;

use super::Sample;

// ─── Web Vitals thresholds ───────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    pub good: f64,
    pub poor: f64,
}

pub const TTFB: Thresholds = Thresholds { good: 800.0, poor: 1800.0 };
pub const FCP: Thresholds = Thresholds { good: 1800.0, poor: 3000.0 };
pub const LCP: Thresholds = Thresholds { good: 2500.0, poor: 4000.0 };
pub const INP: Thresholds = Thresholds { good: 200.0, poor: 500.0 };
pub const CLS: Thresholds = Thresholds { good: 0.1, poor: 0.25 };

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Grade {
    Good,
    NeedsImprovement,
    Poor,
}

impl Grade {
    /// A missing value grades as poor.
    pub fn of(value: Option<f64>, t: Thresholds) -> Self {
        match value {
            Some(v) if v <= t.good => Self::Good,
            Some(v) if v <= t.poor => Self::NeedsImprovement,
            _ => Self::Poor,
        }
    }
}

/// Points deducted for (poor, needs-improvement) per vital.
const PENALTIES: [(Thresholds, f64, f64); 5] = [
    (TTFB, 20.0, 10.0),
    (FCP, 20.0, 10.0),
    (LCP, 25.0, 15.0),
    (INP, 20.0, 10.0),
    (CLS, 15.0, 8.0),
];

/// 0–100 score from the five core vitals; 0 when none is present.
pub fn performance_score(sample: &Sample) -> f64 {
    let vitals = [sample.ttfb, sample.fcp, sample.lcp, sample.inp, sample.cls];

    let mut score = 100.0;
    let mut present = 0;
    for (value, (t, poor, needs)) in vitals.into_iter().zip(PENALTIES) {
        if value.is_none() {
            continue;
        }
        present += 1;
        score -= match Grade::of(value, t) {
            Grade::Poor => poor,
            Grade::NeedsImprovement => needs,
            Grade::Good => 0.0,
        };
    }

    if present == 0 {
        0.0
    } else {
        f64::max(score, 0.0)
    }
}

// ─── Display formatting ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Millis,
    Bytes,
    Other(&'static str),
}

pub fn format_metric(value: Option<f64>, unit: Unit) -> String {
    let Some(v) = value else {
        return "N/A".into();
    };

    const KB: f64 = 1024.0;
    const MB: f64 = 1024.0 * 1024.0;

    match unit {
        Unit::Millis => format!("{}ms", v.round()),
        Unit::Bytes if v > MB => format!("{:.2} MB", v / MB),
        Unit::Bytes if v > KB => format!("{:.2} KB", v / KB),
        Unit::Bytes => format!("{v} B"),
        Unit::Other(suffix) => format!("{v}{suffix}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Method;

    #[test]
    fn grades_by_threshold() {
        assert_eq!(Grade::of(Some(800.0), TTFB), Grade::Good);
        assert_eq!(Grade::of(Some(801.0), TTFB), Grade::NeedsImprovement);
        assert_eq!(Grade::of(Some(1900.0), TTFB), Grade::Poor);
        assert_eq!(Grade::of(None, TTFB), Grade::Poor);
        assert_eq!(Grade::of(Some(0.05), CLS), Grade::Good);
    }

    #[test]
    fn empty_sample_scores_zero() {
        assert_eq!(performance_score(&Sample::unavailable(Method::Ssr, 0)), 0.0);
    }

    #[test]
    fn penalties_accumulate() {
        let mut s = Sample::unavailable(Method::Csr, 0);
        s.ttfb = Some(100.0); // good
        s.fcp = Some(2000.0); // needs improvement: -10
        s.lcp = Some(5000.0); // poor: -25
        s.cls = Some(0.3); // poor: -15
        assert_eq!(performance_score(&s), 50.0);
    }

    #[test]
    fn formats_units() {
        assert_eq!(format_metric(None, Unit::Millis), "N/A");
        assert_eq!(format_metric(Some(123.4), Unit::Millis), "123ms");
        assert_eq!(format_metric(Some(512.0), Unit::Bytes), "512 B");
        assert_eq!(format_metric(Some(12_288.0), Unit::Bytes), "12.00 KB");
        assert_eq!(format_metric(Some(1_572_864.0), Unit::Bytes), "1.50 MB");
        assert_eq!(format_metric(Some(0.1), Unit::Other("")), "0.1");
    }
}
