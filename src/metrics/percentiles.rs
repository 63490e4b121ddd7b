use hdrhistogram::Histogram;
use serde::Serialize;

/// HdrHistogram range: 1 ms → 10 min, 3 significant figures
const HIST_LOW: u64 = 1;
const HIST_HIGH: u64 = 600_000;
const HIST_SIGFIG: u8 = 3;

/// Percentile breakdown of one timing signal over the recent window.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PercentileSet {
    pub min: u64,
    pub max: u64,
    pub mean: f64,
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
    pub count: u64,
}

impl PercentileSet {
    /// Build from millisecond values; `None` entries are skipped and values
    /// are clamped into the histogram range.
    pub fn from_millis<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let Ok(mut hist) = Histogram::<u64>::new_with_bounds(HIST_LOW, HIST_HIGH, HIST_SIGFIG)
        else {
            return Self::empty();
        };

        for v in values.into_iter().flatten() {
            let ms = (v.round() as u64).clamp(HIST_LOW, HIST_HIGH);
            let _ = hist.record(ms);
        }

        Self::from_histogram(&hist)
    }

    pub fn from_histogram(hist: &Histogram<u64>) -> Self {
        if hist.len() == 0 {
            return Self::empty();
        }

        Self {
            min: hist.min(),
            max: hist.max(),
            mean: hist.mean(),
            p50: hist.value_at_percentile(50.0),
            p95: hist.value_at_percentile(95.0),
            p99: hist.value_at_percentile(99.0),
            count: hist.len(),
        }
    }

    /// All-zero placeholder used before any samples are recorded.
    pub fn empty() -> Self {
        Self {
            min: 0,
            max: 0,
            mean: 0.0,
            p50: 0,
            p95: 0,
            p99: 0,
            count: 0,
        }
    }

    pub fn has_data(&self) -> bool {
        self.count > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_empty() {
        let set = PercentileSet::from_millis(std::iter::empty());
        assert!(!set.has_data());
        assert_eq!(set, PercentileSet::empty());
    }

    #[test]
    fn skips_missing_values() {
        let set = PercentileSet::from_millis([Some(100.0), None, Some(300.0)]);
        assert_eq!(set.count, 2);
        assert_eq!(set.min, 100);
        assert!(set.max >= 300 && set.max <= 301);
    }

    #[test]
    fn median_of_uniform_run() {
        let set = PercentileSet::from_millis((1..=100).map(|v| Some(v as f64)));
        assert_eq!(set.count, 100);
        assert_eq!(set.p50, 50);
        assert!((set.mean - 50.5).abs() < 0.5);
    }
}
