use hdrhistogram::Histogram;

/// Quantiles reported for every histogram and timer, with their bucket labels.
pub const PERCENTILES: [(f64, &str); 6] = [
    (0.5, "p50"),
    (0.75, "p75"),
    (0.95, "p95"),
    (0.99, "p99"),
    (0.999, "p999"),
    (0.9999, "p9999"),
];

/// Full percentile breakdown of one HdrHistogram.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PercentileSet {
    pub count: u64,
    pub min: u64,
    pub max: u64,
    pub mean: f64,
    pub stddev: f64,
    pub variance: f64,
    /// Values at [`PERCENTILES`], same order.
    pub percentiles: [f64; 6],
}

impl PercentileSet {
    /// Extract the breakdown from an HdrHistogram.
    /// Returns zeroed values if the histogram is empty.
    pub fn from_histogram(hist: &Histogram<u64>) -> Self {
        if hist.is_empty() {
            return Self::empty();
        }

        let stddev = hist.stdev();
        let mut percentiles = [0.0; 6];
        for (slot, (q, _)) in percentiles.iter_mut().zip(PERCENTILES) {
            *slot = hist.value_at_quantile(q) as f64;
        }

        Self {
            count: hist.len(),
            min: hist.min(),
            max: hist.max(),
            mean: hist.mean(),
            stddev,
            variance: stddev * stddev,
            percentiles,
        }
    }

    /// All-zero placeholder used before any samples are recorded.
    pub fn empty() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_histogram_is_zeroed() {
        let hist = Histogram::<u64>::new(3).unwrap();
        assert_eq!(PercentileSet::from_histogram(&hist), PercentileSet::empty());
    }

    #[test]
    fn test_uniform_values() {
        let mut hist = Histogram::<u64>::new(3).unwrap();
        for v in 1..=100u64 {
            hist.record(v).unwrap();
        }
        let set = PercentileSet::from_histogram(&hist);
        assert_eq!(set.count, 100);
        assert_eq!(set.min, 1);
        assert_eq!(set.max, 100);
        assert!((set.mean - 50.5).abs() < 0.01);
        assert_eq!(set.percentiles[0], 50.0);
        assert_eq!(set.percentiles[3], 99.0);
        assert!((set.variance - set.stddev * set.stddev).abs() < 1e-9);
    }
}
