use hdrhistogram::Histogram as HdrHistogram;
use parking_lot::Mutex;

use super::percentiles::PercentileSet;

/// HdrHistogram precision: 3 significant figures, auto-resizing range.
const HIST_SIGFIG: u8 = 3;

pub(crate) fn new_hdr() -> HdrHistogram<u64> {
    HdrHistogram::<u64>::new(HIST_SIGFIG).expect("histogram creation")
}

/// Distribution of non-negative samples.
#[derive(Debug)]
pub struct Histogram {
    inner: Mutex<HdrHistogram<u64>>,
}

impl Histogram {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(new_hdr()),
        }
    }

    /// Record one sample. Values beyond the trackable range are clamped.
    pub fn update(&self, v: u64) {
        self.inner.lock().saturating_record(v);
    }

    pub fn clear(&self) {
        self.inner.lock().reset();
    }

    pub fn count(&self) -> u64 {
        self.inner.lock().len()
    }

    /// Consistent view of every statistic, taken under one lock.
    pub fn snapshot(&self) -> PercentileSet {
        PercentileSet::from_histogram(&self.inner.lock())
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_and_clear() {
        let h = Histogram::new();
        for v in [10, 20, 30, 40] {
            h.update(v);
        }
        let snap = h.snapshot();
        assert_eq!(snap.count, 4);
        assert_eq!(snap.min, 10);
        assert_eq!(snap.max, 40);
        assert!((snap.mean - 25.0).abs() < 0.01);

        h.clear();
        assert_eq!(h.count(), 0);
        assert_eq!(h.snapshot(), PercentileSet::empty());
    }
}
