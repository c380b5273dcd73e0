use std::time::{Duration, Instant};

use super::histogram::Histogram;
use super::meter::{Meter, MeterSnapshot};
use super::percentiles::PercentileSet;

/// Snapshot of a [`Timer`]: the duration distribution (nanoseconds) plus
/// the rate at which durations were recorded.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimerSnapshot {
    pub durations: PercentileSet,
    pub rate: MeterSnapshot,
}

/// Histogram of durations combined with a meter of how often they occur.
#[derive(Debug, Default)]
pub struct Timer {
    histogram: Histogram,
    meter: Meter,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one duration.
    pub fn update(&self, d: Duration) {
        let nanos = u64::try_from(d.as_nanos()).unwrap_or(u64::MAX);
        self.histogram.update(nanos);
        self.meter.mark(1);
    }

    /// Record the time elapsed since `start`.
    pub fn update_since(&self, start: Instant) {
        self.update(start.elapsed());
    }

    /// Run `f` and record how long it took.
    pub fn time<T>(&self, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.update_since(start);
        out
    }

    pub fn count(&self) -> u64 {
        self.histogram.count()
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            durations: self.histogram.snapshot(),
            rate: self.meter.snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_records_nanos() {
        let t = Timer::new();
        t.update(Duration::from_micros(250));
        t.update(Duration::from_micros(750));

        let snap = t.snapshot();
        assert_eq!(snap.durations.count, 2);
        assert_eq!(snap.rate.count, 2);
        assert!(snap.durations.min >= 249_000 && snap.durations.min <= 250_000);
        assert!(snap.durations.max >= 750_000);
    }

    #[test]
    fn test_time_returns_closure_value() {
        let t = Timer::new();
        let v = t.time(|| 7);
        assert_eq!(v, 7);
        assert_eq!(t.count(), 1);
    }
}
