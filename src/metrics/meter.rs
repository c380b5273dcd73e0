use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// EWMA tick period.
const TICK_INTERVAL: Duration = Duration::from_secs(5);

/// Point-in-time view of a [`Meter`]. Rates are events per second.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MeterSnapshot {
    pub count: u64,
    pub rate1: f64,
    pub rate5: f64,
    pub rate15: f64,
    pub rate_mean: f64,
}

/// Counts events and tracks 1/5/15-minute moving average rates.
///
/// Averages are ticked lazily: every `mark` and `snapshot` first applies
/// the ticks that elapsed since the last one, so no background task is
/// needed.
#[derive(Debug)]
pub struct Meter {
    inner: Mutex<MeterState>,
}

impl Meter {
    pub fn new() -> Self {
        Self::started_at(Instant::now())
    }

    pub(crate) fn started_at(start: Instant) -> Self {
        Self {
            inner: Mutex::new(MeterState::new(start)),
        }
    }

    /// Record `n` events.
    pub fn mark(&self, n: u64) {
        self.mark_at(n, Instant::now());
    }

    pub fn count(&self) -> u64 {
        self.inner.lock().count
    }

    pub fn snapshot(&self) -> MeterSnapshot {
        self.snapshot_at(Instant::now())
    }

    pub(crate) fn mark_at(&self, n: u64, now: Instant) {
        let mut state = self.inner.lock();
        state.catch_up(now);
        state.count += n;
        state.uncounted += n;
    }

    pub(crate) fn snapshot_at(&self, now: Instant) -> MeterSnapshot {
        let mut state = self.inner.lock();
        state.catch_up(now);

        let elapsed = now.saturating_duration_since(state.start).as_secs_f64();
        let rate_mean = if elapsed > 0.0 {
            state.count as f64 / elapsed
        } else {
            0.0
        };

        MeterSnapshot {
            count: state.count,
            rate1: state.m1.rate,
            rate5: state.m5.rate,
            rate15: state.m15.rate,
            rate_mean,
        }
    }
}

impl Default for Meter {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Internal state ──────────────────────────────────────────────

#[derive(Debug)]
struct MeterState {
    count: u64,
    /// Events since the last tick.
    uncounted: u64,
    m1: Ewma,
    m5: Ewma,
    m15: Ewma,
    start: Instant,
    last_tick: Instant,
}

impl MeterState {
    fn new(start: Instant) -> Self {
        Self {
            count: 0,
            uncounted: 0,
            m1: Ewma::minutes(1.0),
            m5: Ewma::minutes(5.0),
            m15: Ewma::minutes(15.0),
            start,
            last_tick: start,
        }
    }

    fn catch_up(&mut self, now: Instant) {
        while now.saturating_duration_since(self.last_tick) >= TICK_INTERVAL {
            let instant_rate = self.uncounted as f64 / TICK_INTERVAL.as_secs_f64();
            self.uncounted = 0;
            self.m1.tick(instant_rate);
            self.m5.tick(instant_rate);
            self.m15.tick(instant_rate);
            self.last_tick += TICK_INTERVAL;
        }
    }
}

/// Exponentially weighted moving average of a per-second rate.
#[derive(Debug)]
struct Ewma {
    alpha: f64,
    rate: f64,
    initialized: bool,
}

impl Ewma {
    fn minutes(m: f64) -> Self {
        let alpha = 1.0 - (-TICK_INTERVAL.as_secs_f64() / 60.0 / m).exp();
        Self {
            alpha,
            rate: 0.0,
            initialized: false,
        }
    }

    fn tick(&mut self, instant_rate: f64) {
        if self.initialized {
            self.rate += self.alpha * (instant_rate - self.rate);
        } else {
            // First tick seeds the average with the observed rate.
            self.rate = instant_rate;
            self.initialized = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_meter_is_zero() {
        let t0 = Instant::now();
        let m = Meter::started_at(t0);
        let snap = m.snapshot_at(t0 + Duration::from_secs(30));
        assert_eq!(snap, MeterSnapshot::default());
    }

    #[test]
    fn test_first_tick_seeds_rates() {
        let t0 = Instant::now();
        let m = Meter::started_at(t0);
        m.mark_at(10, t0 + Duration::from_secs(1));

        // Before the first tick nothing has been folded into the averages.
        let snap = m.snapshot_at(t0 + Duration::from_secs(2));
        assert_eq!(snap.count, 10);
        assert_eq!(snap.rate1, 0.0);
        assert!((snap.rate_mean - 5.0).abs() < 1e-9);

        let snap = m.snapshot_at(t0 + TICK_INTERVAL);
        assert!((snap.rate1 - 2.0).abs() < 1e-9);
        assert!((snap.rate5 - 2.0).abs() < 1e-9);
        assert!((snap.rate15 - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_rates_decay_when_idle() {
        let t0 = Instant::now();
        let m = Meter::started_at(t0);
        m.mark_at(50, t0);
        let seeded = m.snapshot_at(t0 + TICK_INTERVAL);
        let later = m.snapshot_at(t0 + Duration::from_secs(120));

        assert!(later.rate1 < seeded.rate1);
        assert!(later.rate15 < seeded.rate15);
        // Longer windows forget more slowly.
        assert!(later.rate15 > later.rate1);
        assert_eq!(later.count, 50);
    }
}
