//! In-process metrics and the registry the reporter reads from.
//!
//! Producers update metrics concurrently through `Arc` handles; the
//! reporter only ever calls [`Registry::each`] and [`Metric::snapshot`].

pub mod counter;
pub mod histogram;
pub mod meter;
pub mod percentiles;
pub mod registry;
pub mod timer;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

pub use counter::{Counter, Gauge, GaugeF64};
pub use histogram::Histogram;
pub use meter::{Meter, MeterSnapshot};
pub use percentiles::{PercentileSet, PERCENTILES};
pub use registry::MetricRegistry;
pub use timer::{Timer, TimerSnapshot};

/// Source of `(name, metric)` pairs for a flush cycle.
pub trait Registry: Send + Sync {
    /// Invoke `f` once for every registered metric.
    fn each(&self, f: &mut dyn FnMut(&str, &Metric));
}

/// A registered metric of any kind.
#[derive(Clone)]
pub enum Metric {
    Counter(Arc<Counter>),
    Gauge(Arc<Gauge>),
    GaugeF64(Arc<GaugeF64>),
    Histogram(Arc<Histogram>),
    Meter(Arc<Meter>),
    Timer(Arc<Timer>),
    /// Anything else an application chose to register (health checks,
    /// custom types). Never exported.
    Opaque(Arc<dyn Any + Send + Sync>),
}

impl Metric {
    /// Short kind name, used in errors and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Counter(_) => "counter",
            Self::Gauge(_) => "gauge",
            Self::GaugeF64(_) => "gauge_f64",
            Self::Histogram(_) => "histogram",
            Self::Meter(_) => "meter",
            Self::Timer(_) => "timer",
            Self::Opaque(_) => "opaque",
        }
    }

    /// Read-only copy of the metric's current statistics.
    pub fn snapshot(&self) -> MetricSnapshot {
        match self {
            Self::Counter(c) => MetricSnapshot::Counter(c.count()),
            Self::Gauge(g) => MetricSnapshot::Gauge(g.value()),
            Self::GaugeF64(g) => MetricSnapshot::GaugeF64(g.value()),
            Self::Histogram(h) => MetricSnapshot::Histogram(h.snapshot()),
            Self::Meter(m) => MetricSnapshot::Meter(m.snapshot()),
            Self::Timer(t) => MetricSnapshot::Timer(t.snapshot()),
            Self::Opaque(_) => MetricSnapshot::Unsupported,
        }
    }
}

impl fmt::Debug for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Metric::{}", self.kind())
    }
}

impl From<Arc<Counter>> for Metric {
    fn from(m: Arc<Counter>) -> Self {
        Self::Counter(m)
    }
}
impl From<Arc<Gauge>> for Metric {
    fn from(m: Arc<Gauge>) -> Self {
        Self::Gauge(m)
    }
}
impl From<Arc<GaugeF64>> for Metric {
    fn from(m: Arc<GaugeF64>) -> Self {
        Self::GaugeF64(m)
    }
}
impl From<Arc<Histogram>> for Metric {
    fn from(m: Arc<Histogram>) -> Self {
        Self::Histogram(m)
    }
}
impl From<Arc<Meter>> for Metric {
    fn from(m: Arc<Meter>) -> Self {
        Self::Meter(m)
    }
}
impl From<Arc<Timer>> for Metric {
    fn from(m: Arc<Timer>) -> Self {
        Self::Timer(m)
    }
}

/// Committed statistics of one metric at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricSnapshot {
    Counter(i64),
    Gauge(i64),
    GaugeF64(f64),
    Histogram(PercentileSet),
    Meter(MeterSnapshot),
    Timer(TimerSnapshot),
    Unsupported,
}
