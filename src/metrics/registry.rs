use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{Counter, Gauge, GaugeF64, Histogram, Meter, Metric, Registry, Timer};
use crate::error::ReporterError;

/// Thread-safe name → metric map.
///
/// Lookups take a read lock; registration takes a short write lock.
/// [`Registry::each`] iterates over a copy of the entries, so a slow
/// flush never holds up producers registering new metrics.
#[derive(Debug, Default)]
pub struct MetricRegistry {
    metrics: RwLock<BTreeMap<String, Metric>>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `metric` under `name`; fails if the name is taken.
    pub fn register(&self, name: impl Into<String>, metric: impl Into<Metric>) -> Result<(), ReporterError> {
        match self.metrics.write().entry(name.into()) {
            Entry::Occupied(e) => Err(ReporterError::DuplicateMetric(e.key().clone())),
            Entry::Vacant(e) => {
                e.insert(metric.into());
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Metric> {
        self.metrics.read().get(name).cloned()
    }

    pub fn unregister(&self, name: &str) -> Option<Metric> {
        self.metrics.write().remove(name)
    }

    pub fn len(&self) -> usize {
        self.metrics.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.read().is_empty()
    }

    // ── Get-or-register helpers ─────────────────────────────────

    pub fn counter(&self, name: &str) -> Result<Arc<Counter>, ReporterError> {
        self.get_or_register(name, "counter", |m| match m {
            Metric::Counter(c) => Some(c.clone()),
            _ => None,
        })
    }

    pub fn gauge(&self, name: &str) -> Result<Arc<Gauge>, ReporterError> {
        self.get_or_register(name, "gauge", |m| match m {
            Metric::Gauge(g) => Some(g.clone()),
            _ => None,
        })
    }

    pub fn gauge_f64(&self, name: &str) -> Result<Arc<GaugeF64>, ReporterError> {
        self.get_or_register(name, "gauge_f64", |m| match m {
            Metric::GaugeF64(g) => Some(g.clone()),
            _ => None,
        })
    }

    pub fn histogram(&self, name: &str) -> Result<Arc<Histogram>, ReporterError> {
        self.get_or_register(name, "histogram", |m| match m {
            Metric::Histogram(h) => Some(h.clone()),
            _ => None,
        })
    }

    pub fn meter(&self, name: &str) -> Result<Arc<Meter>, ReporterError> {
        self.get_or_register(name, "meter", |m| match m {
            Metric::Meter(m) => Some(m.clone()),
            _ => None,
        })
    }

    pub fn timer(&self, name: &str) -> Result<Arc<Timer>, ReporterError> {
        self.get_or_register(name, "timer", |m| match m {
            Metric::Timer(t) => Some(t.clone()),
            _ => None,
        })
    }

    fn get_or_register<T>(
        &self,
        name: &str,
        expected: &'static str,
        extract: impl Fn(&Metric) -> Option<Arc<T>>,
    ) -> Result<Arc<T>, ReporterError>
    where
        T: Default,
        Arc<T>: Into<Metric>,
    {
        let mismatch = |found: &Metric| ReporterError::KindMismatch {
            name: name.to_string(),
            expected,
            found: found.kind(),
        };

        if let Some(existing) = self.metrics.read().get(name) {
            return extract(existing).ok_or_else(|| mismatch(existing));
        }

        let mut metrics = self.metrics.write();
        // Another producer may have registered it between the two locks.
        let entry = metrics
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(T::default()).into());
        extract(entry).ok_or_else(|| mismatch(entry))
    }
}

impl Registry for MetricRegistry {
    fn each(&self, f: &mut dyn FnMut(&str, &Metric)) {
        let entries: Vec<(String, Metric)> = self
            .metrics
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (name, metric) in &entries {
            f(name, metric);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_register_returns_same_instance() {
        let reg = MetricRegistry::new();
        let a = reg.counter("hits").unwrap();
        let b = reg.counter("hits").unwrap();
        a.inc(3);
        assert_eq!(b.count(), 3);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_kind_mismatch() {
        let reg = MetricRegistry::new();
        reg.meter("requests").unwrap();
        let err = reg.counter("requests").unwrap_err();
        assert!(matches!(
            err,
            ReporterError::KindMismatch { expected: "counter", found: "meter", .. }
        ));
    }

    #[test]
    fn test_register_duplicate() {
        let reg = MetricRegistry::new();
        reg.register("g", Arc::new(Gauge::new())).unwrap();
        let err = reg.register("g", Arc::new(Counter::new())).unwrap_err();
        assert!(matches!(err, ReporterError::DuplicateMetric(name) if name == "g"));
    }

    #[test]
    fn test_each_visits_all_in_name_order() {
        let reg = MetricRegistry::new();
        reg.timer("b").unwrap();
        reg.counter("a").unwrap();
        reg.register("c", Metric::Opaque(Arc::new("healthcheck"))).unwrap();

        let mut seen = vec![];
        reg.each(&mut |name, metric| seen.push((name.to_string(), metric.kind())));
        assert_eq!(
            seen,
            vec![
                ("a".to_string(), "counter"),
                ("b".to_string(), "timer"),
                ("c".to_string(), "opaque"),
            ]
        );
    }

    #[test]
    fn test_each_allows_registration_from_callback() {
        let reg = MetricRegistry::new();
        reg.counter("a").unwrap();
        reg.each(&mut |_, _| {
            reg.counter("late").unwrap();
        });
        assert!(reg.get("late").is_some());
        assert!(reg.unregister("late").is_some());
        assert_eq!(reg.len(), 1);
    }
}
