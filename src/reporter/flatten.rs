use std::time::Duration;

use chrono::{DateTime, DurationRound, TimeDelta, Utc};

use super::row::{Row, TagSet};
use crate::metrics::{MeterSnapshot, MetricSnapshot, PercentileSet, PERCENTILES};

/// Timestamp shared by every row of one flush cycle.
///
/// With `align`, `now` is truncated down to a multiple of `interval`
/// counted from the Unix epoch; it is never rounded up.
pub fn cycle_timestamp(now: DateTime<Utc>, interval: Duration, align: bool) -> DateTime<Utc> {
    if !align {
        return now;
    }
    match TimeDelta::from_std(interval) {
        Ok(step) => now.duration_trunc(step).unwrap_or(now),
        Err(_) => now,
    }
}

/// Turns metric snapshots into rows tagged with a fixed base tag set.
#[derive(Debug, Clone)]
pub struct Flattener {
    base_tags: TagSet,
}

impl Flattener {
    pub fn new(base_tags: TagSet) -> Self {
        Self { base_tags }
    }

    pub fn base_tags(&self) -> &TagSet {
        &self.base_tags
    }

    /// Append the rows for one metric to `out`.
    ///
    /// Single-valued kinds share the base tags; multi-valued kinds get one
    /// row per statistic, each with its own `bucket=<stat>` tag. Unsupported
    /// snapshots produce nothing.
    pub fn flatten(
        &self,
        name: &str,
        snapshot: &MetricSnapshot,
        timestamp: DateTime<Utc>,
        out: &mut Vec<Row>,
    ) {
        match snapshot {
            MetricSnapshot::Counter(count) => {
                self.push_single(out, format!("{name}.count"), *count as f32, timestamp);
            }
            MetricSnapshot::Gauge(v) => {
                self.push_single(out, format!("{name}.gauge"), *v as f32, timestamp);
            }
            MetricSnapshot::GaugeF64(v) => {
                self.push_single(out, format!("{name}.gauge"), *v as f32, timestamp);
            }
            MetricSnapshot::Histogram(h) => {
                self.push_buckets(out, &format!("{name}.histogram"), &histogram_fields(h), timestamp);
            }
            MetricSnapshot::Meter(m) => {
                self.push_buckets(out, &format!("{name}.meter"), &meter_fields(m), timestamp);
            }
            MetricSnapshot::Timer(t) => {
                let mut fields = histogram_fields(&t.durations);
                fields.extend([
                    ("m1", t.rate.rate1),
                    ("m5", t.rate.rate5),
                    ("m15", t.rate.rate15),
                    ("meanrate", t.rate.rate_mean),
                ]);
                self.push_buckets(out, &format!("{name}.timer"), &fields, timestamp);
            }
            MetricSnapshot::Unsupported => {}
        }
    }

    fn push_single(&self, out: &mut Vec<Row>, name: String, value: f32, timestamp: DateTime<Utc>) {
        out.push(Row {
            timestamp,
            name,
            tags: self.base_tags.clone(),
            value,
        });
    }

    fn push_buckets(
        &self,
        out: &mut Vec<Row>,
        name: &str,
        fields: &[(&str, f64)],
        timestamp: DateTime<Utc>,
    ) {
        out.extend(fields.iter().map(|(bucket, value)| Row {
            timestamp,
            name: name.to_string(),
            tags: self.base_tags.with_bucket(bucket),
            value: *value as f32,
        }));
    }
}

fn histogram_fields(h: &PercentileSet) -> Vec<(&'static str, f64)> {
    let mut fields = vec![
        ("count", h.count as f64),
        ("max", h.max as f64),
        ("mean", h.mean),
        ("min", h.min as f64),
        ("stddev", h.stddev),
        ("variance", h.variance),
    ];
    fields.extend(
        PERCENTILES
            .iter()
            .zip(h.percentiles)
            .map(|((_, label), v)| (*label, v)),
    );
    fields
}

fn meter_fields(m: &MeterSnapshot) -> [(&'static str, f64); 5] {
    [
        ("count", m.count as f64),
        ("m1", m.rate1),
        ("m5", m.rate5),
        ("m15", m.rate15),
        ("mean", m.rate_mean),
    ]
}
