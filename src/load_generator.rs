use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use metrics_clickhouse::metrics::{Counter, Gauge, GaugeF64, Histogram, Meter, Timer};
use metrics_clickhouse::{MetricRegistry, ReporterError};

// ─── Public entry point ──────────────────────────────────────────

/// Metrics shared by every simulated worker.
struct Instruments {
    requests: Arc<Counter>,
    queue_depth: Arc<Gauge>,
    load: Arc<GaugeF64>,
    payload_bytes: Arc<Histogram>,
    errors: Arc<Meter>,
    latency: Arc<Timer>,
}

/// Spawns `concurrency` Tokio tasks that keep mutating metrics in
/// `registry` until `running` is cleared.
pub fn spawn(
    registry: &MetricRegistry,
    running: Arc<AtomicBool>,
    concurrency: u32,
) -> Result<Vec<tokio::task::JoinHandle<()>>, ReporterError> {
    let instruments = Arc::new(Instruments {
        requests: registry.counter("demo.requests")?,
        queue_depth: registry.gauge("demo.queue_depth")?,
        load: registry.gauge_f64("demo.load")?,
        payload_bytes: registry.histogram("demo.payload_bytes")?,
        errors: registry.meter("demo.errors")?,
        latency: registry.timer("demo.latency")?,
    });

    let handles = (0..concurrency)
        .map(|worker_id| {
            let running = running.clone();
            let instruments = instruments.clone();
            tokio::spawn(async move {
                worker(worker_id, running, instruments).await;
            })
        })
        .collect();
    Ok(handles)
}

// ─── Worker loop ─────────────────────────────────────────────────

async fn worker(id: u32, running: Arc<AtomicBool>, m: Arc<Instruments>) {
    // Each worker gets its own deterministic RNG seeded uniquely.
    let mut rng = StdRng::seed_from_u64(1000 + id as u64);
    let mut load = 0.0;

    while running.load(Ordering::Relaxed) {
        let latency = Duration::from_micros(rng.gen_range(200..20_000));

        m.queue_depth.update(rng.gen_range(0..32));
        tokio::time::sleep(latency).await;

        m.requests.inc(1);
        m.latency.update(latency);
        m.payload_bytes.update(rng.gen_range(64..64 * 1024));
        // ~2 % simulated failures
        if rng.gen_bool(0.02) {
            m.errors.mark(1);
        }

        load += 0.12;
        m.load.update(load);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_workers_stop_when_flag_cleared() {
        let registry = MetricRegistry::new();
        let running = Arc::new(AtomicBool::new(true));
        let handles = spawn(&registry, running.clone(), 2).unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        running.store(false, Ordering::Relaxed);
        for handle in handles {
            tokio::time::timeout(Duration::from_secs(1), handle)
                .await
                .unwrap()
                .unwrap();
        }

        let requests = registry.counter("demo.requests").unwrap().count();
        assert!(requests > 0);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(registry.counter("demo.requests").unwrap().count(), requests);
    }
}
