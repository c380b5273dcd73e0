use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use metrics_clickhouse::{MetricRegistry, ReporterConfig};
use tracing_subscriber::EnvFilter;

mod load_generator;

/// Number of simulated producer tasks.
const CONCURRENCY: u32 = 4;

fn load_config(path: &str) -> ReporterConfig {
    let raw = std::fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("❌ Cannot read config \"{path}\": {e}");
        std::process::exit(1);
    });
    ReporterConfig::from_json(&raw).unwrap_or_else(|e| {
        eprintln!("❌ Invalid config \"{path}\": {e}");
        std::process::exit(1);
    })
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!();
    println!("╔══════════════════════════════════════════════════╗");
    println!("║   📈  METRICS → CLICKHOUSE REPORTER             ║");
    println!("╚══════════════════════════════════════════════════╝");
    println!();

    // ── 1. Load config ───────────────────────────────────────────
    let config = match std::env::args().nth(1) {
        Some(path) => load_config(&path),
        None => ReporterConfig::new("127.0.0.1:9000", "metrics", "samples")
            .flush_interval(Duration::from_secs(3)),
    };
    println!(
        "🔌 Reporting to {} → {}.{} every {:?}",
        config.address, config.database, config.table, config.flush_interval
    );

    // ── 2. Registry + simulated producers ───────────────────────
    let registry = Arc::new(MetricRegistry::new());
    let running = Arc::new(AtomicBool::new(true));
    let workers =
        load_generator::spawn(&registry, running.clone(), CONCURRENCY).unwrap_or_else(|e| {
            eprintln!("❌ Cannot register demo metrics: {e}");
            std::process::exit(1);
        });
    println!("   ✓ {CONCURRENCY} producers running (Ctrl-C to stop)");

    // ── 3. Report until Ctrl-C ──────────────────────────────────
    let instance = uuid::Uuid::new_v4().to_string();
    let tags = [("instance", instance)];
    tokio::select! {
        result = metrics_clickhouse::run_with_tags(registry, config, tags) => match result {
            Ok(never) => match never {},
            Err(e) => {
                eprintln!("❌ Reporter failed to start: {e}");
                eprintln!("   Make sure clickhouse-server is listening on its native TCP port");
                std::process::exit(1);
            }
        },
        _ = tokio::signal::ctrl_c() => {
            println!();
            println!("🛑 Stopping producers...");
        }
    }

    // ── 4. Drain workers ────────────────────────────────────────
    running.store(false, Ordering::Relaxed);
    for handle in workers {
        let _ = handle.await;
    }
    println!("   ✓ Done");
}
