//! Periodic export of in-process metrics to ClickHouse.
//!
//! A [`Reporter`] walks a [`Registry`] on a fixed interval, flattens every
//! metric into `(time, name, tags, value)` rows and writes each cycle as a
//! single block over a native-protocol connection. A second timer pings
//! the connection and rebuilds it when the ping fails.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use metrics_clickhouse::{MetricRegistry, ReporterConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let registry = Arc::new(MetricRegistry::new());
//!     registry.counter("requests")?.inc(1);
//!
//!     let config = ReporterConfig::new("localhost:9000", "metrics", "samples")
//!         .flush_interval(Duration::from_secs(10));
//!     metrics_clickhouse::run_with_tags(registry, config, [("node", "n1")]).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod metrics;
pub mod reporter;
pub mod store;

pub use config::ReporterConfig;
pub use error::{ReporterError, StoreError};
pub use metrics::{Metric, MetricRegistry, MetricSnapshot, Registry};
pub use reporter::row::{Row, TagSet};
pub use reporter::{run, run_with_connector, run_with_tags, spawn, Health, Reporter};
pub use store::clickhouse::ClickHouseConnector;
