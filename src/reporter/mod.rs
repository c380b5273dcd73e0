//! The reporting loop.
//!
//! Each [`Reporter`] owns its config, its connection and its timers. Two
//! independent intervals drive it:
//!
//! - flush: snapshot every metric, flatten, write one batch
//! - health check: ping, and rebuild the session if the ping fails
//!
//! Both run on the reporter's own task, so a flush never races a reconnect.

pub mod connection;
pub mod flatten;
pub mod row;
pub mod writer;

use std::convert::Infallible;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::ReporterConfig;
use crate::error::ReporterError;
use crate::metrics::{Metric, Registry};
use crate::store::clickhouse::ClickHouseConnector;
use crate::store::Connector;

use connection::ConnectionManager;
use flatten::{cycle_timestamp, Flattener};
use row::Row;

/// Outcome of one health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    /// Ping succeeded.
    Alive,
    /// Ping failed and a fresh session replaced the old one.
    Reconnected,
    /// Ping and reconnect both failed; the old session is kept.
    Down,
}

/// Periodically exports a registry to the store.
pub struct Reporter<C: Connector = ClickHouseConnector> {
    registry: Arc<dyn Registry>,
    config: Arc<ReporterConfig>,
    flattener: Flattener,
    connection: ConnectionManager<C>,
}

impl<C: Connector> Reporter<C> {
    /// Validate the config, connect and bootstrap the schema.
    ///
    /// Any failure here is returned; there is no retry at this level.
    pub async fn start(
        registry: Arc<dyn Registry>,
        config: ReporterConfig,
        connector: C,
    ) -> Result<Self, ReporterError> {
        config.validate()?;
        let config = Arc::new(config);
        let flattener = Flattener::new(config.base_tags());
        let connection = ConnectionManager::establish(connector, config.clone()).await?;

        tracing::info!(
            address = %config.address,
            target = %connection.target().qualified(),
            interval = ?config.flush_interval,
            align = config.align,
            "clickhouse reporter started"
        );

        Ok(Self {
            registry,
            config,
            flattener,
            connection,
        })
    }

    /// Snapshot and flatten every registered metric for a cycle at `now`.
    pub fn collect(&self, now: DateTime<Utc>) -> Vec<Row> {
        let timestamp = cycle_timestamp(now, self.config.flush_interval, self.config.align);
        let mut rows = Vec::new();
        self.registry.each(&mut |name: &str, metric: &Metric| {
            self.flattener
                .flatten(name, &metric.snapshot(), timestamp, &mut rows);
        });
        rows
    }

    /// Run one flush cycle now. Returns the number of rows written.
    pub async fn flush(&mut self) -> Result<usize, ReporterError> {
        self.flush_at(Utc::now()).await
    }

    /// Run one flush cycle as if the clock read `now`.
    pub async fn flush_at(&mut self, now: DateTime<Utc>) -> Result<usize, ReporterError> {
        let rows = self.collect(now);
        self.connection.write(&rows).await
    }

    /// Ping the store; on failure try once to rebuild the session.
    pub async fn health_check(&mut self) -> Health {
        let Err(e) = self.connection.ping().await else {
            return Health::Alive;
        };
        tracing::warn!(
            error = %e,
            address = %self.config.address,
            "clickhouse ping failed, recreating client"
        );

        match self.connection.connect().await {
            Ok(()) => {
                tracing::info!(address = %self.config.address, "clickhouse client recreated");
                Health::Reconnected
            }
            Err(e) => {
                tracing::error!(error = %e, "unable to recreate clickhouse client");
                Health::Down
            }
        }
    }

    /// Drive both timers forever.
    ///
    /// Failures are logged and never end the loop. The first flush and the
    /// first health check happen one period after the call.
    pub async fn run(mut self) -> Infallible {
        let flush_period = self.config.flush_interval;
        let health_period = self.config.health_check_interval;

        let start = Instant::now();
        let mut flush_ticker = time::interval_at(start + flush_period, flush_period);
        flush_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut health_ticker = time::interval_at(start + health_period, health_period);
        health_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = flush_ticker.tick() => {
                    match self.flush().await {
                        Ok(rows) => tracing::debug!(rows, "metrics flushed to clickhouse"),
                        Err(e) => tracing::warn!(error = %e, "unable to send metrics to clickhouse"),
                    }
                }
                _ = health_ticker.tick() => {
                    self.health_check().await;
                }
            }
        }
    }

    /// Move the reporter onto its own tokio task.
    pub fn spawn(self) -> JoinHandle<Infallible> {
        tokio::spawn(self.run())
    }
}

// ─── Entry points ────────────────────────────────────────────────

/// Start a ClickHouse reporter for `registry` and run it for the rest of
/// the process, tagging rows with `config.tags` (empty by default).
///
/// Only returns if startup fails.
pub async fn run(
    registry: Arc<dyn Registry>,
    config: ReporterConfig,
) -> Result<Infallible, ReporterError> {
    run_with_connector(registry, config, ClickHouseConnector).await
}

/// Like [`run`], with `tags` merged into the configured base tags.
pub async fn run_with_tags<K, V>(
    registry: Arc<dyn Registry>,
    config: ReporterConfig,
    tags: impl IntoIterator<Item = (K, V)>,
) -> Result<Infallible, ReporterError>
where
    K: Into<String>,
    V: Into<String>,
{
    let mut config = config;
    config
        .tags
        .extend(tags.into_iter().map(|(k, v)| (k.into(), v.into())));
    run(registry, config).await
}

/// [`run`] on a new tokio task.
pub fn spawn(
    registry: Arc<dyn Registry>,
    config: ReporterConfig,
) -> JoinHandle<Result<Infallible, ReporterError>> {
    tokio::spawn(run(registry, config))
}

/// [`run`] against any store.
pub async fn run_with_connector<C: Connector>(
    registry: Arc<dyn Registry>,
    config: ReporterConfig,
    connector: C,
) -> Result<Infallible, ReporterError> {
    let reporter = Reporter::start(registry, config, connector)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "unable to make clickhouse client"))?;
    Ok(reporter.run().await)
}
