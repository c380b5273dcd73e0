use std::sync::Arc;

use super::row::Row;
use super::writer::write_batch;
use crate::config::ReporterConfig;
use crate::error::{ReporterError, StoreError};
use crate::store::{Connector, Session, Target};

/// Owns the reporter's single live session and knows how to rebuild it.
pub struct ConnectionManager<C: Connector> {
    connector: C,
    config: Arc<ReporterConfig>,
    target: Target,
    session: C::Session,
}

impl<C: Connector> ConnectionManager<C> {
    /// Open the first session. Failure here aborts reporter startup.
    pub async fn establish(connector: C, config: Arc<ReporterConfig>) -> Result<Self, ReporterError> {
        let target = Target::from_config(&config);
        let session = open_session(&connector, &config, &target).await?;
        Ok(Self {
            connector,
            config,
            target,
            session,
        })
    }

    /// Open and bootstrap a fresh session, then swap it in.
    ///
    /// The previous session is dropped only once the new one is ready; on
    /// failure it stays in place for the next attempt.
    pub async fn connect(&mut self) -> Result<(), ReporterError> {
        let session = open_session(&self.connector, &self.config, &self.target).await?;
        self.session = session;
        Ok(())
    }

    /// Liveness probe on the current session. Never replaces it.
    pub async fn ping(&mut self) -> Result<(), StoreError> {
        self.session.ping().await
    }

    /// Write one cycle's rows through the current session.
    pub async fn write(&mut self, rows: &[Row]) -> Result<usize, ReporterError> {
        write_batch(&mut self.session, &self.target, rows).await
    }

    pub fn target(&self) -> &Target {
        &self.target
    }
}

async fn open_session<C: Connector>(
    connector: &C,
    config: &ReporterConfig,
    target: &Target,
) -> Result<C::Session, ReporterError> {
    let mut session = connector
        .open(config)
        .await
        .map_err(|source| ReporterError::Connect {
            address: config.address.clone(),
            source,
        })?;

    for sql in target.bootstrap_sql() {
        session
            .execute(&sql)
            .await
            .map_err(|source| ReporterError::Schema {
                database: target.database.clone(),
                table: target.table.clone(),
                source,
            })?;
    }

    tracing::debug!(address = %config.address, target = %target.qualified(), "clickhouse session ready");
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryConnector;

    fn config() -> Arc<ReporterConfig> {
        Arc::new(ReporterConfig::new("mem:9000", "metrics", "samples"))
    }

    #[tokio::test]
    async fn test_establish_bootstraps_schema() {
        let connector = MemoryConnector::new();
        let manager = ConnectionManager::establish(connector.clone(), config())
            .await
            .unwrap();

        let statements = connector.statements();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0], "CREATE DATABASE IF NOT EXISTS metrics");
        assert!(statements[1].starts_with("CREATE TABLE IF NOT EXISTS metrics.samples"));
        assert_eq!(manager.target().qualified(), "metrics.samples");
        assert_eq!(connector.live_sessions(), 1);
    }

    #[tokio::test]
    async fn test_establish_fails_on_open() {
        let connector = MemoryConnector::new();
        connector.fail_connect(true);
        let err = ConnectionManager::establish(connector, config())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ReporterError::Connect { ref address, .. } if address == "mem:9000"));
    }

    #[tokio::test]
    async fn test_establish_fails_on_schema() {
        let connector = MemoryConnector::new();
        connector.fail_schema(true);
        let err = ConnectionManager::establish(connector.clone(), config())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ReporterError::Schema { .. }));
        // The half-initialised session is not kept around.
        assert_eq!(connector.live_sessions(), 0);
    }

    #[tokio::test]
    async fn test_repeated_connect_leaves_one_session() {
        let connector = MemoryConnector::new();
        let mut manager = ConnectionManager::establish(connector.clone(), config())
            .await
            .unwrap();

        manager.connect().await.unwrap();
        manager.connect().await.unwrap();

        assert_eq!(connector.sessions_opened(), 3);
        assert_eq!(connector.live_sessions(), 1);
        manager.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_connect_keeps_previous_session() {
        let connector = MemoryConnector::new();
        let mut manager = ConnectionManager::establish(connector.clone(), config())
            .await
            .unwrap();

        connector.sever();
        connector.fail_connect(true);
        assert!(manager.ping().await.is_err());
        assert!(manager.connect().await.is_err());
        assert_eq!(connector.live_sessions(), 1);

        connector.fail_connect(false);
        manager.connect().await.unwrap();
        manager.ping().await.unwrap();
        assert_eq!(connector.live_sessions(), 1);
    }
}
