use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;
use clickhouse_rs::types::Options;
use clickhouse_rs::{Block, ClientHandle, Pool};

use super::{Batch, Connector, Session, Target};
use crate::config::ReporterConfig;
use crate::error::StoreError;
use crate::reporter::row::Row;

/// Native-protocol options for `config.address`.
///
/// Credentials are set on the options, never spliced into the URL, so they
/// reach the server byte for byte. They are only applied when both parts
/// are set.
pub fn connection_options(config: &ReporterConfig) -> Result<Options, StoreError> {
    let options: Options = format!("tcp://{}", config.address).parse()?;
    Ok(match config.login() {
        Some((user, password)) => options
            .username(user)
            .password(password),
        None => options,
    })
}

// ─── Connector ───────────────────────────────────────────────────

/// Opens ClickHouse sessions over the native TCP protocol.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClickHouseConnector;

#[async_trait]
impl Connector for ClickHouseConnector {
    type Session = ClickHouseSession;

    async fn open(&self, config: &ReporterConfig) -> Result<ClickHouseSession, StoreError> {
        let pool = Pool::new(connection_options(config)?);
        let handle = pool.get_handle().await?;
        Ok(ClickHouseSession { handle, _pool: pool })
    }
}

// ─── Session ─────────────────────────────────────────────────────

/// A single checked-out ClickHouse connection.
pub struct ClickHouseSession {
    handle: ClientHandle,
    // Keeps the connection's pool alive for as long as the session.
    _pool: Pool,
}

#[async_trait]
impl Session for ClickHouseSession {
    type Batch = ColumnBatch;

    async fn ping(&mut self) -> Result<(), StoreError> {
        self.handle.ping().await?;
        Ok(())
    }

    async fn execute(&mut self, sql: &str) -> Result<(), StoreError> {
        self.handle.execute(sql).await?;
        Ok(())
    }

    fn prepare(&self, target: &Target) -> Result<ColumnBatch, StoreError> {
        Ok(ColumnBatch::new(target.qualified()))
    }

    async fn commit(&mut self, batch: ColumnBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        let ColumnBatch {
            table,
            time,
            name,
            tags,
            value,
        } = batch;
        // One block is one INSERT: the server applies it whole or not at all.
        let block = Block::new()
            .column("time", time)
            .column("name", name)
            .column("tags", tags)
            .column("value", value);
        self.handle.insert(table, block).await?;
        Ok(())
    }
}

// ─── Batch ───────────────────────────────────────────────────────

/// Rows staged column by column for a single block insert.
#[derive(Debug)]
pub struct ColumnBatch {
    table: String,
    time: Vec<DateTime<Tz>>,
    name: Vec<String>,
    tags: Vec<Vec<String>>,
    value: Vec<f32>,
}

impl ColumnBatch {
    fn new(table: String) -> Self {
        Self {
            table,
            time: Vec::new(),
            name: Vec::new(),
            tags: Vec::new(),
            value: Vec::new(),
        }
    }
}

impl Batch for ColumnBatch {
    fn append(&mut self, row: &Row) -> Result<(), StoreError> {
        self.time.push(row.timestamp.with_timezone(&Tz::UTC));
        self.name.push(row.name.clone());
        self.tags.push(row.tags.to_vec());
        self.value.push(row.value);
        Ok(())
    }

    fn len(&self) -> usize {
        self.name.len()
    }
}
