//! Store seam between the reporter and ClickHouse.
//!
//! - [`Connector`] opens sessions.
//! - [`Session`] is one live connection: ping, DDL, batched inserts.
//! - [`Batch`] stages the rows of one flush cycle; nothing reaches the
//!   store until [`Session::commit`], and a dropped batch is discarded.
//!
//! [`clickhouse`] talks the native TCP protocol; [`memory`] keeps rows in
//! process for tests and dry runs.

pub mod clickhouse;
pub mod memory;
pub mod schema;

use async_trait::async_trait;

use crate::config::ReporterConfig;
use crate::error::StoreError;
use crate::reporter::row::Row;

pub use schema::Target;

/// Opens new sessions to the store.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Session: Session;

    /// Open a fresh session using the configured address and credentials.
    async fn open(&self, config: &ReporterConfig) -> Result<Self::Session, StoreError>;
}

/// One exclusively owned connection to the store.
#[async_trait]
pub trait Session: Send + 'static {
    type Batch: Batch;

    /// Cheap liveness probe.
    async fn ping(&mut self) -> Result<(), StoreError>;

    /// Run a statement that returns no rows (DDL).
    async fn execute(&mut self, sql: &str) -> Result<(), StoreError>;

    /// Start staging rows for `target`.
    fn prepare(&self, target: &Target) -> Result<Self::Batch, StoreError>;

    /// Send every staged row as one unit; all or nothing.
    async fn commit(&mut self, batch: Self::Batch) -> Result<(), StoreError>;
}

/// Rows staged for a single commit.
pub trait Batch: Send + 'static {
    /// Stage one row.
    fn append(&mut self, row: &Row) -> Result<(), StoreError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
