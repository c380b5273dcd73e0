//! In-process store for tests and dry runs.
//!
//! Committed rows are kept in memory. Failures can be scripted per
//! operation to exercise the reporter's recovery paths.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{Batch, Connector, Session, Target};
use crate::config::ReporterConfig;
use crate::error::StoreError;
use crate::reporter::row::Row;

#[derive(Debug, Default)]
struct MemoryState {
    rows: Vec<Row>,
    commits: usize,
    statements: Vec<String>,
    opened: u64,
    live: usize,
    /// Sessions with an id below this behave as if the socket was cut.
    severed_below: u64,
    fail_connect: bool,
    fail_schema: bool,
    fail_on_row: Option<usize>,
    fail_commit: bool,
}

/// Connector whose sessions all share one in-memory table.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every committed row, in commit order.
    pub fn rows(&self) -> Vec<Row> {
        self.state.lock().rows.clone()
    }

    /// Number of successful commits (including empty ones).
    pub fn commits(&self) -> usize {
        self.state.lock().commits
    }

    /// DDL statements executed so far.
    pub fn statements(&self) -> Vec<String> {
        self.state.lock().statements.clone()
    }

    /// Sessions ever opened.
    pub fn sessions_opened(&self) -> u64 {
        self.state.lock().opened
    }

    /// Sessions not yet dropped.
    pub fn live_sessions(&self) -> usize {
        self.state.lock().live
    }

    /// Make every open session fail from now on, as if the server went away.
    pub fn sever(&self) {
        let mut state = self.state.lock();
        state.severed_below = state.opened;
    }

    pub fn fail_connect(&self, fail: bool) {
        self.state.lock().fail_connect = fail;
    }

    pub fn fail_schema(&self, fail: bool) {
        self.state.lock().fail_schema = fail;
    }

    /// Reject the `index`th row (0-based) appended to any batch.
    pub fn fail_on_row(&self, index: Option<usize>) {
        self.state.lock().fail_on_row = index;
    }

    pub fn fail_commit(&self, fail: bool) {
        self.state.lock().fail_commit = fail;
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    type Session = MemorySession;

    async fn open(&self, config: &ReporterConfig) -> Result<MemorySession, StoreError> {
        let mut state = self.state.lock();
        if state.fail_connect {
            return Err(StoreError::Unavailable(format!(
                "connection refused: {}",
                config.address
            )));
        }
        let id = state.opened;
        state.opened += 1;
        state.live += 1;
        Ok(MemorySession {
            id,
            state: self.state.clone(),
        })
    }
}

/// One session against a [`MemoryConnector`].
#[derive(Debug)]
pub struct MemorySession {
    id: u64,
    state: Arc<Mutex<MemoryState>>,
}

impl MemorySession {
    fn check_alive(&self, state: &MemoryState) -> Result<(), StoreError> {
        if self.id < state.severed_below {
            Err(StoreError::Unavailable(format!("session {} is broken", self.id)))
        } else {
            Ok(())
        }
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.state.lock().live -= 1;
    }
}

#[async_trait]
impl Session for MemorySession {
    type Batch = MemoryBatch;

    async fn ping(&mut self) -> Result<(), StoreError> {
        let state = self.state.lock();
        self.check_alive(&state)
    }

    async fn execute(&mut self, sql: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        self.check_alive(&state)?;
        if state.fail_schema {
            return Err(StoreError::Rejected(format!("not allowed: {sql}")));
        }
        state.statements.push(sql.to_string());
        Ok(())
    }

    fn prepare(&self, _target: &Target) -> Result<MemoryBatch, StoreError> {
        Ok(MemoryBatch {
            rows: Vec::new(),
            fail_on_row: self.state.lock().fail_on_row,
        })
    }

    async fn commit(&mut self, batch: MemoryBatch) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        self.check_alive(&state)?;
        if state.fail_commit {
            return Err(StoreError::Rejected("commit refused".into()));
        }
        state.rows.extend(batch.rows);
        state.commits += 1;
        Ok(())
    }
}

/// Staged rows; discarded unless committed.
#[derive(Debug)]
pub struct MemoryBatch {
    rows: Vec<Row>,
    fail_on_row: Option<usize>,
}

impl Batch for MemoryBatch {
    fn append(&mut self, row: &Row) -> Result<(), StoreError> {
        if self.fail_on_row == Some(self.rows.len()) {
            return Err(StoreError::Rejected(format!(
                "row {} ({}) refused",
                self.rows.len(),
                row.name
            )));
        }
        self.rows.push(row.clone());
        Ok(())
    }

    fn len(&self) -> usize {
        self.rows.len()
    }
}
