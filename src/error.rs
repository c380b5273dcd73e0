//! Error types for the reporter and its store sessions.
//!
//! [`StoreError`] is what a [`Session`](crate::store::Session) reports about
//! the wire; [`ReporterError`] adds which reporter operation was running.

use thiserror::Error;

/// Failure reported by a store session or connector.
#[derive(Debug, Error)]
pub enum StoreError {
    /// ClickHouse driver error (network, protocol or server exception).
    #[error("clickhouse: {0}")]
    Driver(#[from] clickhouse_rs::errors::Error),

    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store refused a statement or a row.
    #[error("rejected by store: {0}")]
    Rejected(String),
}

/// Errors surfaced by the reporter, the registry and configuration.
#[derive(Debug, Error)]
pub enum ReporterError {
    /// Invalid reporter configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Opening a session to the store failed.
    #[error("unable to connect to clickhouse at {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: StoreError,
    },

    /// Creating the target database or table failed.
    #[error("unable to bootstrap schema {database}.{table}: {source}")]
    Schema {
        database: String,
        table: String,
        #[source]
        source: StoreError,
    },

    /// The store refused to start a batch.
    #[error("unable to prepare insert: {0}")]
    Prepare(#[source] StoreError),

    /// A row could not be staged; the whole batch was abandoned.
    #[error("row {index} rejected, batch abandoned: {source}")]
    RowRejected {
        index: usize,
        #[source]
        source: StoreError,
    },

    /// Committing the batch failed; none of its rows were stored.
    #[error("commit of {rows} rows failed: {source}")]
    Commit {
        rows: usize,
        #[source]
        source: StoreError,
    },

    /// A metric with this name is already registered.
    #[error("metric {0:?} is already registered")]
    DuplicateMetric(String),

    /// The name is registered with a different kind of metric.
    #[error("metric {name:?} is registered as a {found}, not a {expected}")]
    KindMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_error_names_address() {
        let err = ReporterError::Connect {
            address: "ch1:9000".into(),
            source: StoreError::Unavailable("connection refused".into()),
        };
        let msg = err.to_string();
        assert!(msg.contains("ch1:9000"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn test_kind_mismatch_message() {
        let err = ReporterError::KindMismatch {
            name: "requests".into(),
            expected: "counter",
            found: "meter",
        };
        assert_eq!(
            err.to_string(),
            "metric \"requests\" is registered as a meter, not a counter"
        );
    }
}
