//! DDL for the metrics table.
//!
//! Columns are `(time, name, tags, value)`, ordered by `(time, name)` so
//! MergeTree parts merge cheaply.

use crate::config::ReporterConfig;

/// Fully qualified destination table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub database: String,
    pub table: String,
}

impl Target {
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
        }
    }

    pub fn from_config(config: &ReporterConfig) -> Self {
        Self::new(config.database.clone(), config.table.clone())
    }

    /// `database.table`
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.database, self.table)
    }

    pub fn create_database_sql(&self) -> String {
        format!("CREATE DATABASE IF NOT EXISTS {}", self.database)
    }

    pub fn create_table_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {}
(
    time DateTime CODEC(DoubleDelta, LZ4),
    name String CODEC(LZ4),
    tags Array(String) CODEC(LZ4),
    value Float32
) ENGINE = MergeTree()
  ORDER BY (time, name)",
            self.qualified()
        )
    }

    /// Statements that make sure the target exists, in execution order.
    pub fn bootstrap_sql(&self) -> [String; 2] {
        [self.create_database_sql(), self.create_table_sql()]
    }

    pub fn insert_sql(&self) -> String {
        format!(
            "INSERT INTO {} (time, name, tags, value) VALUES",
            self.qualified()
        )
    }
}
