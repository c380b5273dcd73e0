use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ReporterError;
use crate::reporter::row::TagSet;

// ─── Defaults ────────────────────────────────────────────────────

/// Flush period used when none is configured.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(10);

/// Liveness probe period for the store connection.
pub const DEFAULT_HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(5);

fn default_flush_interval() -> Duration {
    DEFAULT_FLUSH_INTERVAL
}
fn default_health_check_interval() -> Duration {
    DEFAULT_HEALTH_CHECK_INTERVAL
}

// ─── ReporterConfig ──────────────────────────────────────────────

/// Everything one reporter instance needs. Immutable once the reporter
/// has been started.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReporterConfig {
    /// ClickHouse native-protocol `host:port` (e.g. `ch1:9000`), not the
    /// HTTP port.
    pub address: String,

    /// Target database, created if missing.
    pub database: String,

    /// Target table, created if missing.
    pub table: String,

    /// Credentials are only sent when both are non-empty.
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,

    /// Period between flush cycles, e.g. `"10s"`.
    #[serde(default = "default_flush_interval", with = "humantime_duration")]
    pub flush_interval: Duration,

    /// Truncate each cycle's timestamp down to a multiple of `flush_interval`.
    #[serde(default)]
    pub align: bool,

    /// Base tags attached to every row as `key=value`.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,

    /// Period between connection liveness probes.
    #[serde(
        default = "default_health_check_interval",
        with = "humantime_duration"
    )]
    pub health_check_interval: Duration,
}

impl ReporterConfig {
    pub fn new(
        address: impl Into<String>,
        database: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            database: database.into(),
            table: table.into(),
            username: String::new(),
            password: String::new(),
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            align: false,
            tags: BTreeMap::new(),
            health_check_interval: DEFAULT_HEALTH_CHECK_INTERVAL,
        }
    }

    pub fn credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    pub fn align(mut self, align: bool) -> Self {
        self.align = align;
        self
    }

    /// Replace the base tags.
    pub fn tags<K, V>(mut self, tags: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.tags = tags
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    pub fn health_check_interval(mut self, interval: Duration) -> Self {
        self.health_check_interval = interval;
        self
    }

    /// Parse a JSON config document.
    pub fn from_json(json: &str) -> Result<Self, ReporterError> {
        serde_json::from_str(json).map_err(|e| ReporterError::Config(format!("invalid json: {e}")))
    }

    /// `(username, password)` when both are set.
    pub fn login(&self) -> Option<(&str, &str)> {
        if self.username.is_empty() || self.password.is_empty() {
            None
        } else {
            Some((&self.username, &self.password))
        }
    }

    /// The `key=value` tag set shared by every row of this reporter.
    pub fn base_tags(&self) -> TagSet {
        TagSet::from_pairs(&self.tags)
    }

    /// Check the config before any connection is attempted.
    ///
    /// Database and table names end up inside DDL and INSERT statements,
    /// so only plain identifiers are accepted.
    pub fn validate(&self) -> Result<(), ReporterError> {
        if self.address.trim().is_empty() {
            return Err(ReporterError::Config("address must not be empty".into()));
        }
        if self.address.contains(['/', '@', '?', '#']) {
            return Err(ReporterError::Config(format!(
                "address {:?} must be plain host:port",
                self.address
            )));
        }
        for (what, name) in [("database", &self.database), ("table", &self.table)] {
            if !is_identifier(name) {
                return Err(ReporterError::Config(format!(
                    "{what} name {name:?} is not a valid identifier"
                )));
            }
        }
        if self.flush_interval.is_zero() {
            return Err(ReporterError::Config("flush_interval must be > 0".into()));
        }
        if self.health_check_interval.is_zero() {
            return Err(ReporterError::Config(
                "health_check_interval must be > 0".into(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for ReporterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReporterConfig")
            .field("address", &self.address)
            .field("database", &self.database)
            .field("table", &self.table)
            .field("username", &self.username)
            .field("password", &if self.password.is_empty() { "" } else { "***" })
            .field("flush_interval", &self.flush_interval)
            .field("align", &self.align)
            .field("tags", &self.tags)
            .field("health_check_interval", &self.health_check_interval)
            .finish()
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Durations as humantime strings (`"10s"`, `"1m 30s"`).
mod humantime_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&humantime::format_duration(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(d)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_applies_defaults() {
        let cfg = ReporterConfig::from_json(
            r#"{"address":"localhost:9000","database":"metrics","table":"samples"}"#,
        )
        .unwrap();
        assert_eq!(cfg.flush_interval, DEFAULT_FLUSH_INTERVAL);
        assert_eq!(cfg.health_check_interval, DEFAULT_HEALTH_CHECK_INTERVAL);
        assert!(!cfg.align);
        assert!(cfg.tags.is_empty());
        assert!(cfg.login().is_none());
        cfg.validate().unwrap();
    }

    #[test]
    fn test_from_json_parses_humantime() {
        let cfg = ReporterConfig::from_json(
            r#"{"address":"ch:9000","database":"m","table":"t",
                "flush_interval":"1m 30s","align":true,
                "tags":{"node":"n1"}}"#,
        )
        .unwrap();
        assert_eq!(cfg.flush_interval, Duration::from_secs(90));
        assert!(cfg.align);
        assert_eq!(cfg.base_tags().as_slice(), ["node=n1".to_string()]);
    }

    #[test]
    fn test_bad_duration_is_config_error() {
        let err = ReporterConfig::from_json(
            r#"{"address":"ch:9000","database":"m","table":"t","flush_interval":"soon"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ReporterError::Config(_)));
    }

    #[test]
    fn test_login_requires_both_parts() {
        let cfg = ReporterConfig::new("ch:9000", "m", "t").credentials("bob", "");
        assert!(cfg.login().is_none());
        let cfg = cfg.credentials("bob", "secret");
        assert_eq!(cfg.login(), Some(("bob", "secret")));
    }

    #[test]
    fn test_validate_rejects_bad_identifiers() {
        for table in ["", "1abc", "a.b", "t; DROP TABLE x"] {
            let cfg = ReporterConfig::new("ch:9000", "metrics", table);
            assert!(cfg.validate().is_err(), "accepted {table:?}");
        }
        ReporterConfig::new("ch:9000", "_m2", "samples_v1")
            .validate()
            .unwrap();
    }

    #[test]
    fn test_validate_address_is_host_port() {
        for address in ["", "  ", "ch:9000/db", "bob@ch:9000", "ch:9000?x=1", "ch:9000#f"] {
            let cfg = ReporterConfig::new(address, "m", "t");
            assert!(cfg.validate().is_err(), "accepted {address:?}");
        }
    }

    #[test]
    fn test_validate_accepts_any_credentials() {
        ReporterConfig::new("ch:9000", "m", "t")
            .credentials("user:name@corp", "p%41ss#w?rd/@")
            .validate()
            .unwrap();
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let cfg = ReporterConfig::new("ch:9000", "m", "t").flush_interval(Duration::ZERO);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let cfg = ReporterConfig::new("ch:9000", "m", "t").credentials("bob", "hunter2");
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("***"));
    }
}
