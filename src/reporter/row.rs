use std::sync::Arc;

use chrono::{DateTime, Utc};

// ─── TagSet ──────────────────────────────────────────────────────

/// Ordered `key=value` tags shared read-only between rows.
///
/// Cloning is a reference-count bump. [`TagSet::with_bucket`] always
/// allocates a new set, so extending one row's tags can never show up in
/// another row that shares the same base.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TagSet(Arc<[String]>);

impl TagSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Render `(key, value)` pairs as `key=value`, preserving iteration order.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        pairs
            .into_iter()
            .map(|(k, v)| format!("{}={}", k.as_ref(), v.as_ref()))
            .collect()
    }

    /// Copy of this set with `bucket=<bucket>` appended.
    pub fn with_bucket(&self, bucket: &str) -> Self {
        let mut tags = Vec::with_capacity(self.0.len() + 1);
        tags.extend(self.0.iter().cloned());
        tags.push(format!("bucket={bucket}"));
        Self(tags.into())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.to_vec()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<String> for TagSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect::<Vec<_>>().into())
    }
}

// ─── Row ─────────────────────────────────────────────────────────

/// One observation as stored: `(time, name, tags, value)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub timestamp: DateTime<Utc>,
    /// Dotted name, e.g. `requests.count` or `latency.timer`.
    pub name: String,
    pub tags: TagSet,
    pub value: f32,
}

impl Row {
    /// Value of the `bucket=` tag, if any.
    pub fn bucket(&self) -> Option<&str> {
        self.tags
            .as_slice()
            .iter()
            .rev()
            .find_map(|t| t.strip_prefix("bucket="))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pairs_keeps_order() {
        let tags = TagSet::from_pairs([("node_id", "1234"), ("job", "99")]);
        assert_eq!(tags.as_slice(), ["node_id=1234", "job=99"]);
    }

    #[test]
    fn test_with_bucket_does_not_touch_base() {
        let base = TagSet::from_pairs([("node", "n1")]);
        let p50 = base.with_bucket("p50");
        let p99 = base.with_bucket("p99");

        assert_eq!(base.as_slice(), ["node=n1"]);
        assert_eq!(p50.as_slice(), ["node=n1", "bucket=p50"]);
        assert_eq!(p99.as_slice(), ["node=n1", "bucket=p99"]);
    }

    #[test]
    fn test_row_bucket() {
        let row = Row {
            timestamp: Utc::now(),
            name: "lat.timer".into(),
            tags: TagSet::empty().with_bucket("m1"),
            value: 0.0,
        };
        assert_eq!(row.bucket(), Some("m1"));
    }
}
