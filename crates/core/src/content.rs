//! Cached content values and entries.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Stable identifier of one logical content item (e.g. `saint_of_the_day`).
pub type ContentKey = String;

/// Display-ready content produced by the normalizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentValue {
    /// Cleaned fragment markup.
    pub html: String,
    /// Plain-text rendering, one block per line.
    pub text: String,
    /// SHA-256 hex digest of `html`.
    pub digest: String,
}

/// The most recent value stored for a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: ContentKey,
    pub value: ContentValue,
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(key: impl Into<ContentKey>, value: ContentValue, stored_at: DateTime<Utc>) -> Self {
        Self { key: key.into(), value, stored_at }
    }

    /// `stored_at` as an RFC 3339 UTC timestamp, the persisted form.
    pub fn stored_at_rfc3339(&self) -> String {
        self.stored_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

/// Parse a persisted `storedAt` timestamp, normalizing to UTC.
///
/// Naive timestamps (as written by older deployments) are taken to be UTC.
pub fn parse_stored_at(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
