//! Single-file JSON cache store.
//!
//! File layout, one record per key:
//!
//! ```json
//! {
//!   "saint_of_the_day": { "value": { "html": "...", "text": "...", "digest": "..." },
//!                         "storedAt": "2024-03-01T08:00:00Z" }
//! }
//! ```
//!
//! Records written by the older single-file service (`{"value": "<plain text>",
//! "date": "<naive UTC>"}`) are still readable; each text line becomes a `<p>`. Records that fail to decode
//! are kept on disk untouched but read as absent.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use super::CacheStore;
use super::hash::content_digest;
use crate::Error;
use crate::content::{CacheEntry, ContentKey, ContentValue, parse_stored_at};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Record {
    value: ContentValue,
    stored_at: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRecord {
    value: StoredValue,
    #[serde(alias = "date")]
    stored_at: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredValue {
    Current(ContentValue),
    Legacy(String),
}

impl StoredValue {
    fn into_value(self) -> ContentValue {
        match self {
            StoredValue::Current(value) => value,
            StoredValue::Legacy(plain) => {
                let lines: Vec<&str> = plain.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
                let html = lines.iter().map(|line| format!("<p>{}</p>", escape(line))).collect::<Vec<_>>().join("\n");
                ContentValue { digest: content_digest(&html), html, text: lines.join("\n") }
            }
        }
    }
}

fn escape(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    for c in line.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

/// [`CacheStore`] persisted to one JSON document.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    records: RwLock<BTreeMap<String, Value>>,
}

impl JsonFileStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        let records = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice::<BTreeMap<String, Value>>(&bytes)
                .map_err(|e| Error::CacheUnavailable(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(path = %path.display(), records = records.len(), "opened json cache");

        Ok(Self { path, records: RwLock::new(records) })
    }

    fn decode(key: &str, raw: &Value) -> Option<CacheEntry> {
        let record = match StoredRecord::deserialize(raw) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(%key, error = %e, "malformed cache record, treating as absent");
                return None;
            }
        };

        let Some(stored_at) = parse_stored_at(&record.stored_at) else {
            tracing::warn!(%key, stored_at = %record.stored_at, "unparseable storedAt, treating as absent");
            return None;
        };

        Some(CacheEntry { key: key.to_string(), value: record.value.into_value(), stored_at })
    }

    async fn persist(&self, records: &BTreeMap<String, Value>) -> Result<(), Error> {
        let bytes = serde_json::to_vec_pretty(records).map_err(|e| Error::Internal(e.to_string()))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl CacheStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, Error> {
        let records = self.records.read().await;
        Ok(records.get(key).and_then(|raw| Self::decode(key, raw)))
    }

    async fn put(&self, entry: &CacheEntry) -> Result<(), Error> {
        let record = Record { value: entry.value.clone(), stored_at: entry.stored_at_rfc3339() };
        let raw = serde_json::to_value(&record).map_err(|e| Error::Internal(e.to_string()))?;

        let mut records = self.records.write().await;
        let mut next = records.clone();
        next.insert(entry.key.clone(), raw);

        self.persist(&next).await?;
        *records = next;
        Ok(())
    }

    async fn keys(&self) -> Result<BTreeSet<ContentKey>, Error> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|(key, raw)| Self::decode(key, raw).is_some())
            .map(|(key, _)| key.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn make_entry(key: &str, html: &str) -> CacheEntry {
        let value = ContentValue { html: html.into(), text: html.into(), digest: content_digest(html) };
        CacheEntry::new(key, value, Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("data.json")).await.unwrap();
        assert!(store.get("anything").await.unwrap().is_none());
        assert!(store.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_put_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        let entry = make_entry("sunday_homily", "<p>Homily</p>");
        store.put(&entry).await.unwrap();

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(reopened.get("sunday_homily").await.unwrap(), Some(entry));
    }

    #[tokio::test]
    async fn test_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        store.put(&make_entry("saint_of_the_day", "<p>St David</p>")).await.unwrap();

        let raw: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["saint_of_the_day"]["storedAt"], "2024-03-01T08:00:00Z");
        assert_eq!(raw["saint_of_the_day"]["value"]["html"], "<p>St David</p>");
    }

    #[tokio::test]
    async fn test_malformed_and_unknown_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(
            &path,
            r#"{
                "broken": { "value": 42, "storedAt": "2024-03-01T08:00:00Z" },
                "undated": { "value": { "html": "", "text": "", "digest": "" }, "storedAt": "soon" },
                "good": { "value": { "html": "<p>x</p>", "text": "x", "digest": "d" },
                          "storedAt": "2024-03-01T08:00:00", "extra": true }
            }"#,
        )
        .unwrap();

        let store = JsonFileStore::open(&path).await.unwrap();
        assert!(store.get("broken").await.unwrap().is_none());
        assert!(store.get("undated").await.unwrap().is_none());
        assert_eq!(store.get("good").await.unwrap().unwrap().value.text, "x");
        assert_eq!(store.keys().await.unwrap().into_iter().collect::<Vec<_>>(), vec!["good"]);

        // rewriting keeps records it could not decode
        store.put(&make_entry("new", "<p>n</p>")).await.unwrap();
        let raw: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert!(raw.get("broken").is_some());
    }

    #[tokio::test]
    async fn test_reads_legacy_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(
            &path,
            r#"{ "daily_readings": { "value": "First Reading\n  Psalm 23 <R.>\n\nGospel & Acclamation", "date": "2024-03-01T08:15:02.123456" } }"#,
        )
        .unwrap();

        let store = JsonFileStore::open(&path).await.unwrap();
        let entry = store.get("daily_readings").await.unwrap().unwrap();
        assert_eq!(entry.stored_at, Utc.with_ymd_and_hms(2024, 3, 1, 8, 15, 2).unwrap() + chrono::Duration::microseconds(123456));
        assert_eq!(entry.value.html, "<p>First Reading</p>\n<p>Psalm 23 &lt;R.&gt;</p>\n<p>Gospel &amp; Acclamation</p>");
        assert_eq!(entry.value.text, "First Reading\nPsalm 23 <R.>\nGospel & Acclamation");
        assert_eq!(entry.value.digest, content_digest(&entry.value.html));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = JsonFileStore::open(&path).await;
        assert!(matches!(result, Err(Error::CacheUnavailable(_))));
    }
}
