//! Refresh orchestration.
//!
//! [`ContentService::get`] serves a key from the cache while its entry is
//! fresh. Once the entry is stale or missing, exactly one fetch, extract and
//! normalize run happens per key at a time; every caller waiting on that key
//! gets the run's outcome. A failed run falls back to the previous entry when
//! there is one.

mod flight;

pub use flight::SingleFlight;

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use missal_core::config::SourceSpec;
use missal_core::{CacheEntry, CacheStore, Clock, ContentKey, ContentValue, Error, is_stale};
use serde::{Deserialize, Serialize};

use crate::extract::{extract, normalize_with_warnings};
use crate::fetch::{FetchRequest, Fetcher, source_url};

/// Where a served value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// A fresh entry already in the store.
    Cache,
    /// Produced by a refresh during this request.
    Fresh,
    /// The refresh failed; this is the last good entry.
    StaleFallback,
}

/// A value handed back to a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    pub key: ContentKey,
    pub value: ContentValue,
    pub stored_at: DateTime<Utc>,
    pub origin: Origin,
}

impl Served {
    fn new(entry: CacheEntry, origin: Origin) -> Self {
        Self { key: entry.key, value: entry.value, stored_at: entry.stored_at, origin }
    }
}

type Outcome = Result<Served, Error>;

struct Inner {
    sources: Vec<SourceSpec>,
    store: Arc<dyn CacheStore>,
    fetcher: Arc<dyn Fetcher>,
    clock: Arc<dyn Clock>,
    flight: SingleFlight<Outcome>,
}

/// Content access for every configured key. Cheap to clone.
#[derive(Clone)]
pub struct ContentService {
    inner: Arc<Inner>,
}

impl ContentService {
    pub fn new(
        sources: Vec<SourceSpec>, store: Arc<dyn CacheStore>, fetcher: Arc<dyn Fetcher>, clock: Arc<dyn Clock>,
    ) -> Self {
        Self { inner: Arc::new(Inner { sources, store, fetcher, clock, flight: SingleFlight::default() }) }
    }

    /// Configured keys, whether or not they have been fetched yet.
    pub fn list_keys(&self) -> BTreeSet<ContentKey> {
        self.inner.sources.iter().map(|s| s.key.clone()).collect()
    }

    /// Source configuration for `key`.
    pub fn source(&self, key: &str) -> Option<&SourceSpec> {
        self.inner.source(key).ok()
    }

    /// Stored entry for `key` as-is: no freshness check, no network.
    pub async fn peek(&self, key: &str) -> Result<Option<CacheEntry>, Error> {
        self.inner.source(key)?;
        self.inner.store.get(key).await
    }

    /// Whether `entry` would be refreshed if requested now. Entries for keys
    /// that are no longer configured always count as stale.
    pub fn is_stale(&self, entry: &CacheEntry) -> bool {
        match self.inner.source(&entry.key) {
            Ok(source) => is_stale(Some(entry), &source.staleness, self.inner.clock.now()),
            Err(_) => true,
        }
    }

    /// Freshest available value for `key`.
    ///
    /// Fresh entries are returned without touching the network. Otherwise the
    /// caller joins (or starts) the key's single in-flight refresh.
    pub async fn get(&self, key: &str) -> Result<Served, Error> {
        let source = self.inner.source(key)?;
        let now = self.inner.clock.now();

        if let Some(entry) = self.inner.read(key).await
            && !is_stale(Some(&entry), &source.staleness, now)
        {
            tracing::debug!(key, "cache hit");
            return Ok(Served::new(entry, Origin::Cache));
        }

        let inner = Arc::clone(&self.inner);
        let owned_key = key.to_string();
        self.inner
            .flight
            .run(key, move || async move { inner.refresh(&owned_key).await })
            .await
            .unwrap_or_else(|| Err(Error::Internal(format!("refresh of {key} ended without a result"))))
    }
}

impl Inner {
    fn source(&self, key: &str) -> Result<&SourceSpec, Error> {
        self.sources
            .iter()
            .find(|s| s.key == key)
            .ok_or_else(|| Error::UnknownKey(key.to_string()))
    }

    /// Store read that degrades to "absent" so a broken store never blocks a
    /// refresh.
    async fn read(&self, key: &str) -> Option<CacheEntry> {
        match self.store.get(key).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(key, error = %e, "cache read failed, treating entry as absent");
                None
            }
        }
    }

    /// Body of the single-flight run for `key`.
    async fn refresh(self: Arc<Self>, key: &str) -> Outcome {
        let source = self.source(key)?.clone();

        // Another run may have stored a fresh entry since the caller looked.
        let prior = self.read(key).await;
        if let Some(entry) = &prior
            && !is_stale(Some(entry), &source.staleness, self.clock.now())
        {
            return Ok(Served::new(entry.clone(), Origin::Cache));
        }

        let pipeline = {
            let inner = Arc::clone(&self);
            let source = source.clone();
            tokio::spawn(async move { inner.produce(&source).await })
        };
        let produced = pipeline
            .await
            .unwrap_or_else(|e| Err(Error::Internal(format!("refresh pipeline for {key} failed: {e}"))));

        match produced {
            Ok(value) => {
                let entry = CacheEntry::new(key, value, self.clock.now());
                if let Err(e) = self.store.put(&entry).await {
                    tracing::warn!(key, error = %e, "failed to store refreshed content");
                }
                tracing::info!(key, digest = %entry.value.digest, "content refreshed");
                Ok(Served::new(entry, Origin::Fresh))
            }
            Err(error) => match prior {
                Some(entry) => {
                    tracing::warn!(
                        key,
                        error = %error,
                        stored_at = %entry.stored_at_rfc3339(),
                        "refresh failed, serving stale content"
                    );
                    Ok(Served::new(entry, Origin::StaleFallback))
                }
                None => {
                    tracing::warn!(key, error = %error, "refresh failed with nothing cached");
                    Err(error)
                }
            },
        }
    }

    /// Fetch, extract and normalize one source.
    async fn produce(&self, source: &SourceSpec) -> Result<ContentValue, Error> {
        let url = source_url(&source.url, &source.query)
            .map_err(|e| Error::InvalidInput(format!("sources.{}: {e}", source.key)))?;

        let mut request = FetchRequest::new(url);
        request.headers = source.headers.clone();

        let doc = self.fetcher.fetch(&request).await?;
        tracing::debug!(
            key = %source.key,
            url = %doc.final_url,
            status = doc.status,
            fetch_ms = doc.fetch_ms,
            "fetched source document"
        );

        let fragment = extract(&doc, &source.selector)?;
        Ok(normalize_with_warnings(&fragment, &source.profile).value)
    }
}
