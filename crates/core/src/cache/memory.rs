//! Process-local cache store.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::CacheStore;
use crate::Error;
use crate::content::{CacheEntry, ContentKey};

/// In-memory [`CacheStore`]. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<ContentKey, CacheEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with `entries`.
    pub fn with_entries(entries: impl IntoIterator<Item = CacheEntry>) -> Self {
        let entries = entries.into_iter().map(|e| (e.key.clone(), e)).collect();
        Self { entries: RwLock::new(entries) }
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, Error> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, entry: &CacheEntry) -> Result<(), Error> {
        self.entries.write().await.insert(entry.key.clone(), entry.clone());
        Ok(())
    }

    async fn keys(&self) -> Result<BTreeSet<ContentKey>, Error> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }
}
