//! Key/value cache for normalized content.
//!
//! The [`CacheStore`] trait is the only mutable state shared between callers.
//! Three backends implement it:
//!
//! - [`CacheDb`]: SQLite via tokio-rusqlite, WAL mode, versioned migrations
//! - [`JsonFileStore`]: a single JSON document, one record per key
//! - [`MemoryStore`]: process-local, for tests and ephemeral deployments
//!
//! Every backend replaces whole entries, so a reader sees either the previous
//! entry or the new one, never a mix.

pub mod connection;
pub mod entries;
pub mod hash;
pub mod json_file;
pub mod memory;
pub mod migrations;

use std::collections::BTreeSet;

use async_trait::async_trait;

pub use crate::Error;
use crate::content::{CacheEntry, ContentKey};

pub use connection::CacheDb;
pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

/// Storage for the latest [`CacheEntry`] of each key.
///
/// Writes are last-write-wins per key.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch the entry for `key`, if one was ever stored.
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, Error>;

    /// Store `entry`, replacing any previous entry for the same key.
    async fn put(&self, entry: &CacheEntry) -> Result<(), Error>;

    /// Keys that currently have an entry.
    async fn keys(&self) -> Result<BTreeSet<ContentKey>, Error>;
}
