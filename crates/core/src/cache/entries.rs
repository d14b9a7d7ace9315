//! Content entry operations on the SQLite cache.
//!
//! Values are stored as JSON text; `stored_at` as an RFC 3339 UTC string.

use std::collections::BTreeSet;

use async_trait::async_trait;
use tokio_rusqlite::{params, rusqlite};

use super::CacheStore;
use super::connection::CacheDb;
use crate::Error;
use crate::content::{CacheEntry, ContentKey, ContentValue, parse_stored_at};

#[async_trait]
impl CacheStore for CacheDb {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, Error> {
        let key = key.to_string();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<(String, String, String)>, Error> {
                let result = conn.query_row(
                    "SELECT key, value_json, stored_at FROM content_entries WHERE key = ?1",
                    params![key],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                );

                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        let Some((key, value_json, stored_at)) = row else {
            return Ok(None);
        };

        let Some(stored_at) = parse_stored_at(&stored_at) else {
            tracing::warn!(%key, %stored_at, "unparseable stored_at, treating entry as absent");
            return Ok(None);
        };

        match serde_json::from_str::<ContentValue>(&value_json) {
            Ok(value) => Ok(Some(CacheEntry { key, value, stored_at })),
            Err(e) => {
                tracing::warn!(%key, error = %e, "malformed cached value, treating entry as absent");
                Ok(None)
            }
        }
    }

    async fn put(&self, entry: &CacheEntry) -> Result<(), Error> {
        let value_json = serde_json::to_string(&entry.value).map_err(|e| Error::Internal(e.to_string()))?;
        let key = entry.key.clone();
        let digest = entry.value.digest.clone();
        let stored_at = entry.stored_at_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO content_entries (key, value_json, digest, stored_at)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(key) DO UPDATE SET
                        value_json = excluded.value_json,
                        digest = excluded.digest,
                        stored_at = excluded.stored_at",
                    params![key, value_json, digest, stored_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn keys(&self) -> Result<BTreeSet<ContentKey>, Error> {
        self.conn
            .call(|conn| -> Result<BTreeSet<ContentKey>, Error> {
                let mut stmt = conn.prepare("SELECT key FROM content_entries")?;
                let keys = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<BTreeSet<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }
}
