//! SQLite-backed cache store.
//!
//! One row per key. Reads filter on `expires_at`, so stale rows are simply
//! ignored until the next write replaces them.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use concierge_core::{traits::CacheStore, Error, Result};

use crate::{now_millis, CacheEntry};

/// Persistent cache shared across requests and processes.
pub struct SqliteCacheStore {
    conn: Arc<tokio::sync::Mutex<Connection>>,
}

impl SqliteCacheStore {
    /// Open (or create) the cache database at the given path.
    pub fn new(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| Error::cache(format!("DB error: {}", e)))?;
        Self::init(conn)
    }

    /// Cache database that lives only as long as this value.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::cache(format!("DB error: {}", e)))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS cache_entries (
                key TEXT PRIMARY KEY,
                payload TEXT NOT NULL,   -- JSON
                cached_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL
            )",
            [],
        )
        .map_err(|e| Error::cache(format!("Schema error: {}", e)))?;

        Ok(Self {
            conn: Arc::new(tokio::sync::Mutex::new(conn)),
        })
    }

    /// Number of physically stored rows, live or expired.
    pub async fn row_count(&self) -> Result<usize> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get::<_, i64>(0))
                .map(|n| n as usize)
                .map_err(|e| Error::cache(format!("Count error: {}", e)))
        })
        .await
        .map_err(|e| Error::internal(e.to_string()))?
    }
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let conn = self.conn.clone();
        let key = key.to_string();
        let now = now_millis();

        let payload: Option<String> = tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.query_row(
                "SELECT payload FROM cache_entries WHERE key = ?1 AND expires_at > ?2",
                params![key, now],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| Error::cache(format!("Select error: {}", e)))
        })
        .await
        .map_err(|e| Error::internal(e.to_string()))??;

        payload
            .map(|json| serde_json::from_str(&json).map_err(|e| Error::cache(format!("Corrupt entry: {}", e))))
            .transpose()
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<()> {
        let conn = self.conn.clone();
        let entry = CacheEntry::new(key, value, ttl);
        let payload = serde_json::to_string(&entry.payload)?;

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.execute(
                "INSERT OR REPLACE INTO cache_entries (key, payload, cached_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![entry.key, payload, entry.cached_at, entry.expires_at],
            )
            .map_err(|e| Error::cache(format!("Insert error: {}", e)))?;
            Ok(())
        })
        .await
        .map_err(|e| Error::internal(e.to_string()))?
    }

    async fn invalidate(&self, key: &str) -> Result<()> {
        let conn = self.conn.clone();
        let key = key.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key])
                .map_err(|e| Error::cache(format!("Delete error: {}", e)))?;
            Ok(())
        })
        .await
        .map_err(|e| Error::internal(e.to_string()))?
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_round_trip_before_ttl() {
        let store = SqliteCacheStore::in_memory().unwrap();
        store
            .set("store:s1:hours", json!([{"day": "Monday", "open": "09:00"}]), Duration::from_secs(3600))
            .await
            .unwrap();

        let loaded = store.get("store:s1:hours").await.unwrap();
        assert_eq!(loaded, Some(json!([{"day": "Monday", "open": "09:00"}])));
    }

    #[tokio::test]
    async fn test_expired_row_filtered_at_query_time() {
        let store = SqliteCacheStore::in_memory().unwrap();
        store.set("k", json!({"a": 1}), Duration::ZERO).await.unwrap();

        assert_eq!(store.get("k").await.unwrap(), None);
        assert_eq!(store.row_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_removes_row() {
        let store = SqliteCacheStore::in_memory().unwrap();
        store.set("k", json!(true), Duration::from_secs(60)).await.unwrap();
        store.invalidate("k").await.unwrap();
        assert_eq!(store.row_count().await.unwrap(), 0);
    }
}
