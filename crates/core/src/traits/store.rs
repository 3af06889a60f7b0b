//! Data traits: cache backends and the remote tab service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::error::Result;
use crate::types::Row;

/// Key/value store with per-entry TTL.
///
/// Expired entries must read as absent even when they are still stored.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get a live entry.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Store an entry, replacing any previous one (last write wins).
    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<()>;

    /// Remove an entry.
    async fn invalidate(&self, key: &str) -> Result<()>;

    /// Backend name for logs and metrics.
    fn backend(&self) -> &'static str;
}

/// Rows of one tab plus its header order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TabContents {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

/// Raw read/write access to a store's tabular data.
#[async_trait]
pub trait TabSource: Send + Sync {
    /// Titles of every tab.
    async fn list_tabs(&self, store_id: &str) -> Result<Vec<String>>;

    /// Headers and rows of one tab, by exact title.
    async fn fetch_tab(&self, store_id: &str, tab: &str) -> Result<TabContents>;

    /// Append one row to a tab.
    async fn append_row(&self, store_id: &str, tab: &str, row: Row) -> Result<()>;
}
