#![deny(unused)]
//! Data layer for Concierge.
//!
//! This crate provides the cache backends (memory, SQLite, Redis), the three
//! caching strategies that decide where a request's store data comes from,
//! and the tab loader that resolves and fetches business tabs.

pub mod http;
pub mod memory;
pub mod redis;
pub mod sqlite;
pub mod strategy;
pub mod tabs;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub use http::HttpTabSource;
pub use memory::InMemoryCacheStore;
pub use self::redis::RedisCacheStore;
pub use sqlite::SqliteCacheStore;
pub use strategy::{
    build_strategy, CallerSuppliedStrategy, CachingStrategy, DatabaseStrategy, InvocationMemoryStrategy,
    LoadOutcome,
};
pub use tabs::{resolve_title, ResolvedTab, TabLoader, LEADS_TAB};

/// Default time-to-live for cached tabs.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// A stored cache value with its validity window (epoch milliseconds).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub payload: Value,
    pub cached_at: i64,
    pub expires_at: i64,
}

impl CacheEntry {
    pub fn new(key: &str, payload: Value, ttl: Duration) -> Self {
        let cached_at = now_millis();
        Self {
            key: key.to_string(),
            payload,
            cached_at,
            expires_at: cached_at.saturating_add(ttl.as_millis() as i64),
        }
    }

    /// Whether the entry is still valid at `now`.
    pub fn is_live(&self, now: i64) -> bool {
        self.expires_at > now
    }
}

pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_window() {
        let entry = CacheEntry::new("store:a:services", Value::Null, Duration::from_secs(10));
        assert_eq!(entry.expires_at - entry.cached_at, 10_000);
        assert!(entry.is_live(entry.cached_at));
        assert!(!entry.is_live(entry.expires_at));
    }
}
