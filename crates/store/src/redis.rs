//! Redis implementation of CacheStore.

use async_trait::async_trait;
use ::redis::{AsyncCommands, Client};
use serde_json::Value;
use std::time::Duration;

use concierge_core::{traits::CacheStore, Error, Result};

use crate::{now_millis, CacheEntry};

/// Redis-backed cache shared across instances.
///
/// The full entry (payload plus timestamps) is stored as JSON so expiry is
/// checked on read like the other backends. Redis' own TTL is set a little
/// longer only to reclaim memory.
pub struct RedisCacheStore {
    client: Client,
}

impl RedisCacheStore {
    /// Create a new Redis cache store.
    pub fn new(url: &str) -> Result<Self> {
        let client = Client::open(url).map_err(|e| Error::cache(format!("Failed to connect to Redis: {}", e)))?;
        Ok(Self { client })
    }

    async fn connection(&self) -> Result<::redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| Error::cache(format!("Redis connection error: {}", e)))
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut conn = self.connection().await?;
        let data: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| Error::cache(format!("Redis get error: {}", e)))?;

        match data {
            Some(json) => {
                let entry: CacheEntry = serde_json::from_str(&json)
                    .map_err(|e| Error::cache(format!("Failed to deserialize entry: {}", e)))?;
                Ok(entry.is_live(now_millis()).then_some(entry.payload))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<()> {
        let mut conn = self.connection().await?;
        let entry = CacheEntry::new(key, value, ttl);
        let json = serde_json::to_string(&entry)?;

        let _: () = conn
            .set_ex(key, json, ttl.as_secs() + 60)
            .await
            .map_err(|e| Error::cache(format!("Redis set error: {}", e)))?;
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: () = conn
            .del(key)
            .await
            .map_err(|e| Error::cache(format!("Redis delete error: {}", e)))?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
