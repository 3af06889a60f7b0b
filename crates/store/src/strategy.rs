//! Caching strategies.
//!
//! Exactly one strategy is active per deployment. Each one answers the same
//! question: where does this request's [`StoreData`] come from?

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use concierge_core::{
    cache_key,
    config::{CacheBackendKind, CacheConfig, CacheStrategyKind},
    CacheStore, CachedData, DataType, Error, Result, Row, StoreData,
};

use crate::{InMemoryCacheStore, RedisCacheStore, SqliteCacheStore, TabLoader};

/// Result of loading a store snapshot.
#[derive(Debug, Clone, Default)]
pub struct LoadOutcome {
    pub data: StoreData,
    /// Tabs served from cache (or from the caller).
    pub hits: Vec<DataType>,
    /// Tabs fetched from the tab service.
    pub fetched: Vec<DataType>,
}

#[async_trait]
pub trait CachingStrategy: Send + Sync {
    /// Load the store snapshot for one request.
    async fn load(&self, store_id: &str, supplied: Option<CachedData>) -> LoadOutcome;

    /// Drop any cached tabs of a store.
    async fn invalidate(&self, store_id: &str) -> Result<()>;

    /// Strategy name for logs, metrics and traces.
    fn name(&self) -> &'static str;
}

/// Read each tab through `cache`, fetch the misses concurrently and write
/// them back. Cache failures are logged and treated as misses.
async fn load_through(
    strategy: &'static str,
    cache: &dyn CacheStore,
    loader: &TabLoader,
    store_id: &str,
    ttl: Duration,
) -> LoadOutcome {
    let mut outcome = LoadOutcome::default();

    for data_type in DataType::ALL {
        let key = cache_key(store_id, data_type);
        let cached = match cache.get(&key).await {
            Ok(Some(value)) => rows_from_value(value),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key = %key, backend = cache.backend(), error = %e, "Cache read failed, treating as miss");
                None
            }
        };
        concierge_governance::track_cache_lookup(strategy, cached.is_some());
        if cached.is_some() {
            outcome.hits.push(data_type);
        }
        outcome.data.set(data_type, cached);
    }

    let missing = outcome.data.missing();
    if missing.is_empty() {
        return outcome;
    }

    let fetched = loader.load(store_id, &missing).await;
    for data_type in missing {
        let Some(rows) = fetched.get(data_type).cloned() else {
            continue;
        };
        let key = cache_key(store_id, data_type);
        if let Err(e) = cache.set(&key, Value::from(rows.clone()), ttl).await {
            tracing::warn!(key = %key, backend = cache.backend(), error = %e, "Cache write failed");
        }
        outcome.fetched.push(data_type);
        outcome.data.set(data_type, Some(rows));
    }

    outcome
}

fn rows_from_value(value: Value) -> Option<Vec<Row>> {
    match value {
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(row) => Some(row),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    }
}

// ===== Database =====

/// Shared cache (SQLite or Redis) that persists across requests.
pub struct DatabaseStrategy {
    cache: Arc<dyn CacheStore>,
    loader: Arc<TabLoader>,
    ttl: Duration,
}

impl DatabaseStrategy {
    pub fn new(cache: Arc<dyn CacheStore>, loader: Arc<TabLoader>) -> Self {
        Self {
            cache,
            loader,
            ttl: crate::DEFAULT_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

#[async_trait]
impl CachingStrategy for DatabaseStrategy {
    async fn load(&self, store_id: &str, supplied: Option<CachedData>) -> LoadOutcome {
        if supplied.is_some() {
            tracing::debug!(store_id = %store_id, "Ignoring caller-supplied data under database strategy");
        }
        load_through(self.name(), self.cache.as_ref(), &self.loader, store_id, self.ttl).await
    }

    async fn invalidate(&self, store_id: &str) -> Result<()> {
        for data_type in DataType::ALL {
            self.cache.invalidate(&cache_key(store_id, data_type)).await?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "database"
    }
}

// ===== In-process memory =====

/// A fresh memory cache per invocation, so nothing survives the request.
pub struct InvocationMemoryStrategy {
    loader: Arc<TabLoader>,
    ttl: Duration,
}

impl InvocationMemoryStrategy {
    pub fn new(loader: Arc<TabLoader>) -> Self {
        Self {
            loader,
            ttl: crate::DEFAULT_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

#[async_trait]
impl CachingStrategy for InvocationMemoryStrategy {
    async fn load(&self, store_id: &str, supplied: Option<CachedData>) -> LoadOutcome {
        if supplied.is_some() {
            tracing::debug!(store_id = %store_id, "Ignoring caller-supplied data under memory strategy");
        }
        let cache = InMemoryCacheStore::new();
        load_through(self.name(), &cache, &self.loader, store_id, self.ttl).await
    }

    async fn invalidate(&self, _store_id: &str) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

// ===== Caller-supplied =====

/// Legacy mode: the caller ships the data; tabs it omits are fetched
/// directly, with no cache lookups at all.
pub struct CallerSuppliedStrategy {
    loader: Arc<TabLoader>,
}

impl CallerSuppliedStrategy {
    pub fn new(loader: Arc<TabLoader>) -> Self {
        Self { loader }
    }
}

#[async_trait]
impl CachingStrategy for CallerSuppliedStrategy {
    async fn load(&self, store_id: &str, supplied: Option<CachedData>) -> LoadOutcome {
        let mut outcome = LoadOutcome {
            data: supplied.map(StoreData::from).unwrap_or_default(),
            ..Default::default()
        };
        outcome.hits = DataType::ALL
            .into_iter()
            .filter(|t| outcome.data.get(*t).is_some())
            .collect();

        let missing = outcome.data.missing();
        if !missing.is_empty() {
            let fetched = self.loader.load(store_id, &missing).await;
            for data_type in missing {
                if let Some(rows) = fetched.get(data_type).cloned() {
                    outcome.fetched.push(data_type);
                    outcome.data.set(data_type, Some(rows));
                }
            }
        }
        outcome
    }

    async fn invalidate(&self, _store_id: &str) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "caller_supplied"
    }
}

/// Build the configured strategy.
pub fn build_strategy(config: &CacheConfig, loader: Arc<TabLoader>) -> Result<Arc<dyn CachingStrategy>> {
    let ttl = Duration::from_secs(config.ttl_secs);
    let strategy: Arc<dyn CachingStrategy> = match config.strategy {
        CacheStrategyKind::Database => {
            let cache: Arc<dyn CacheStore> = match config.backend {
                CacheBackendKind::Sqlite => {
                    if let Some(parent) = std::path::Path::new(&config.sqlite_path).parent() {
                        if !parent.as_os_str().is_empty() {
                            std::fs::create_dir_all(parent).map_err(|e| {
                                Error::Configuration(format!("Cannot create cache directory: {}", e))
                            })?;
                        }
                    }
                    Arc::new(SqliteCacheStore::new(&config.sqlite_path)?)
                }
                CacheBackendKind::Redis => {
                    let url = config
                        .redis_url
                        .as_deref()
                        .ok_or_else(|| Error::Configuration("cache.redis_url is required for the redis backend".into()))?;
                    Arc::new(RedisCacheStore::new(url)?)
                }
            };
            Arc::new(DatabaseStrategy::new(cache, loader).with_ttl(ttl))
        }
        CacheStrategyKind::Memory => Arc::new(InvocationMemoryStrategy::new(loader).with_ttl(ttl)),
        CacheStrategyKind::CallerSupplied => Arc::new(CallerSuppliedStrategy::new(loader)),
    };
    tracing::info!(strategy = strategy.name(), ttl_secs = config.ttl_secs, "Caching strategy selected");
    Ok(strategy)
}
