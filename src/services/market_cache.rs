//! Read-through cache for market data.
//!
//! `MarketCache` never fails: a backend error or a slow backend is logged
//! and reported as a miss (or a dropped write), so evaluation carries on
//! as if caching were disabled.

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use mongodb::{
    bson::{doc, DateTime},
    options::ReplaceOptions,
    Collection, Database,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::{sync::RwLock, time::Instant};
use tracing::{debug, warn};

use crate::error::EngineError;

pub const ALL_STOCKS_KEY: &str = "stocks:all";
pub const YIELDS_KEY: &str = "dividends:yields";

pub fn live_key(symbol: &str) -> String {
    format!("stock:live:{}", symbol.to_uppercase())
}

pub fn details_key(symbol: &str) -> String {
    format!("stock:details:{}", symbol.to_uppercase())
}

/// Turns a glob such as `stock:*` into an anchored regex.
pub fn glob_to_regex(pattern: &str) -> String {
    let parts: Vec<String> = pattern.split('*').map(regex::escape).collect();
    format!("^{}$", parts.join(".*"))
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, EngineError>;
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), EngineError>;
    async fn delete(&self, key: &str) -> Result<(), EngineError>;
    /// Returns how many keys were removed.
    async fn delete_pattern(&self, pattern: &str) -> Result<u64, EngineError>;
}

// ---------------- in-process backend ----------------

#[derive(Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, EngineError> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some((value, expires)) if *expires > Instant::now() => {
                    return Ok(Some(value.clone()));
                }
                Some(_) => {}
            }
        }

        // expired: evict lazily
        let mut entries = self.entries.write().await;
        let expired = entries
            .get(key)
            .is_some_and(|(_, expires)| *expires <= Instant::now());
        if expired {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), EngineError> {
        let expires = Instant::now() + ttl;
        self.entries
            .write()
            .await
            .insert(key.to_string(), (value, expires));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), EngineError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<u64, EngineError> {
        let re = regex::Regex::new(&glob_to_regex(pattern))
            .map_err(|e| EngineError::Store(format!("bad cache pattern {pattern}: {e}")))?;

        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|k, _| !re.is_match(k));
        Ok((before - entries.len()) as u64)
    }
}

// ---------------- MongoDB backend ----------------

#[derive(Debug, Serialize, Deserialize)]
struct CacheDoc {
    #[serde(rename = "_id")]
    key: String,
    value: String,
    expires_at: DateTime,
}

pub struct MongoCacheStore {
    col: Collection<CacheDoc>,
}

impl MongoCacheStore {
    pub fn new(db: &Database) -> Self {
        Self {
            col: db.collection::<CacheDoc>("market_cache"),
        }
    }
}

#[async_trait]
impl CacheStore for MongoCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, EngineError> {
        // the TTL monitor only sweeps once a minute, so filter on expiry too
        let found = self
            .col
            .find_one(doc! { "_id": key, "expires_at": { "$gt": DateTime::now() } }, None)
            .await?;
        Ok(found.map(|d| d.value))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), EngineError> {
        let expires_at =
            DateTime::from_millis(DateTime::now().timestamp_millis() + ttl.as_millis() as i64);
        let item = CacheDoc {
            key: key.to_string(),
            value,
            expires_at,
        };
        let opts = ReplaceOptions::builder().upsert(true).build();
        self.col
            .replace_one(doc! { "_id": key }, &item, opts)
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), EngineError> {
        self.col.delete_one(doc! { "_id": key }, None).await?;
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<u64, EngineError> {
        let res = self
            .col
            .delete_many(doc! { "_id": { "$regex": glob_to_regex(pattern) } }, None)
            .await?;
        Ok(res.deleted_count)
    }
}

// ---------------- facade ----------------

#[derive(Clone)]
pub struct MarketCache {
    store: Option<Arc<dyn CacheStore>>,
    op_timeout: Duration,
}

impl MarketCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store: Some(store),
            op_timeout: Duration::from_secs(2),
        }
    }

    /// Every lookup misses and every write is dropped.
    pub fn disabled() -> Self {
        Self {
            store: None,
            op_timeout: Duration::from_secs(2),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCacheStore::new()))
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let store = self.store.as_ref()?;

        let raw = match tokio::time::timeout(self.op_timeout, store.get(key)).await {
            Ok(Ok(Some(raw))) => raw,
            Ok(Ok(None)) => {
                debug!(key, "cache miss");
                return None;
            }
            Ok(Err(e)) => {
                warn!(key, error = %e, "cache read failed, treating as miss");
                return None;
            }
            Err(_) => {
                warn!(key, "cache read timed out, treating as miss");
                return None;
            }
        };

        match serde_json::from_str::<T>(&raw) {
            Ok(v) => {
                debug!(key, "cache hit");
                Some(v)
            }
            Err(e) => {
                warn!(key, error = %e, "cached value does not decode, dropping it");
                self.invalidate_key(key).await;
                None
            }
        }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let Some(store) = self.store.as_ref() else {
            return;
        };

        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "failed to serialize cache value");
                return;
            }
        };

        match tokio::time::timeout(self.op_timeout, store.set(key, raw, ttl)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(key, error = %e, "failed to write cache"),
            Err(_) => warn!(key, "cache write timed out"),
        }
    }

    pub async fn invalidate(&self, pattern: &str) {
        let Some(store) = self.store.as_ref() else {
            return;
        };

        match tokio::time::timeout(self.op_timeout, store.delete_pattern(pattern)).await {
            Ok(Ok(n)) => debug!(pattern, removed = n, "cache pattern invalidated"),
            Ok(Err(e)) => warn!(pattern, error = %e, "failed to invalidate cache pattern"),
            Err(_) => warn!(pattern, "cache invalidation timed out"),
        }
    }

    pub async fn invalidate_key(&self, key: &str) {
        let Some(store) = self.store.as_ref() else {
            return;
        };

        match tokio::time::timeout(self.op_timeout, store.delete(key)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(key, error = %e, "failed to invalidate cache key"),
            Err(_) => warn!(key, "cache invalidation timed out"),
        }
    }

    /// Drops every stock entry (list, live and details).
    pub async fn invalidate_stock_cache(&self) {
        for pattern in ["stocks:*", "stock:*"] {
            self.invalidate(pattern).await;
        }
    }

    pub async fn invalidate_symbol(&self, symbol: &str) {
        self.invalidate_key(&live_key(symbol)).await;
        self.invalidate_key(&details_key(symbol)).await;
        // the full list contains this symbol too
        self.invalidate_key(ALL_STOCKS_KEY).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LiveStock, Quote};

    struct BrokenStore;

    #[async_trait]
    impl CacheStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, EngineError> {
            Err(EngineError::Store("connection refused".into()))
        }
        async fn set(&self, _: &str, _: String, _: Duration) -> Result<(), EngineError> {
            Err(EngineError::Store("connection refused".into()))
        }
        async fn delete(&self, _key: &str) -> Result<(), EngineError> {
            Err(EngineError::Store("connection refused".into()))
        }
        async fn delete_pattern(&self, _pattern: &str) -> Result<u64, EngineError> {
            Err(EngineError::Store("connection refused".into()))
        }
    }

    #[test]
    fn glob_patterns_are_anchored_and_escaped() {
        let re = regex::Regex::new(&glob_to_regex("stock:*")).unwrap();
        assert!(re.is_match("stock:live:MTN"));
        assert!(!re.is_match("stocks:all"));
        assert!(!re.is_match("xstock:live"));

        let dotted = regex::Regex::new(&glob_to_regex("a.b")).unwrap();
        assert!(!dotted.is_match("axb"));
    }

    #[tokio::test]
    async fn set_then_get_within_ttl() {
        let cache = MarketCache::in_memory();
        cache.set("stock:live:MTN", &1.5_f64, Duration::from_secs(60)).await;
        assert_eq!(cache.get::<f64>("stock:live:MTN").await, Some(1.5));
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = MarketCache::in_memory();
        cache.set("k", &"v", Duration::from_secs(60)).await;
        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.get::<String>("k").await, None);
    }

    #[tokio::test]
    async fn pattern_invalidation_only_hits_matching_keys() {
        let cache = MarketCache::in_memory();
        let ttl = Duration::from_secs(60);
        cache.set("stock:live:MTN", &1, ttl).await;
        cache.set("stock:details:MTN", &2, ttl).await;
        cache.set("dividends:yields", &3, ttl).await;

        cache.invalidate("stock:*").await;

        assert_eq!(cache.get::<i32>("stock:live:MTN").await, None);
        assert_eq!(cache.get::<i32>("stock:details:MTN").await, None);
        assert_eq!(cache.get::<i32>("dividends:yields").await, Some(3));
    }

    #[tokio::test]
    async fn cached_quote_comes_back_bit_for_bit() {
        let cache = MarketCache::in_memory();
        let live = LiveStock {
            name: "MTN".into(),
            price: 1.05,
            change: 0.10,
            volume: 1_000,
        };
        let quote = Quote::from_live(&live, 1_700_000_000);

        cache.set(&live_key("MTN"), &quote, Duration::from_secs(60)).await;
        let cached = cache.get::<Quote>(&live_key("MTN")).await.unwrap();

        assert_eq!(cached, quote);
        assert_eq!(cached.previous_close.to_bits(), quote.previous_close.to_bits());
    }

    #[tokio::test]
    async fn stock_cache_clear_keeps_yield_table() {
        let cache = MarketCache::in_memory();
        let ttl = Duration::from_secs(60);
        cache.set(ALL_STOCKS_KEY, &1, ttl).await;
        cache.set(&live_key("MTN"), &2, ttl).await;
        cache.set(&details_key("GCB"), &3, ttl).await;
        cache.set(YIELDS_KEY, &4, ttl).await;

        cache.invalidate_stock_cache().await;

        assert_eq!(cache.get::<i32>(ALL_STOCKS_KEY).await, None);
        assert_eq!(cache.get::<i32>(&live_key("MTN")).await, None);
        assert_eq!(cache.get::<i32>(&details_key("GCB")).await, None);
        assert_eq!(cache.get::<i32>(YIELDS_KEY).await, Some(4));
    }

    #[tokio::test]
    async fn invalidate_symbol_clears_full_list() {
        let cache = MarketCache::in_memory();
        let ttl = Duration::from_secs(60);
        cache.set(&live_key("gcb"), &1, ttl).await;
        cache.set(ALL_STOCKS_KEY, &2, ttl).await;
        cache.set(&live_key("MTN"), &3, ttl).await;

        cache.invalidate_symbol("GCB").await;

        assert_eq!(cache.get::<i32>(&live_key("GCB")).await, None);
        assert_eq!(cache.get::<i32>(ALL_STOCKS_KEY).await, None);
        assert_eq!(cache.get::<i32>(&live_key("MTN")).await, Some(3));
    }

    #[tokio::test]
    async fn unreachable_store_degrades_to_miss() {
        let cache = MarketCache::new(Arc::new(BrokenStore));
        cache.set("k", &1, Duration::from_secs(60)).await;
        assert_eq!(cache.get::<i32>("k").await, None);
        cache.invalidate("stock:*").await;
    }

    #[tokio::test]
    async fn disabled_cache_always_misses() {
        let cache = MarketCache::disabled();
        cache.set("k", &1, Duration::from_secs(60)).await;
        assert!(!cache.is_enabled());
        assert_eq!(cache.get::<i32>("k").await, None);
    }
}
