//! Bounded hot cache adaptor using [`moka`].
//!
//! Entries expire after a fixed time-to-live and the least recently used
//! ones are evicted once `max_capacity` is reached. Expiry only ever turns a
//! hit into a miss, which the mapper repairs from the backing store.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tracing::debug;

use super::{CacheAdaptor, CacheKey};
use crate::error::CacheResult;

// ── cache stats ──────────────────────────────────────────────────────

/// Point-in-time counters for one [`MokaCacheAdaptor`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that found nothing (absent or expired).
    pub misses: u64,
    /// Explicit invalidations, including mapper evictions.
    pub invalidations: u64,
}

impl CacheStats {
    /// Fraction of lookups served from the cache, 0.0 before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            return 0.0;
        }
        self.hits as f64 / lookups as f64
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }
}

// ── adaptor ──────────────────────────────────────────────────────────

/// A bounded, TTL-expiring cache adaptor backed by `moka::future::Cache`.
///
/// ```ignore
/// let cache = MokaCacheAdaptor::builder("items")
///     .max_capacity(10_000)
///     .ttl_seconds(300)
///     .build();
/// let mapper = Mapper::new(store, Arc::new(cache));
/// ```
#[derive(Clone)]
pub struct MokaCacheAdaptor {
    name: &'static str,
    inner: Cache<CacheKey, String>,
    counters: Arc<Counters>,
}

impl MokaCacheAdaptor {
    /// Start building a new adaptor.
    pub fn builder(name: &'static str) -> MokaCacheAdaptorBuilder {
        MokaCacheAdaptorBuilder {
            name,
            max_capacity: 10_000,
            ttl_seconds: 300,
        }
    }

    /// Snapshot of this adaptor's counters.
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    /// Approximate number of live entries.
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    /// Flush pending evictions so `entry_count` is exact.
    pub async fn run_pending_tasks(&self) {
        self.inner.run_pending_tasks().await;
    }

    /// Remove all entries.
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
        let stats = self.stats();
        debug!(
            cache = self.name,
            hits = stats.hits,
            misses = stats.misses,
            "cache invalidate_all"
        );
    }
}

#[async_trait]
impl CacheAdaptor for MokaCacheAdaptor {
    async fn get(
        &self,
        type_name: &str,
        hash_key: &str,
        range_key: &str,
    ) -> CacheResult<Option<String>> {
        let key = CacheKey::new(type_name, hash_key, range_key);
        match self.inner.get(&key).await {
            Some(payload) => {
                Counters::bump(&self.counters.hits);
                debug!(cache = self.name, key = %key, "cache hit");
                Ok(Some(payload))
            }
            None => {
                Counters::bump(&self.counters.misses);
                debug!(cache = self.name, key = %key, "cache miss");
                Ok(None)
            }
        }
    }

    async fn put(
        &self,
        type_name: &str,
        hash_key: &str,
        range_key: &str,
        payload: String,
    ) -> CacheResult<()> {
        let key = CacheKey::new(type_name, hash_key, range_key);
        debug!(cache = self.name, key = %key, "cache insert");
        self.inner.insert(key, payload).await;
        Ok(())
    }

    async fn delete(&self, type_name: &str, hash_key: &str, range_key: &str) -> CacheResult<()> {
        let key = CacheKey::new(type_name, hash_key, range_key);
        self.inner.invalidate(&key).await;
        Counters::bump(&self.counters.invalidations);
        debug!(cache = self.name, key = %key, "cache invalidate");
        Ok(())
    }
}

// ── builder ──────────────────────────────────────────────────────────

/// Builder for [`MokaCacheAdaptor`].
pub struct MokaCacheAdaptorBuilder {
    name: &'static str,
    max_capacity: u64,
    ttl_seconds: u64,
}

impl MokaCacheAdaptorBuilder {
    /// Maximum number of entries the cache will hold.
    pub fn max_capacity(mut self, cap: u64) -> Self {
        self.max_capacity = cap;
        self
    }

    /// Time-to-live in seconds for each entry.
    pub fn ttl_seconds(mut self, secs: u64) -> Self {
        self.ttl_seconds = secs;
        self
    }

    /// Build the adaptor.
    pub fn build(self) -> MokaCacheAdaptor {
        let inner = Cache::builder()
            .max_capacity(self.max_capacity)
            .time_to_live(Duration::from_secs(self.ttl_seconds))
            .build();

        debug!(
            name = self.name,
            max_capacity = self.max_capacity,
            ttl_seconds = self.ttl_seconds,
            "cache adaptor created"
        );

        MokaCacheAdaptor {
            name: self.name,
            inner,
            counters: Arc::new(Counters::default()),
        }
    }
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn make_cache() -> MokaCacheAdaptor {
        MokaCacheAdaptor::builder("test")
            .max_capacity(100)
            .ttl_seconds(60)
            .build()
    }

    #[tokio::test]
    async fn put_and_get() {
        let cache = make_cache();
        cache.put("T", "a", "1", "{}".into()).await.unwrap();
        assert_eq!(cache.get("T", "a", "1").await.unwrap(), Some("{}".into()));
    }

    #[tokio::test]
    async fn miss_returns_none() {
        let cache = make_cache();
        assert_eq!(cache.get("T", "nonexistent", "").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_removes_entry_and_is_idempotent() {
        let cache = make_cache();
        cache.put("T", "a", "", "x".into()).await.unwrap();
        cache.delete("T", "a", "").await.unwrap();
        cache.delete("T", "a", "").await.unwrap();
        assert_eq!(cache.get("T", "a", "").await.unwrap(), None);
    }

    #[tokio::test]
    async fn stats_count_lookups_and_invalidations() {
        let cache = make_cache();
        cache.put("T", "a", "", "x".into()).await.unwrap();

        let _ = cache.get("T", "a", "").await;
        let _ = cache.get("T", "nope", "").await;
        cache.delete("T", "a", "").await.unwrap();
        let _ = cache.get("T", "a", "").await;

        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 2,
                invalidations: 1,
            }
        );
        assert!((cache.stats().hit_rate() - (1.0 / 3.0)).abs() < 0.01);
    }

    #[tokio::test]
    async fn clones_share_counters() {
        let cache = make_cache();
        let other = cache.clone();
        other.put("T", "a", "", "x".into()).await.unwrap();
        let _ = other.get("T", "a", "").await;
        assert_eq!(cache.stats().hits, 1);
    }

    #[tokio::test]
    async fn entry_count_after_pending_tasks() {
        let cache = make_cache();
        cache.put("T", "a", "", "x".into()).await.unwrap();
        cache.put("T", "b", "", "y".into()).await.unwrap();
        cache.run_pending_tasks().await;
        assert_eq!(cache.entry_count(), 2);
    }

    #[tokio::test]
    async fn invalidate_all_clears_cache() {
        let cache = make_cache();
        cache.put("T", "a", "", "x".into()).await.unwrap();
        cache.put("T", "b", "", "y".into()).await.unwrap();

        cache.invalidate_all();

        assert!(cache.get("T", "a", "").await.unwrap().is_none());
        assert!(cache.get("T", "b", "").await.unwrap().is_none());
    }

    #[test]
    fn hit_rate_without_lookups_is_zero() {
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }
}
