//! Unbounded in-process cache adaptor backed by [`DashMap`].

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use super::{CacheAdaptor, CacheKey};
use crate::error::CacheResult;

/// In-process cache adaptor.
///
/// Cheaply cloneable (`Arc`-backed); clones share the same entries.
#[derive(Clone, Default)]
pub struct InMemoryCacheAdaptor {
    entries: Arc<DashMap<CacheKey, String>>,
}

impl InMemoryCacheAdaptor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.clear();
        debug!("in-memory cache cleared");
    }
}

#[async_trait]
impl CacheAdaptor for InMemoryCacheAdaptor {
    async fn get(
        &self,
        type_name: &str,
        hash_key: &str,
        range_key: &str,
    ) -> CacheResult<Option<String>> {
        let key = CacheKey::new(type_name, hash_key, range_key);
        Ok(self.entries.get(&key).map(|entry| entry.value().clone()))
    }

    async fn put(
        &self,
        type_name: &str,
        hash_key: &str,
        range_key: &str,
        payload: String,
    ) -> CacheResult<()> {
        let key = CacheKey::new(type_name, hash_key, range_key);
        debug!(key = %key, "cache put");
        self.entries.insert(key, payload);
        Ok(())
    }

    async fn delete(&self, type_name: &str, hash_key: &str, range_key: &str) -> CacheResult<()> {
        let key = CacheKey::new(type_name, hash_key, range_key);
        if self.entries.remove(&key).is_some() {
            debug!(key = %key, "cache delete");
        }
        Ok(())
    }
}
