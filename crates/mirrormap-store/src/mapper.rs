//! Write-through object mapper.
//!
//! [`Mapper`] keeps a backing store and a cache adaptor in step:
//!
//! - `save`: fill auto-generated keys, marshal, write the store, then mirror
//!   the same attribute map into the cache.
//! - `load`: serve from the cache; on a miss read the store and repopulate.
//! - `delete`: remove from the store, then from the cache.
//!
//! The store is the system of record. Store failures propagate and stop the
//! operation before the cache is touched; cache failures are logged and
//! swallowed, and a write that cannot be mirrored evicts the key. There is
//! no atomicity between the two writes, so concurrent saves of one key may
//! leave the cache holding either result until the next write or eviction.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::cache::{CacheAdaptor, InMemoryCacheAdaptor, MokaCacheAdaptor};
use crate::config::{CacheBackend, MapperConfig};
use crate::error::{MapperResult, StoreResult};
use crate::keygen::{self, KeyGenerator, UuidKeyGenerator};
use crate::marshal;
use crate::payload;
use crate::schema::Model;
use crate::store::{BackingStore, ItemKey, MemoryStore, SqliteStore};
use crate::value::{AttributeMap, AttributeValue};

/// Coordinates a [`BackingStore`] and a [`CacheAdaptor`].
///
/// Cheaply cloneable and safe to share across tasks.
#[derive(Clone)]
pub struct Mapper {
    store: Arc<dyn BackingStore>,
    cache: Arc<dyn CacheAdaptor>,
    keygen: Arc<dyn KeyGenerator>,
    table_prefix: String,
}

impl Mapper {
    /// Mapper with UUID key generation and no table prefix.
    pub fn new(store: Arc<dyn BackingStore>, cache: Arc<dyn CacheAdaptor>) -> Self {
        Self::builder(store, cache).build()
    }

    pub fn builder(store: Arc<dyn BackingStore>, cache: Arc<dyn CacheAdaptor>) -> MapperBuilder {
        MapperBuilder {
            store,
            cache,
            keygen: Arc::new(UuidKeyGenerator),
            table_prefix: String::new(),
        }
    }

    /// Wire a mapper from configuration: SQLite when a path is set,
    /// otherwise an in-memory store, plus the configured cache backend.
    pub async fn from_config(config: &MapperConfig) -> StoreResult<Self> {
        let store: Arc<dyn BackingStore> = match &config.store.path {
            Some(path) => Arc::new(SqliteStore::open_and_migrate(path.clone()).await?),
            None => Arc::new(MemoryStore::new()),
        };
        let cache: Arc<dyn CacheAdaptor> = match config.cache.backend {
            CacheBackend::Memory => Arc::new(InMemoryCacheAdaptor::new()),
            CacheBackend::Moka => Arc::new(
                MokaCacheAdaptor::builder("mirrormap")
                    .max_capacity(config.cache.max_capacity)
                    .ttl_seconds(config.cache.ttl_seconds)
                    .build(),
            ),
        };

        let store_kind = if config.store.path.is_some() {
            "sqlite"
        } else {
            "memory"
        };
        info!(
            store = store_kind,
            cache = ?config.cache.backend,
            table_prefix = %config.table_prefix,
            "mapper configured"
        );

        Ok(Self::builder(store, cache)
            .table_prefix(config.table_prefix.clone())
            .build())
    }

    /// The wired backing store.
    pub fn store(&self) -> &Arc<dyn BackingStore> {
        &self.store
    }

    /// The wired cache adaptor.
    pub fn cache(&self) -> &Arc<dyn CacheAdaptor> {
        &self.cache
    }

    /// Table name for model type `M`.
    pub fn table_name<M: Model>(&self) -> String {
        format!("{}{}", self.table_prefix, M::schema().type_name())
    }

    /// Persist `model`, then mirror it into the cache.
    ///
    /// An empty auto-generated key is filled in place before the write, so
    /// the caller sees the generated value afterwards.
    #[instrument(skip_all, fields(type_name = M::schema().type_name()))]
    pub async fn save<M: Model>(&self, model: &mut M) -> MapperResult<()> {
        keygen::ensure_key(model, self.keygen.as_ref())?;
        let item = marshal::to_attribute_map(model)?;
        let key = ItemKey::of(model);
        debug_assert_eq!(
            item.get(M::schema().hash_key().name())
                .map(key_text)
                .unwrap_or_default(),
            key.hash_key,
            "Keyed::hash_key disagrees with the schema hash key attribute"
        );

        self.store
            .put_item(&self.table_name::<M>(), &key, &item)
            .await?;
        debug!(key = %key, "item saved");

        self.populate::<M>(&key, &item).await;
        Ok(())
    }

    /// Load the model stored under `(hash_key, range_key)`.
    ///
    /// Pass an empty `range_key` for models without one. Returns `Ok(None)`
    /// when no record exists.
    #[instrument(skip(self), fields(type_name = M::schema().type_name()))]
    pub async fn load<M: Model>(&self, hash_key: &str, range_key: &str) -> MapperResult<Option<M>> {
        let type_name = M::schema().type_name();

        match self.cache.get(type_name, hash_key, range_key).await {
            Ok(Some(cached)) => match decode_cached::<M>(&cached) {
                Ok(model) => {
                    debug!("served from cache");
                    return Ok(Some(model));
                }
                Err(reason) => {
                    warn!(%reason, "corrupt cache entry, evicting");
                    self.evict::<M>(hash_key, range_key).await;
                }
            },
            Ok(None) => {}
            Err(err) => warn!(%err, "cache read failed, falling back to store"),
        }

        let key = ItemKey::new(hash_key, range_key);
        let Some(item) = self
            .store
            .get_item(&self.table_name::<M>(), &key)
            .await?
        else {
            debug!("not found");
            return Ok(None);
        };

        let model = marshal::from_attribute_map(&item)?;
        self.populate::<M>(&key, &item).await;
        Ok(Some(model))
    }

    /// [`load`](Self::load) by [`ItemKey`].
    pub async fn load_key<M: Model>(&self, key: &ItemKey) -> MapperResult<Option<M>> {
        self.load(&key.hash_key, &key.range_key).await
    }

    /// Delete `model` from the store, then drop its cache entry.
    ///
    /// A store failure leaves the cache entry in place.
    #[instrument(skip_all, fields(type_name = M::schema().type_name()))]
    pub async fn delete<M: Model>(&self, model: &M) -> MapperResult<()> {
        let key = ItemKey::of(model);
        let existed = self
            .store
            .delete_item(&self.table_name::<M>(), &key)
            .await?;
        debug!(key = %key, existed, "item deleted");

        self.evict::<M>(&key.hash_key, &key.range_key).await;
        Ok(())
    }

    /// Drop a cache entry without touching the store. Best-effort.
    pub async fn evict<M: Model>(&self, hash_key: &str, range_key: &str) {
        let type_name = M::schema().type_name();
        if let Err(err) = self.cache.delete(type_name, hash_key, range_key).await {
            warn!(type_name, hash_key, range_key, %err, "cache delete failed");
        }
    }

    /// Convert a raw attribute map into `M` the same way `load` does.
    pub fn marshall_into_object<M: Model>(&self, item: &AttributeMap) -> MapperResult<M> {
        Ok(marshal::from_attribute_map(item)?)
    }

    /// Mirror `item` into the cache. Best-effort.
    ///
    /// When the write cannot be made, any older entry is evicted so the next
    /// `load` misses and repopulates from the store.
    async fn populate<M: Model>(&self, key: &ItemKey, item: &AttributeMap) {
        let type_name = M::schema().type_name();
        let payload = match payload::encode(item) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(type_name, key = %key, %err, "cache payload encoding failed");
                self.evict::<M>(&key.hash_key, &key.range_key).await;
                return;
            }
        };
        if let Err(err) = self
            .cache
            .put(type_name, &key.hash_key, &key.range_key, payload)
            .await
        {
            warn!(type_name, key = %key, %err, "cache write failed");
            self.evict::<M>(&key.hash_key, &key.range_key).await;
        }
    }
}

fn key_text(value: &AttributeValue) -> &str {
    match value {
        AttributeValue::S(s) | AttributeValue::N(s) => s,
        _ => "",
    }
}

fn decode_cached<M: Model>(cached: &str) -> Result<M, String> {
    let item = payload::decode(cached).map_err(|e| e.to_string())?;
    marshal::from_attribute_map(&item).map_err(|e| e.to_string())
}

/// Builder for [`Mapper`].
pub struct MapperBuilder {
    store: Arc<dyn BackingStore>,
    cache: Arc<dyn CacheAdaptor>,
    keygen: Arc<dyn KeyGenerator>,
    table_prefix: String,
}

impl MapperBuilder {
    /// Replace the default UUID key generator.
    pub fn key_generator(mut self, keygen: Arc<dyn KeyGenerator>) -> Self {
        self.keygen = keygen;
        self
    }

    /// Prefix prepended to every table name.
    pub fn table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into();
        self
    }

    pub fn build(self) -> Mapper {
        Mapper {
            store: self.store,
            cache: self.cache,
            keygen: self.keygen,
            table_prefix: self.table_prefix,
        }
    }
}

// ── tests ────────────────────────────────────────────────────────────
