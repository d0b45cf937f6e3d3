//! In-process backing store.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use super::{BackingStore, ItemKey};
use crate::error::StoreResult;
use crate::value::AttributeMap;

/// A [`BackingStore`] held entirely in memory.
///
/// Cheaply cloneable; clones share the same items.
#[derive(Clone, Default)]
pub struct MemoryStore {
    items: Arc<DashMap<(String, ItemKey), AttributeMap>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of items across all tables.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[async_trait]
impl BackingStore for MemoryStore {
    async fn put_item(&self, table: &str, key: &ItemKey, item: &AttributeMap) -> StoreResult<()> {
        self.items
            .insert((table.to_string(), key.clone()), item.clone());
        debug!(table, key = %key, "item stored");
        Ok(())
    }

    async fn get_item(&self, table: &str, key: &ItemKey) -> StoreResult<Option<AttributeMap>> {
        Ok(self
            .items
            .get(&(table.to_string(), key.clone()))
            .map(|entry| entry.value().clone()))
    }

    async fn delete_item(&self, table: &str, key: &ItemKey) -> StoreResult<bool> {
        let removed = self
            .items
            .remove(&(table.to_string(), key.clone()))
            .is_some();
        debug!(table, key = %key, removed, "item deleted");
        Ok(removed)
    }
}
