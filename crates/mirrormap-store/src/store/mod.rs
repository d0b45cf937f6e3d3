//! Backing store abstraction.
//!
//! The backing store is the system of record. The mapper talks to it
//! through [`BackingStore`], one full item per `(table, hash key, range
//! key)`. Two implementations ship with the crate:
//!
//! - [`SqliteStore`]: durable SQLite storage (WAL, versioned migrations).
//! - [`MemoryStore`]: in-process map for tests and ephemeral use.

mod memory;
mod migration;
mod sqlite;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;
use crate::schema::Keyed;
use crate::value::AttributeMap;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Primary key of an item within a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemKey {
    pub hash_key: String,
    /// Empty for models without a range key.
    pub range_key: String,
}

impl ItemKey {
    pub fn new(hash_key: impl Into<String>, range_key: impl Into<String>) -> Self {
        Self {
            hash_key: hash_key.into(),
            range_key: range_key.into(),
        }
    }

    /// The key of a model instance.
    pub fn of(model: &impl Keyed) -> Self {
        Self::new(model.hash_key(), model.range_key())
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.range_key.is_empty() {
            write!(f, "{}", self.hash_key)
        } else {
            write!(f, "{}/{}", self.hash_key, self.range_key)
        }
    }
}

/// The authoritative key-value store.
///
/// Writes are full overwrites; the last writer wins.
#[async_trait]
pub trait BackingStore: Send + Sync {
    /// Write an item, replacing any existing item under `key`.
    async fn put_item(&self, table: &str, key: &ItemKey, item: &AttributeMap) -> StoreResult<()>;

    /// Read an item; `None` when nothing is stored under `key`.
    async fn get_item(&self, table: &str, key: &ItemKey) -> StoreResult<Option<AttributeMap>>;

    /// Delete an item, returning `true` if it existed.
    async fn delete_item(&self, table: &str, key: &ItemKey) -> StoreResult<bool>;
}
