//! # mirrormap-store
//!
//! Object mapper for key-value stores with a write-through cache.
//!
//! Models register a [`Schema`] describing their attributes. The
//! [`Mapper`] marshals them into [`AttributeMap`]s, persists them to a
//! [`BackingStore`], and mirrors every write into a [`CacheAdaptor`] keyed
//! by `(type name, hash key, range key)`.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Mapper (save / load / delete)          │
//! ├──────────────────────┬──────────────────┤
//! │  Marshaller + Schema │  Key generator   │
//! ├──────────────────────┴──────────────────┤
//! │  BackingStore        │  CacheAdaptor    │
//! │  (SQLite / memory)   │  (DashMap / moka)│
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```ignore
//! use mirrormap_store::{InMemoryCacheAdaptor, Mapper, SqliteStore};
//!
//! let store = SqliteStore::open_and_migrate("data/items.db").await?;
//! let mapper = Mapper::new(Arc::new(store), Arc::new(InMemoryCacheAdaptor::new()));
//!
//! mapper.save(&mut order).await?;
//! let again: Option<Order> = mapper.load(&order.id, "").await?;
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod keygen;
pub mod mapper;
pub mod marshal;
pub mod payload;
pub mod schema;
pub mod store;
pub mod value;

#[cfg(test)]
mod fixtures;

// ── re-exports ───────────────────────────────────────────────────────

pub use cache::{CacheAdaptor, CacheKey, CacheStats, InMemoryCacheAdaptor, MokaCacheAdaptor};
pub use config::{CacheBackend, MapperConfig};
pub use error::{
    BackingStoreError, CacheError, ConfigError, ConversionError, MapperError, MapperResult,
    MappingError,
};
pub use keygen::{KeyGenerator, UuidKeyGenerator};
pub use mapper::{Mapper, MapperBuilder};
pub use schema::{AttributeDescriptor, AttributeRole, Keyed, Model, Schema, SchemaBuilder};
pub use store::{BackingStore, ItemKey, MemoryStore, SqliteStore};
pub use value::{AttributeField, AttributeMap, AttributeType, AttributeValue};
