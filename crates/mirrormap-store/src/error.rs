//! Error types for the mirrormap-store crate.
//!
//! Mapper operations return [`MapperError`] via [`MapperResult`]. The
//! error splits the way failures are handled: [`MappingError`] is raised
//! before any I/O, [`BackingStoreError`] comes from the authoritative store,
//! and [`CacheError`] never leaves the mapper (cache failures are logged).

use thiserror::Error;

use crate::value::AttributeType;

/// Alias for `Result<T, MapperError>`.
pub type MapperResult<T> = Result<T, MapperError>;

/// Alias for `Result<T, BackingStoreError>`.
pub type StoreResult<T> = Result<T, BackingStoreError>;

/// Alias for `Result<T, CacheError>`.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors surfaced by [`Mapper`](crate::Mapper) operations.
#[derive(Debug, Error)]
pub enum MapperError {
    /// The model could not be converted to or from an attribute map.
    #[error(transparent)]
    Mapping(#[from] MappingError),

    /// The backing store rejected or failed a read, write, or delete.
    #[error(transparent)]
    BackingStore(#[from] BackingStoreError),
}

/// A value could not be converted between a native field and an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected {expected}, found {found}")]
pub struct ConversionError {
    /// The semantic type the field declares.
    pub expected: AttributeType,
    /// Short description of the offending value.
    pub found: String,
}

impl ConversionError {
    pub(crate) fn new(expected: AttributeType, found: impl Into<String>) -> Self {
        Self {
            expected,
            found: found.into(),
        }
    }
}

/// Schema or type mismatch while marshalling a model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    /// A key attribute is empty and nothing will generate it.
    #[error("{type_name}: key attribute `{attribute}` is empty and not auto-generated")]
    MissingKey {
        type_name: &'static str,
        attribute: &'static str,
    },

    /// An attribute value cannot be converted to the field's declared type.
    #[error("{type_name}.{attribute}: {source}")]
    Conversion {
        type_name: &'static str,
        attribute: &'static str,
        #[source]
        source: ConversionError,
    },

    /// The schema definition itself is inconsistent.
    #[error("invalid schema for {type_name}: {reason}")]
    InvalidSchema {
        type_name: &'static str,
        reason: String,
    },
}

/// Errors raised by a [`BackingStore`](crate::store::BackingStore).
#[derive(Debug, Error)]
pub enum BackingStoreError {
    /// SQLite operation failed.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored record could not be encoded or decoded.
    #[error("record encoding error: {0}")]
    Json(#[from] serde_json::Error),

    /// A schema migration failed.
    #[error("migration v{version} failed: {message}")]
    Migration { version: u32, message: String },

    /// A blocking task was cancelled or panicked.
    #[error("background task failed: {0}")]
    TaskJoin(String),

    /// A previous statement panicked while holding the connection lock.
    #[error("connection poisoned: {0}")]
    ConnectionPoisoned(String),

    /// The store refused the request (validation, throttling, transport).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<tokio::task::JoinError> for BackingStoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::TaskJoin(err.to_string())
    }
}

/// Errors raised by a [`CacheAdaptor`](crate::cache::CacheAdaptor) or the
/// payload codec.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The payload is not a valid cache document.
    #[error("invalid cache payload: {0}")]
    Payload(String),

    /// The payload is not valid JSON.
    #[error("payload json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The cache backend failed.
    #[error("cache backend error: {0}")]
    Backend(String),
}

/// Errors raised while loading a [`MapperConfig`](crate::config::MapperConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The TOML document is malformed or has wrong types.
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment override holds an unusable value.
    #[error("invalid value for {key}: {value}")]
    InvalidOverride { key: &'static str, value: String },
}
