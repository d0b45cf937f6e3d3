//! Mapper configuration.
//!
//! Loaded from TOML, with `MIRRORMAP_*` environment variables taking
//! precedence. Every field has a default, so an empty document is valid:
//!
//! ```toml
//! table_prefix = "prod_"
//!
//! [store]
//! path = "data/items.db"      # omit for an in-memory store
//!
//! [cache]
//! backend = "moka"            # "memory" | "moka"
//! max_capacity = 10000
//! ttl_seconds = 300
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

/// Top-level mapper settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Prepended to every model type name to form its table name.
    pub table_prefix: String,
    pub store: StoreConfig,
    pub cache: CacheConfig,
}

/// Backing store settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file. `None` keeps items in memory.
    pub path: Option<PathBuf>,
}

/// Cache adaptor settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// Entry limit for the `moka` backend.
    pub max_capacity: u64,
    /// Entry time-to-live for the `moka` backend.
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            max_capacity: 10_000,
            ttl_seconds: 300,
        }
    }
}

/// Which cache adaptor to wire into the mapper.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Unbounded in-process map.
    #[default]
    Memory,
    /// Bounded TTL cache.
    Moka,
}

impl std::str::FromStr for CacheBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "moka" => Ok(Self::Moka),
            _ => Err(()),
        }
    }
}

impl MapperConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        debug!(path = %path.display(), "loaded mapper config");
        Self::from_toml_str(&content)
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(path) = lookup("MIRRORMAP_DB_PATH") {
            self.store.path = (!path.is_empty()).then(|| PathBuf::from(path));
        }
        if let Some(prefix) = lookup("MIRRORMAP_TABLE_PREFIX") {
            self.table_prefix = prefix;
        }
        if let Some(value) = lookup("MIRRORMAP_CACHE_BACKEND") {
            self.cache.backend = value
                .parse()
                .map_err(|()| ConfigError::InvalidOverride {
                    key: "MIRRORMAP_CACHE_BACKEND",
                    value,
                })?;
        }
        if let Some(value) = lookup("MIRRORMAP_CACHE_MAX_CAPACITY") {
            self.cache.max_capacity = parse_u64("MIRRORMAP_CACHE_MAX_CAPACITY", value)?;
        }
        if let Some(value) = lookup("MIRRORMAP_CACHE_TTL_SECONDS") {
            self.cache.ttl_seconds = parse_u64("MIRRORMAP_CACHE_TTL_SECONDS", value)?;
        }
        Ok(self)
    }
}

fn parse_u64(key: &'static str, value: String) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidOverride { key, value })
}
