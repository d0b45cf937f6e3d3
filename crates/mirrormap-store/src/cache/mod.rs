//! Cache adaptors.
//!
//! The mapper mirrors every saved item into a [`CacheAdaptor`] as a JSON
//! payload (see [`payload`](crate::payload)). Adaptors only store opaque
//! strings under a three-part key; they never interpret the payload.
//!
//! - [`InMemoryCacheAdaptor`]: unbounded `DashMap`, for tests and single
//!   process deployments.
//! - [`MokaCacheAdaptor`]: bounded, TTL-expiring hot cache with hit/miss
//!   statistics.

mod bounded;
mod memory;

use std::fmt;

use async_trait::async_trait;

use crate::error::CacheResult;

pub use bounded::{CacheStats, MokaCacheAdaptor, MokaCacheAdaptorBuilder};
pub use memory::InMemoryCacheAdaptor;

/// Storage for serialized cache entries.
///
/// `range_key` is the empty string for models without a range key.
/// Implementations must be safe under concurrent use on the same key.
#[async_trait]
pub trait CacheAdaptor: Send + Sync {
    /// Fetch a payload. A missing entry is `Ok(None)`, never an error.
    async fn get(
        &self,
        type_name: &str,
        hash_key: &str,
        range_key: &str,
    ) -> CacheResult<Option<String>>;

    /// Store a payload, overwriting any existing entry.
    async fn put(
        &self,
        type_name: &str,
        hash_key: &str,
        range_key: &str,
        payload: String,
    ) -> CacheResult<()>;

    /// Remove an entry. Deleting a missing entry is a no-op.
    async fn delete(&self, type_name: &str, hash_key: &str, range_key: &str) -> CacheResult<()>;
}

/// Composite cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub type_name: String,
    pub hash_key: String,
    pub range_key: String,
}

impl CacheKey {
    pub fn new(type_name: &str, hash_key: &str, range_key: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            hash_key: hash_key.to_string(),
            range_key: range_key.to_string(),
        }
    }

    /// Flat `type:hash:range` form for backends keyed by plain strings.
    ///
    /// `:` and `\` inside components are backslash-escaped, so distinct keys
    /// never render to the same string.
    pub fn namespaced(&self) -> String {
        let mut out = String::with_capacity(
            self.type_name.len() + self.hash_key.len() + self.range_key.len() + 2,
        );
        escape_into(&mut out, &self.type_name);
        out.push(':');
        escape_into(&mut out, &self.hash_key);
        out.push(':');
        escape_into(&mut out, &self.range_key);
        out
    }
}

fn escape_into(out: &mut String, component: &str) {
    for c in component.chars() {
        if c == ':' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.namespaced())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespaced_form() {
        let key = CacheKey::new("DataType", "abc", "1");
        assert_eq!(key.namespaced(), "DataType:abc:1");
        assert_eq!(CacheKey::new("Profile", "u", "").to_string(), "Profile:u:");
    }

    #[test]
    fn namespaced_form_does_not_collide() {
        let a = CacheKey::new("T", "a:b", "c");
        let b = CacheKey::new("T", "a", "b:c");
        assert_ne!(a.namespaced(), b.namespaced());
        assert_eq!(a.namespaced(), r"T:a\:b:c");

        let c = CacheKey::new("T", r"a\", "b");
        let d = CacheKey::new("T", "a", r"\b");
        assert_ne!(c.namespaced(), d.namespaced());
    }
}
