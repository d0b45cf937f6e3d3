//! SQLite backing store with WAL mode and performance pragmas.
//!
//! [`SqliteStore`] wraps a `rusqlite::Connection` behind an `Arc<Mutex<>>`
//! and runs every statement on the blocking pool via
//! `tokio::task::spawn_blocking`. Items are stored one row per key with the
//! attribute map serialized in its tagged JSON form.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info, instrument};

use super::migration;
use super::{BackingStore, ItemKey};
use crate::error::{BackingStoreError, StoreResult};
use crate::value::AttributeMap;

/// Thread-safe handle to a SQLite-backed item store.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) a database at `path` and apply performance pragmas.
    ///
    /// Blocks briefly on file I/O; call during startup or use
    /// [`SqliteStore::open_and_migrate`].
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "opening item store");

        let conn = Connection::open(path)?;
        Self::apply_pragmas(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory database. Migrations still need to run.
    pub fn open_in_memory() -> StoreResult<Self> {
        debug!("opening in-memory item store");

        let conn = Connection::open_in_memory()?;
        Self::apply_pragmas(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open the database at `path` and run all pending migrations.
    pub async fn open_and_migrate(path: impl AsRef<Path> + Send + 'static) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let store = tokio::task::spawn_blocking(move || Self::open(&path)).await??;
        store.run_migrations().await?;
        Ok(store)
    }

    /// Open a migrated in-memory database.
    pub async fn in_memory() -> StoreResult<Self> {
        let store = Self::open_in_memory()?;
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run all pending schema migrations.
    pub async fn run_migrations(&self) -> StoreResult<()> {
        self.execute(|conn| migration::run_all(conn)).await
    }

    /// Schema version currently applied.
    pub async fn schema_version(&self) -> StoreResult<u32> {
        self.execute(|conn| migration::current_version(conn)).await
    }

    /// Number of items stored in `table`.
    pub async fn count(&self, table: &str) -> StoreResult<u64> {
        let table = table.to_string();
        self.execute(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT count(*) FROM items WHERE table_name = ?1",
                rusqlite::params![table],
                |row| row.get(0),
            )?;
            Ok(count.max(0) as u64)
        })
        .await
    }

    /// Run a closure against the connection on the blocking pool.
    async fn execute<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| BackingStoreError::ConnectionPoisoned(e.to_string()))?;
            f(&conn)
        })
        .await?
    }

    // ── pragmas ──────────────────────────────────────────────────────

    fn apply_pragmas(conn: &Connection) -> StoreResult<()> {
        debug!("applying SQLite performance pragmas");

        // WAL: readers never block the single writer.
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "temp_store", "MEMORY")?;
        conn.pragma_update(None, "busy_timeout", 5_000_i32)?;

        Ok(())
    }
}

#[async_trait]
impl BackingStore for SqliteStore {
    #[instrument(skip(self, item), fields(key = %key))]
    async fn put_item(&self, table: &str, key: &ItemKey, item: &AttributeMap) -> StoreResult<()> {
        let table = table.to_string();
        let key = key.clone();
        let json = serde_json::to_string(item)?;
        let now = Utc::now().timestamp_millis();

        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO items (table_name, hash_key, range_key, item, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5) \
                 ON CONFLICT(table_name, hash_key, range_key) \
                 DO UPDATE SET item = excluded.item, updated_at = excluded.updated_at",
                rusqlite::params![table, key.hash_key, key.range_key, json, now],
            )?;
            debug!(table = %table, "item stored");
            Ok(())
        })
        .await
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn get_item(&self, table: &str, key: &ItemKey) -> StoreResult<Option<AttributeMap>> {
        let table = table.to_string();
        let key = key.clone();

        let json: Option<String> = self
            .execute(move |conn| {
                let json = conn
                    .query_row(
                        "SELECT item FROM items \
                         WHERE table_name = ?1 AND hash_key = ?2 AND range_key = ?3",
                        rusqlite::params![table, key.hash_key, key.range_key],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(json)
            })
            .await?;

        json.map(|j| serde_json::from_str(&j).map_err(BackingStoreError::from))
            .transpose()
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn delete_item(&self, table: &str, key: &ItemKey) -> StoreResult<bool> {
        let table = table.to_string();
        let key = key.clone();

        self.execute(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM items WHERE table_name = ?1 AND hash_key = ?2 AND range_key = ?3",
                rusqlite::params![table, key.hash_key, key.range_key],
            )?;
            Ok(deleted > 0)
        })
        .await
    }
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::AttributeValue;

    fn item(n: i64) -> AttributeMap {
        let mut map = AttributeMap::new();
        map.insert("hashKey".into(), AttributeValue::S("a".into()));
        map.insert("n".into(), AttributeValue::number(n));
        map.insert("flag".into(), AttributeValue::Bool(true));
        map.insert("blob".into(), AttributeValue::B(vec![1, 2, 3]));
        map
    }

    #[tokio::test]
    async fn in_memory_store_is_migrated() {
        let store = SqliteStore::in_memory().await.unwrap();
        assert_eq!(store.schema_version().await.unwrap(), 1);
        assert_eq!(store.count("T").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn put_and_get_keep_exact_types() {
        let store = SqliteStore::in_memory().await.unwrap();
        let key = ItemKey::new("a", "1");

        store.put_item("T", &key, &item(5)).await.unwrap();
        assert_eq!(store.get_item("T", &key).await.unwrap(), Some(item(5)));
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let store = SqliteStore::in_memory().await.unwrap();
        let key = ItemKey::new("missing", "");
        assert_eq!(store.get_item("T", &key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_overwrites_whole_item() {
        let store = SqliteStore::in_memory().await.unwrap();
        let key = ItemKey::new("a", "");

        store.put_item("T", &key, &item(1)).await.unwrap();
        let mut smaller = AttributeMap::new();
        smaller.insert("n".into(), AttributeValue::number(2));
        store.put_item("T", &key, &smaller).await.unwrap();

        assert_eq!(store.get_item("T", &key).await.unwrap(), Some(smaller));
        assert_eq!(store.count("T").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let store = SqliteStore::in_memory().await.unwrap();
        let key = ItemKey::new("a", "1");

        store.put_item("T", &key, &item(1)).await.unwrap();
        assert!(store.delete_item("T", &key).await.unwrap());
        assert!(!store.delete_item("T", &key).await.unwrap());
        assert_eq!(store.get_item("T", &key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn range_keys_and_tables_are_distinct() {
        let store = SqliteStore::in_memory().await.unwrap();

        store
            .put_item("T", &ItemKey::new("a", "1"), &item(1))
            .await
            .unwrap();
        store
            .put_item("T", &ItemKey::new("a", "2"), &item(2))
            .await
            .unwrap();
        store
            .put_item("U", &ItemKey::new("a", "1"), &item(3))
            .await
            .unwrap();

        assert_eq!(store.count("T").await.unwrap(), 2);
        assert_eq!(
            store.get_item("U", &ItemKey::new("a", "1")).await.unwrap(),
            Some(item(3))
        );
    }

    #[tokio::test]
    async fn corrupt_row_is_a_store_error() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .execute(|conn| {
                conn.execute(
                    "INSERT INTO items (table_name, hash_key, range_key, item, updated_at) \
                     VALUES ('T', 'bad', '', 'not json', 0)",
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let err = store
            .get_item("T", &ItemKey::new("bad", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, BackingStoreError::Json(_)));
    }

    #[tokio::test]
    async fn poisoned_connection_is_reported_as_such() {
        let store = SqliteStore::in_memory().await.unwrap();
        let conn = Arc::clone(&store.conn);
        let _ = std::thread::spawn(move || {
            let _guard = conn.lock().unwrap();
            panic!("statement panicked");
        })
        .join();

        let err = store
            .get_item("T", &ItemKey::new("a", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, BackingStoreError::ConnectionPoisoned(_)));
    }
}
