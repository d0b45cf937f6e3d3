//! Schema migrations for [`SqliteStore`](super::SqliteStore).
//!
//! Migrations are static SQL strings keyed by version number. The applied
//! version is tracked in a `_migrations` table so each runs only once.

use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::error::{BackingStoreError, StoreResult};

struct Migration {
    /// Monotonically increasing version number (1, 2, 3, ...).
    version: u32,
    description: &'static str,
    /// May contain multiple statements separated by `;`.
    sql: &'static str,
}

/// All migrations in order. Add new migrations to the end of this array.
static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "items table keyed by table name, hash key and range key",
        sql: r#"
            CREATE TABLE items (
                table_name TEXT NOT NULL,
                hash_key   TEXT NOT NULL,
                range_key  TEXT NOT NULL DEFAULT '',
                item       TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (table_name, hash_key, range_key)
            ) WITHOUT ROWID;
        "#,
    },
];

/// Apply every migration newer than the recorded version.
pub(crate) fn run_all(conn: &Connection) -> StoreResult<()> {
    ensure_migrations_table(conn)?;

    let current = current_version(conn)?;
    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > current).collect();

    if pending.is_empty() {
        debug!(current_version = current, "store schema is up to date");
        return Ok(());
    }

    info!(
        current_version = current,
        pending = pending.len(),
        "running pending migrations"
    );

    for migration in pending {
        apply(conn, migration)?;
    }

    info!(
        new_version = MIGRATIONS.last().map(|m| m.version).unwrap_or(0),
        "all migrations applied"
    );
    Ok(())
}

/// Highest applied migration version, 0 for a fresh database.
pub(crate) fn current_version(conn: &Connection) -> StoreResult<u32> {
    let version: Option<u32> =
        conn.query_row("SELECT MAX(version) FROM _migrations", [], |row| row.get(0))?;
    Ok(version.unwrap_or(0))
}

fn ensure_migrations_table(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version     INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at  INTEGER NOT NULL
        );",
    )
    .map_err(|e| BackingStoreError::Migration {
        version: 0,
        message: format!("failed to create _migrations table: {e}"),
    })?;
    Ok(())
}

fn apply(conn: &Connection, migration: &Migration) -> StoreResult<()> {
    info!(
        version = migration.version,
        description = migration.description,
        "applying migration"
    );

    let failed = |stage: &str, e: rusqlite::Error| BackingStoreError::Migration {
        version: migration.version,
        message: format!("{stage}: {e}"),
    };

    conn.execute_batch("BEGIN IMMEDIATE;")
        .map_err(|e| failed("failed to begin transaction", e))?;

    let result = (|| -> StoreResult<()> {
        conn.execute_batch(migration.sql)
            .map_err(|e| failed("SQL execution failed", e))?;

        let now = chrono::Utc::now().timestamp();
        conn.execute(
            "INSERT INTO _migrations (version, description, applied_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![migration.version, migration.description, now],
        )
        .map_err(|e| failed("failed to record migration", e))?;

        Ok(())
    })();

    match &result {
        Ok(()) => {
            conn.execute_batch("COMMIT;")
                .map_err(|e| failed("failed to commit", e))?;
            info!(version = migration.version, "migration applied");
        }
        Err(err) => {
            warn!(version = migration.version, %err, "migration failed, rolling back");
            let _ = conn.execute_batch("ROLLBACK;");
        }
    }

    result
}
