//! SQLite schema DDL and migration framework for the inventory store.

use rusqlite::Connection;

use crate::errors::{SyncError, SyncResult};

/// Current schema version. Migrations run from whatever the DB currently
/// reports up to this value.
pub const SCHEMA_VERSION: i32 = 1;

/// Core DDL statements, safe to replay on an already-initialised database.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    // ── tables ──────────────────────────────────────────────────────────
    "CREATE TABLE IF NOT EXISTS store_meta (
        key TEXT PRIMARY KEY,
        value TEXT
    );",
    "CREATE TABLE IF NOT EXISTS migration_history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        from_version INTEGER NOT NULL,
        to_version INTEGER NOT NULL,
        status TEXT NOT NULL,
        error_message TEXT,
        created_at TEXT DEFAULT CURRENT_TIMESTAMP
    );",
    "CREATE TABLE IF NOT EXISTS classes (
        name TEXT PRIMARY KEY,
        parent_class TEXT REFERENCES classes(name)
    );",
    "CREATE TABLE IF NOT EXISTS class_attributes (
        class_name TEXT NOT NULL REFERENCES classes(name),
        name TEXT NOT NULL,
        attribute_type TEXT NOT NULL,
        PRIMARY KEY(class_name, name)
    );",
    "CREATE TABLE IF NOT EXISTS containment (
        parent_class TEXT NOT NULL REFERENCES classes(name),
        child_class TEXT NOT NULL REFERENCES classes(name),
        PRIMARY KEY(parent_class, child_class)
    );",
    "CREATE TABLE IF NOT EXISTS objects (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        class_name TEXT NOT NULL REFERENCES classes(name),
        name TEXT NOT NULL,
        parent_id INTEGER REFERENCES objects(id)
    );",
    "CREATE TABLE IF NOT EXISTS object_attributes (
        object_id INTEGER NOT NULL REFERENCES objects(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        value TEXT NOT NULL,
        PRIMARY KEY(object_id, name)
    );",
    "CREATE TABLE IF NOT EXISTS catalog_entries (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        catalog_class TEXT NOT NULL,
        name TEXT NOT NULL,
        description TEXT,
        created_at TEXT DEFAULT CURRENT_TIMESTAMP
    );",
    // ── indexes ─────────────────────────────────────────────────────────
    "CREATE INDEX IF NOT EXISTS idx_objects_parent ON objects(parent_id);",
    "CREATE INDEX IF NOT EXISTS idx_catalog_class ON catalog_entries(catalog_class);",
    "CREATE INDEX IF NOT EXISTS idx_catalog_class_name ON catalog_entries(catalog_class, name);",
];

// ─── Migration framework ────────────────────────────────────────────────────

/// Create the base tables and run pending migrations.
pub fn initialize(conn: &Connection) -> SyncResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    for stmt in SCHEMA_STATEMENTS {
        conn.execute_batch(stmt)?;
    }
    migrate_schema(conn)
}

/// Run all pending migrations up to [`SCHEMA_VERSION`]. Each step is wrapped
/// in a SAVEPOINT so a failure rolls back only that step.
pub fn migrate_schema(conn: &Connection) -> SyncResult<()> {
    let mut current_version = get_schema_version(conn);
    if current_version > SCHEMA_VERSION {
        return Err(SyncError::Store(format!(
            "database schema version {} is newer than supported version {}",
            current_version, SCHEMA_VERSION
        )));
    }

    while current_version < SCHEMA_VERSION {
        let next_version = current_version + 1;
        conn.execute_batch("SAVEPOINT entsync_migrate_step;")?;

        // Version 1 is the baseline laid down by SCHEMA_STATEMENTS; later
        // versions add their step here before the version bump.
        let step_result = (|| -> SyncResult<()> {
            set_schema_version(conn, next_version)?;
            record_migration_step(conn, current_version, next_version, "success", None)?;
            conn.execute_batch("RELEASE SAVEPOINT entsync_migrate_step;")?;
            Ok(())
        })();

        match step_result {
            Ok(()) => {
                current_version = next_version;
            }
            Err(e) => {
                let _ = conn.execute_batch("ROLLBACK TO SAVEPOINT entsync_migrate_step;");
                let _ = conn.execute_batch("RELEASE SAVEPOINT entsync_migrate_step;");
                let _ = record_migration_step(
                    conn,
                    current_version,
                    next_version,
                    "failed",
                    Some(&e.to_string()),
                );
                return Err(e);
            }
        }
    }

    Ok(())
}

/// Read the current schema version from `store_meta`.
/// Returns 0 when the key is absent or unparseable.
pub fn get_schema_version(conn: &Connection) -> i32 {
    let result: Result<String, _> = conn.query_row(
        "SELECT value FROM store_meta WHERE key = 'schema_version';",
        [],
        |row| row.get(0),
    );
    match result {
        Ok(v) => v.parse::<i32>().unwrap_or(0),
        Err(_) => 0,
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> SyncResult<()> {
    conn.execute(
        "INSERT INTO store_meta(key, value) \
         VALUES('schema_version', ?1) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value;",
        rusqlite::params![version.to_string()],
    )?;
    Ok(())
}

fn record_migration_step(
    conn: &Connection,
    from_v: i32,
    to_v: i32,
    status: &str,
    error_msg: Option<&str>,
) -> SyncResult<()> {
    conn.execute(
        "INSERT INTO migration_history(from_version, to_version, status, error_message) \
         VALUES (?1, ?2, ?3, ?4);",
        rusqlite::params![from_v, to_v, status, error_msg],
    )?;
    Ok(())
}
