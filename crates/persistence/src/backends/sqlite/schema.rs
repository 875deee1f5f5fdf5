//! SQLite schema definitions and migrations.

use rusqlite::Connection;

use crate::error::{BackendError, StorageError, StorageResult};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 3;

fn migration_error(context: &str, e: rusqlite::Error) -> StorageError {
    StorageError::Backend(BackendError::MigrationError {
        message: format!("{context}: {e}"),
    })
}

/// Initialize the database schema.
pub fn initialize_schema(conn: &Connection) -> StorageResult<()> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        create_schema_v1(conn)?;
        set_schema_version(conn, 1)?;
        migrate_schema(conn, 1)?;
    } else if current_version < SCHEMA_VERSION {
        migrate_schema(conn, current_version)?;
    }

    Ok(())
}

/// Get the current schema version.
fn get_schema_version(conn: &Connection) -> StorageResult<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL
        )",
        [],
    )
    .map_err(|e| migration_error("Failed to create schema_version table", e))?;

    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .ok();

    Ok(version.unwrap_or(0))
}

/// Set the schema version.
fn set_schema_version(conn: &Connection, version: i32) -> StorageResult<()> {
    conn.execute("DELETE FROM schema_version", [])
        .map_err(|e| migration_error("Failed to clear schema_version", e))?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])
        .map_err(|e| migration_error("Failed to set schema_version", e))?;
    Ok(())
}

/// Base tables: identifiers and records.
fn create_schema_v1(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS pids (
            pid_type TEXT NOT NULL,
            pid_value TEXT NOT NULL,
            status TEXT NOT NULL,
            object_type TEXT,
            object_uuid TEXT,
            redirect_type TEXT,
            redirect_value TEXT,
            created TEXT NOT NULL,
            updated TEXT NOT NULL,
            PRIMARY KEY (pid_type, pid_value)
        );

        CREATE INDEX IF NOT EXISTS idx_pids_object ON pids(object_uuid);

        CREATE TABLE IF NOT EXISTS records (
            id TEXT PRIMARY KEY,
            index_name TEXT NOT NULL,
            revision INTEGER NOT NULL,
            payload TEXT NOT NULL,
            created TEXT NOT NULL,
            updated TEXT NOT NULL,
            is_deleted INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_records_index ON records(index_name, is_deleted);",
    )
    .map_err(|e| migration_error("Failed to create base tables", e))
}

fn migrate_schema(conn: &Connection, from_version: i32) -> StorageResult<()> {
    for version in (from_version + 1)..=SCHEMA_VERSION {
        match version {
            2 => migrate_v1_to_v2(conn)?,
            3 => migrate_v2_to_v3(conn)?,
            _ => {}
        }
        set_schema_version(conn, version)?;
        tracing::debug!(version, "Applied schema migration");
    }
    Ok(())
}

/// v2: named sequences for minters.
fn migrate_v1_to_v2(conn: &Connection) -> StorageResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS sequences (
            name TEXT PRIMARY KEY,
            value INTEGER NOT NULL
        )",
        [],
    )
    .map_err(|e| migration_error("Failed to create sequences table", e))?;
    Ok(())
}

/// v3: revision history of every record write.
fn migrate_v2_to_v3(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS record_revisions (
            id TEXT NOT NULL,
            index_name TEXT NOT NULL,
            revision INTEGER NOT NULL,
            payload TEXT NOT NULL,
            created TEXT NOT NULL,
            updated TEXT NOT NULL,
            is_deleted INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (id, revision)
        );

        INSERT OR IGNORE INTO record_revisions
            (id, index_name, revision, payload, created, updated, is_deleted)
        SELECT id, index_name, revision, payload, created, updated, is_deleted FROM records;",
    )
    .map_err(|e| migration_error("Failed to create record_revisions table", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect()
    }

    #[test]
    fn test_schema_initialization() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        let tables = table_names(&conn);
        assert!(tables.contains(&"pids".to_string()));
        assert!(tables.contains(&"records".to_string()));
        assert!(tables.contains(&"sequences".to_string()));
        assert!(tables.contains(&"record_revisions".to_string()));
        assert!(tables.contains(&"schema_version".to_string()));
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        initialize_schema(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_migration_from_v1() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema_v1(&conn).unwrap();
        let _ = get_schema_version(&conn).unwrap();
        set_schema_version(&conn, 1).unwrap();
        assert!(!table_names(&conn).contains(&"sequences".to_string()));

        initialize_schema(&conn).unwrap();
        assert!(table_names(&conn).contains(&"sequences".to_string()));
        assert!(table_names(&conn).contains(&"record_revisions".to_string()));
    }

    #[test]
    fn test_migration_backfills_revisions() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema_v1(&conn).unwrap();
        let _ = get_schema_version(&conn).unwrap();
        set_schema_version(&conn, 1).unwrap();
        conn.execute(
            "INSERT INTO records (id, index_name, revision, payload, created, updated, is_deleted)
             VALUES ('a', 'records', 4, '{}', '2015-10-21T07:28:00Z', '2015-10-21T07:28:00Z', 0)",
            [],
        )
        .unwrap();

        initialize_schema(&conn).unwrap();

        let revision: i64 = conn
            .query_row("SELECT revision FROM record_revisions WHERE id = 'a'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(revision, 4);
    }
}
