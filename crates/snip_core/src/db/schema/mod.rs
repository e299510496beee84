//! Schema manager for the note store.
//!
//! # Responsibility
//! - Create tables, indexes, the FTS5 shadow table and its sync triggers.
//! - Backfill the shadow table for notes written before the triggers existed.
//!
//! # Invariants
//! - Every statement is `IF NOT EXISTS`, so re-running is a no-op.
//! - Both steps run in one transaction; a failure leaves the file untouched.
//! - `notes_fts.rowid` always equals `notes.id`.
//! - `notes_fts` is always FTS5; any other shape is rebuilt on open.

use crate::db::{DbError, DbResult};
use log::{debug, warn};
use rusqlite::{Connection, OptionalExtension};

/// Schema version written to `PRAGMA user_version`.
pub const SCHEMA_VERSION: u32 = 1;

const NOTES_SQL: &str = include_str!("notes.sql");
const SEARCH_SQL: &str = include_str!("search.sql");
const DROP_SEARCH_SQL: &str = "
    DROP TRIGGER IF EXISTS notes_fts_ai;
    DROP TRIGGER IF EXISTS notes_fts_au;
    DROP TRIGGER IF EXISTS notes_fts_ad;
    DROP TABLE IF EXISTS notes_fts;
";

/// Returns the schema version this build creates.
pub fn latest_version() -> u32 {
    SCHEMA_VERSION
}

/// Creates the relational schema: notes, tags, associations and indexes.
pub fn ensure_schema(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(NOTES_SQL)?;
    Ok(())
}

/// Creates the full-text shadow table, its triggers, and backfills it.
///
/// Requires [`ensure_schema`] to have run on the same connection.
///
/// A `notes_fts` table that is not FTS5 (the older fts4 layout keyed by an
/// `id` column) is dropped with its triggers and rebuilt from `notes`.
pub fn ensure_search_index(conn: &Connection) -> DbResult<()> {
    if let Some(sql) = search_table_sql(conn)? {
        if !sql.to_ascii_lowercase().contains("fts5") {
            warn!("event=search_index_rebuild module=db status=start reason=not_fts5");
            conn.execute_batch(DROP_SEARCH_SQL)?;
        }
    }
    conn.execute_batch(SEARCH_SQL)?;
    Ok(())
}

fn search_table_sql(conn: &Connection) -> DbResult<Option<String>> {
    let sql = conn
        .query_row(
            "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = 'notes_fts';",
            [],
            |row| row.get::<_, Option<String>>(0),
        )
        .optional()?;
    Ok(sql.flatten())
}

/// Brings the connection to the current schema in one transaction.
///
/// # Errors
/// - [`DbError::UnsupportedSchemaVersion`] when the file was written by a
///   newer schema.
/// - [`DbError::Sqlite`] when any DDL statement fails.
pub fn apply_schema(conn: &mut Connection) -> DbResult<()> {
    let current = current_user_version(conn)?;
    if current > SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current,
            latest_supported: SCHEMA_VERSION,
        });
    }

    let tx = conn.transaction()?;
    ensure_schema(&tx)?;
    ensure_search_index(&tx)?;
    if current != SCHEMA_VERSION {
        tx.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
    }
    tx.commit()?;

    debug!(
        "event=schema_apply module=db status=ok from_version={} to_version={}",
        current, SCHEMA_VERSION
    );
    Ok(())
}

fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::{apply_schema, ensure_schema, ensure_search_index, SCHEMA_VERSION};
    use rusqlite::Connection;

    fn trigger_count(conn: &Connection) -> i64 {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'trigger' AND tbl_name = 'notes';",
            [],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn ensure_steps_are_repeatable() {
        let conn = Connection::open_in_memory().unwrap();
        for _ in 0..3 {
            ensure_schema(&conn).unwrap();
            ensure_search_index(&conn).unwrap();
        }
        assert_eq!(trigger_count(&conn), 3);
    }

    #[test]
    fn apply_schema_sets_user_version() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_schema(&mut conn).unwrap();
        apply_schema(&mut conn).unwrap();
        let version: u32 = conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn backfill_does_not_duplicate_shadow_rows() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO notes (title, content) VALUES ('legacy', 'body one');
             INSERT INTO notes (title, content) VALUES ('legacy two', 'body two');",
        )
        .unwrap();

        ensure_search_index(&conn).unwrap();
        ensure_search_index(&conn).unwrap();

        let shadow_rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM notes_fts;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(shadow_rows, 2);
    }

    #[test]
    fn fts4_shadow_table_is_rebuilt_as_fts5() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE notes (id INTEGER PRIMARY KEY AUTOINCREMENT, title TEXT NOT NULL,
                 content TEXT NOT NULL, created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                 updated_at DATETIME DEFAULT CURRENT_TIMESTAMP);
             CREATE VIRTUAL TABLE notes_fts USING fts4(id, title, content);
             CREATE TRIGGER notes_fts_ai AFTER INSERT ON notes BEGIN
                 INSERT INTO notes_fts(id, title, content) VALUES (new.id, new.title, new.content);
             END;
             INSERT INTO notes (title, content) VALUES ('old', 'kept words');",
        )
        .unwrap();

        ensure_schema(&conn).unwrap();
        ensure_search_index(&conn).unwrap();

        let sql: String = conn
            .query_row(
                "SELECT sql FROM sqlite_master WHERE name = 'notes_fts';",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(sql.to_ascii_lowercase().contains("fts5"));
        assert_eq!(trigger_count(&conn), 3);

        let hit: i64 = conn
            .query_row(
                "SELECT rowid FROM notes_fts WHERE notes_fts MATCH 'kept'
                 ORDER BY bm25(notes_fts);",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(hit, 1);
    }
}
