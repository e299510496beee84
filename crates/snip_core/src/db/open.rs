//! Connection bootstrap for the note database.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON` and a busy timeout, so a
//!   second process holding the write lock causes a wait, not an error.
//! - Returned connections have the schema and search triggers in place.

use super::schema::apply_schema;
use super::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

enum Target {
    File(PathBuf),
    Memory,
}

impl Display for Target {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(_) => f.write_str("file"),
            Self::Memory => f.write_str("memory"),
        }
    }
}

/// Opens (creating if missing) the database file at `path` and applies the
/// schema. The parent directory must already exist.
///
/// # Side effects
/// - Emits `db_open` start/ok/error events with the elapsed time.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    bootstrap(Target::File(path.as_ref().to_path_buf()))
}

/// Opens a private in-memory database with the schema applied.
pub fn open_db_in_memory() -> DbResult<Connection> {
    bootstrap(Target::Memory)
}

fn bootstrap(target: Target) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={target}");

    let result = connect(&target).and_then(|mut conn| {
        configure(&mut conn)?;
        Ok(conn)
    });
    match &result {
        Ok(_) => info!(
            "event=db_open module=db status=ok mode={} duration_ms={}",
            target,
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=db_open module=db status=error mode={} duration_ms={} error={}",
            target,
            started_at.elapsed().as_millis(),
            err
        ),
    }
    result
}

fn connect(target: &Target) -> DbResult<Connection> {
    match target {
        Target::File(path) => Connection::open(path).map_err(|source| DbError::Open {
            path: path.clone(),
            source,
        }),
        Target::Memory => Ok(Connection::open_in_memory()?),
    }
}

fn configure(conn: &mut Connection) -> DbResult<()> {
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    apply_schema(conn)
}

#[cfg(test)]
mod tests {
    use super::open_db;
    use crate::db::DbError;

    #[test]
    fn missing_parent_directory_reports_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent").join("notes.db");

        match open_db(&path) {
            Err(DbError::Open { path: reported, .. }) => assert_eq!(reported, path),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("opened a database under a missing directory"),
        }
    }

    #[test]
    fn foreign_keys_are_on_after_open() {
        let conn = super::open_db_in_memory().unwrap();
        let enabled: bool = conn
            .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
            .unwrap();
        assert!(enabled);
    }
}
