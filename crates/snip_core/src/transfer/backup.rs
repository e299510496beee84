//! Byte-exact database backups.
//!
//! # Invariants
//! - A file named `notes_{YYYY-MM-DD_HH-MM-SS}.db` is always a complete copy:
//!   the bytes go to `{name}.tmp`, are length-checked and synced, and only
//!   then renamed.
//! - The copy includes the FTS table and triggers, so a backup is a drop-in
//!   replacement for the live file.

use super::atomic::write_atomically;
use super::{TransferError, TransferResult};
use chrono::{DateTime, Local};
use log::{error, info};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// `notes_{YYYY-MM-DD_HH-MM-SS}.db`, local time, second granularity.
pub fn backup_file_name(at: DateTime<Local>) -> String {
    format!("notes_{}.db", at.format("%Y-%m-%d_%H-%M-%S"))
}

/// Copies `database` into `backup_dir` under a name stamped with the
/// current local time and returns the final path.
pub fn backup_database(database: &Path, backup_dir: &Path) -> TransferResult<PathBuf> {
    backup_database_at(database, backup_dir, Local::now())
}

/// Like [`backup_database`] with an explicit timestamp for the file name.
///
/// # Errors
/// - `MissingSource` when `database` does not exist.
/// - `Io` when the directory, temp file or rename fails.
/// - `Integrity` when the copied length differs from the source length.
pub fn backup_database_at(
    database: &Path,
    backup_dir: &Path,
    at: DateTime<Local>,
) -> TransferResult<PathBuf> {
    let started_at = Instant::now();
    if !database.is_file() {
        return Err(TransferError::MissingSource(database.to_path_buf()));
    }
    fs::create_dir_all(backup_dir).map_err(|err| TransferError::io("create", backup_dir, err))?;

    let dest = backup_dir.join(backup_file_name(at));
    let result = write_atomically(&dest, |writer| {
        let mut source =
            File::open(database).map_err(|err| TransferError::io("open", database, err))?;
        let expected = source
            .metadata()
            .map_err(|err| TransferError::io("stat", database, err))?
            .len();
        copy_exact(&mut source, writer, expected, database)
    });

    match result {
        Ok(()) => {
            info!(
                "event=backup module=transfer status=ok duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(dest)
        }
        Err(err) => {
            error!(
                "event=backup module=transfer status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

/// Copies all of `source` into `sink` and checks that exactly `expected`
/// bytes went through.
fn copy_exact<R: Read, W: Write>(
    source: &mut R,
    sink: &mut W,
    expected: u64,
    source_path: &Path,
) -> TransferResult<()> {
    let copied = io::copy(source, sink).map_err(|err| TransferError::io("copy", source_path, err))?;
    if copied != expected {
        return Err(TransferError::Integrity(format!(
            "copied {copied} bytes from `{}`, expected {expected}",
            source_path.display()
        )));
    }
    Ok(())
}
