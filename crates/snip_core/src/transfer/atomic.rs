//! Temp-file-then-rename writers.

use super::{TransferError, TransferResult};
use log::warn;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

const TEMP_SUFFIX: &str = ".tmp";
const STAGING_PREFIX: &str = ".snip-staging-";

/// `{dest}.tmp` next to the destination, so the final rename never crosses
/// file systems.
pub(crate) fn temp_sibling(dest: &Path) -> PathBuf {
    let mut name = OsString::from(dest.as_os_str());
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

/// Writes `dest` through `fill` on a temp sibling, then renames it in place.
///
/// The temp file is flushed and synced before the rename. On any error it is
/// removed and `dest` is left untouched.
pub(crate) fn write_atomically<F>(dest: &Path, fill: F) -> TransferResult<()>
where
    F: FnOnce(&mut BufWriter<File>) -> TransferResult<()>,
{
    let temp_path = temp_sibling(dest);
    let result = write_then_rename(&temp_path, dest, fill);
    if result.is_err() {
        discard(&temp_path);
    }
    result
}

fn write_then_rename<F>(temp_path: &Path, dest: &Path, fill: F) -> TransferResult<()>
where
    F: FnOnce(&mut BufWriter<File>) -> TransferResult<()>,
{
    let file =
        File::create(temp_path).map_err(|err| TransferError::io("create", temp_path, err))?;
    let mut writer = BufWriter::new(file);
    fill(&mut writer)?;
    writer
        .flush()
        .map_err(|err| TransferError::io("flush", temp_path, err))?;
    let file = writer
        .into_inner()
        .map_err(|err| TransferError::io("flush", temp_path, err.into_error()))?;
    file.sync_all()
        .map_err(|err| TransferError::io("sync", temp_path, err))?;
    drop(file);
    fs::rename(temp_path, dest).map_err(|err| TransferError::io("rename", dest, err))
}

fn discard(temp_path: &Path) {
    if let Err(err) = fs::remove_file(temp_path) {
        if err.kind() != std::io::ErrorKind::NotFound {
            warn!(
                "event=temp_cleanup module=transfer status=error path={} error={}",
                temp_path.display(),
                err
            );
        }
    }
}

/// Hidden directory inside an export destination that collects files until
/// the whole batch is written. Removed on drop.
pub(crate) struct StagingDir {
    path: PathBuf,
}

impl StagingDir {
    pub(crate) fn create(parent: &Path) -> TransferResult<Self> {
        let path = parent.join(format!("{STAGING_PREFIX}{}", Uuid::new_v4().simple()));
        fs::create_dir(&path).map_err(|err| TransferError::io("create", &path, err))?;
        Ok(Self { path })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Writes one staged file and syncs it.
    pub(crate) fn write(&self, file_name: &str, bytes: &[u8]) -> TransferResult<()> {
        let path = self.path.join(file_name);
        let mut file = File::create(&path).map_err(|err| TransferError::io("create", &path, err))?;
        file.write_all(bytes)
            .map_err(|err| TransferError::io("write", &path, err))?;
        file.sync_all()
            .map_err(|err| TransferError::io("sync", &path, err))
    }

    /// Moves staged files into `dest_dir`, in order, returning final paths.
    pub(crate) fn publish(
        &self,
        file_names: &[String],
        dest_dir: &Path,
    ) -> TransferResult<Vec<PathBuf>> {
        let mut published = Vec::with_capacity(file_names.len());
        for name in file_names {
            let target = dest_dir.join(name);
            fs::rename(self.path.join(name), &target)
                .map_err(|err| TransferError::io("rename", &target, err))?;
            published.push(target);
        }
        Ok(published)
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_dir_all(&self.path) {
            warn!(
                "event=staging_cleanup module=transfer status=error path={} error={}",
                self.path.display(),
                err
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{temp_sibling, write_atomically, StagingDir};
    use crate::transfer::TransferError;
    use std::io::Write;

    #[test]
    fn temp_sibling_appends_suffix() {
        let temp = temp_sibling(std::path::Path::new("/x/notes_1.db"));
        assert_eq!(temp, std::path::Path::new("/x/notes_1.db.tmp"));
    }

    #[test]
    fn successful_write_leaves_only_destination() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.json");

        write_atomically(&dest, |writer| {
            writer.write_all(b"[]").unwrap();
            Ok(())
        })
        .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"[]");
        assert!(!temp_sibling(&dest).exists());
    }

    #[test]
    fn failed_write_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.json");

        let err = write_atomically(&dest, |writer| {
            writer.write_all(b"[partial").unwrap();
            Err(TransferError::Integrity("simulated".to_string()))
        })
        .unwrap_err();

        assert!(matches!(err, TransferError::Integrity(_)));
        assert!(!dest.exists());
        assert!(!temp_sibling(&dest).exists());
    }

    #[test]
    fn failed_write_keeps_previous_destination_intact() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.json");
        std::fs::write(&dest, b"old").unwrap();

        write_atomically(&dest, |_| Err(TransferError::Integrity("simulated".to_string())))
            .unwrap_err();

        assert_eq!(std::fs::read(&dest).unwrap(), b"old");
    }

    #[test]
    fn staging_dir_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let staged_path = {
            let staging = StagingDir::create(dir.path()).unwrap();
            staging.write("a.md", b"# a").unwrap();
            staging.path().to_path_buf()
        };
        assert!(!staged_path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
