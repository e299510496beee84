//! Per-user storage locations.
//!
//! # Responsibility
//! - Resolve where the database, backups, exports and logs live.
//!
//! # Invariants
//! - Backups and exports never share a directory with the database file.
//! - Resolution never touches the file system; `ensure_root` does.

use std::env::consts::OS;
use std::env::var_os;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Overrides the storage root when set.
pub const HOME_ENV_VAR: &str = "SNIP_HOME";

const ROOT_DIR_NAME: &str = ".snip";
const DATABASE_FILE_NAME: &str = "notes.db";
const BACKUP_DIR_NAME: &str = "backups";
const EXPORT_DIR_NAME: &str = "export";
const LOG_DIR_NAME: &str = "logs";

#[derive(Debug)]
pub enum ConfigError {
    /// Neither `SNIP_HOME` nor a home directory variable is set.
    HomeUnresolved,
    CreateDir { path: PathBuf, source: std::io::Error },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HomeUnresolved => write!(
                f,
                "cannot resolve home directory; set `{HOME_ENV_VAR}` explicitly"
            ),
            Self::CreateDir { path, source } => {
                write!(f, "failed to create directory `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::HomeUnresolved => None,
            Self::CreateDir { source, .. } => Some(source),
        }
    }
}

/// File-system layout of one note store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    pub root: PathBuf,
    pub database: PathBuf,
    pub backups: PathBuf,
    pub exports: PathBuf,
    pub logs: PathBuf,
}

impl StorePaths {
    /// Lays out a store below an explicit root directory.
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            database: root.join(DATABASE_FILE_NAME),
            backups: root.join(BACKUP_DIR_NAME),
            exports: root.join(EXPORT_DIR_NAME),
            logs: root.join(LOG_DIR_NAME),
            root,
        }
    }

    /// Resolves the per-user layout: `$SNIP_HOME`, else `~/.snip`.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Some(root) = var_os(HOME_ENV_VAR).filter(|value| !value.is_empty()) {
            return Ok(Self::under(PathBuf::from(root)));
        }

        let home_var = if OS == "windows" { "USERPROFILE" } else { "HOME" };
        let home = var_os(home_var)
            .filter(|value| !value.is_empty())
            .ok_or(ConfigError::HomeUnresolved)?;
        Ok(Self::under(PathBuf::from(home).join(ROOT_DIR_NAME)))
    }

    /// Creates the root directory so the database file can be opened.
    pub fn ensure_root(&self) -> Result<(), ConfigError> {
        ensure_dir(&self.root)
    }
}

pub(crate) fn ensure_dir(path: &Path) -> Result<(), ConfigError> {
    std::fs::create_dir_all(path).map_err(|source| ConfigError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::StorePaths;
    use std::path::Path;

    #[test]
    fn layout_keeps_artifacts_apart_from_database() {
        let paths = StorePaths::under("/data/snip");
        assert_eq!(paths.database, Path::new("/data/snip/notes.db"));
        assert_eq!(paths.backups, Path::new("/data/snip/backups"));
        assert_eq!(paths.exports, Path::new("/data/snip/export"));
        assert_ne!(paths.backups.parent(), Some(paths.database.as_path()));
    }

    #[test]
    fn ensure_root_creates_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let paths = StorePaths::under(dir.path().join("a").join("b"));
        paths.ensure_root().unwrap();
        assert!(paths.root.is_dir());
    }
}
