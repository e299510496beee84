//! Moving note data in and out of the live database.
//!
//! # Responsibility
//! - Export notes to per-note JSON/Markdown files or one JSON bundle.
//! - Import Markdown directories and JSON export records.
//! - Copy the database file into timestamped backups.
//!
//! # Invariants
//! - Artifacts are written to a temporary name and renamed into place only
//!   after a full, synced write. A failed run leaves nothing under a final
//!   name.
//! - Transfer code never writes next to the database file.

use crate::error::ErrorKind;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};

mod atomic;
pub mod backup;
pub mod export;
pub mod import;
pub mod since;

pub type TransferResult<T> = Result<T, TransferError>;

#[derive(Debug)]
pub enum TransferError {
    /// Caller-supplied value rejected (format name, since-filter, record).
    Validation(String),
    /// A required input file or directory does not exist.
    MissingSource(PathBuf),
    Io {
        action: &'static str,
        path: PathBuf,
        source: io::Error,
    },
    /// A write finished but produced something other than what was asked.
    Integrity(String),
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    Repo(RepoError),
}

impl TransferError {
    pub(crate) fn io(action: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::MissingSource(_) => ErrorKind::NotFound,
            Self::Io { .. } => ErrorKind::Io,
            Self::Integrity(_) => ErrorKind::Integrity,
            // A record that does not decode is caller input, not disk failure.
            Self::Json { .. } => ErrorKind::Validation,
            Self::Repo(err) => ErrorKind::of_repo(err),
        }
    }
}

impl Display for TransferError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(message) => write!(f, "{message}"),
            Self::MissingSource(path) => write!(f, "not found: `{}`", path.display()),
            Self::Io {
                action,
                path,
                source,
            } => write!(f, "failed to {action} `{}`: {source}", path.display()),
            Self::Integrity(message) => write!(f, "integrity check failed: {message}"),
            Self::Json { path, source } => {
                write!(f, "invalid JSON in `{}`: {source}", path.display())
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::Repo(err) => Some(err),
            Self::Validation(_) | Self::MissingSource(_) | Self::Integrity(_) => None,
        }
    }
}

impl From<RepoError> for TransferError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}
