//! Crate-level error facade.
//!
//! Every layer keeps its own error enum; [`StoreError`] wraps them for
//! callers of [`crate::store::Store`] and [`ErrorKind`] classifies them so a
//! front end can pick an exit code or message style without matching on
//! every variant.

use crate::config::ConfigError;
use crate::db::DbError;
use crate::repo::RepoError;
use crate::search::fts::SearchError;
use crate::transfer::TransferError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Coarse failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The addressed note, tag or file does not exist.
    NotFound,
    /// Caller input was rejected before any write.
    Validation,
    /// Storage or file-system failure.
    Io,
    /// Persisted data or a copied artifact failed a consistency check.
    Integrity,
}

impl ErrorKind {
    pub(crate) fn of_repo(err: &RepoError) -> Self {
        match err {
            err if err.is_not_found() => Self::NotFound,
            RepoError::Search(SearchError::InvalidQuery { .. }) => Self::Validation,
            RepoError::InvalidData(_) => Self::Integrity,
            _ => Self::Io,
        }
    }

    fn of_db(err: &DbError) -> Self {
        match err {
            DbError::UnsupportedSchemaVersion { .. } => Self::Integrity,
            DbError::Open { .. } | DbError::Sqlite(_) => Self::Io,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    Config(ConfigError),
    Db(DbError),
    Repo(RepoError),
    Transfer(TransferError),
    /// Caller input rejected at the facade (empty title, bad tag list).
    Validation(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Io,
            Self::Db(err) => ErrorKind::of_db(err),
            Self::Repo(err) => ErrorKind::of_repo(err),
            Self::Transfer(err) => err.kind(),
            Self::Validation(_) => ErrorKind::Validation,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Transfer(err) => write!(f, "{err}"),
            Self::Validation(message) => write!(f, "{message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Transfer(err) => Some(err),
            Self::Validation(_) => None,
        }
    }
}

impl From<ConfigError> for StoreError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<TransferError> for StoreError {
    fn from(value: TransferError) -> Self {
        Self::Transfer(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
