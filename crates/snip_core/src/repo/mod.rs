//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for notes and tags.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NoteNotFound`, `TagNotFound`)
//!   in addition to DB transport errors.
//! - Repositories borrow a connection; they never own or open one.

use crate::db::DbError;
use crate::model::note::NoteId;
use crate::model::tag::TagId;
use crate::search::fts::SearchError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod note_repo;
pub mod tag_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for note/tag persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    NoteNotFound(NoteId),
    TagNotFound(String),
    TagIdNotFound(TagId),
    Db(DbError),
    Search(SearchError),
    InvalidData(String),
}

impl RepoError {
    /// Returns whether this error means the addressed row does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NoteNotFound(_) | Self::TagNotFound(_) | Self::TagIdNotFound(_)
        )
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::TagNotFound(name) => write!(f, "tag not found: `{name}`"),
            Self::TagIdNotFound(id) => write!(f, "tag not found: {id}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Search(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Search(err) => Some(err),
            Self::NoteNotFound(_)
            | Self::TagNotFound(_)
            | Self::TagIdNotFound(_)
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<SearchError> for RepoError {
    fn from(value: SearchError) -> Self {
        Self::Search(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
