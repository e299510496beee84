//! Core library for snip, a local note store.
//! This crate owns the schema, the note/tag rules and every file artifact
//! (exports, backups); front ends only call into [`Store`].

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod store;
pub mod transfer;

pub use config::{ConfigError, StorePaths, HOME_ENV_VAR};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use error::{ErrorKind, StoreError, StoreResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::note::{NewNote, Note, NoteId, NotePatch, NoteUpdate, NoteWithTags};
pub use model::tag::{parse_tag_list, Tag, TagId};
pub use repo::note_repo::{NoteListQuery, NoteRepository, SqliteNoteRepository};
pub use repo::tag_repo::{SqliteTagRepository, TagRepository};
pub use repo::{RepoError, RepoResult};
pub use search::fts::{search_notes, SearchError, SearchQuery, SearchResult};
pub use store::Store;
pub use transfer::export::{ExportFormat, ExportReport};
pub use transfer::since::SinceFilter;
pub use transfer::{TransferError, TransferResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
