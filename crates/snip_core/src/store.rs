//! Store facade: one owned connection plus the per-user file layout.
//!
//! # Responsibility
//! - Be the single entry point front ends use for note, tag, export,
//!   import and backup operations.
//! - Group multi-statement writes into transactions.
//!
//! # Invariants
//! - A `Store` is created once by its caller and passed explicitly; there is
//!   no process-wide instance.
//! - `Store` is `Send` but not `Sync`; the compiler keeps it on one thread
//!   at a time.
//! - Update, patch and delete check existence first so a missing note is
//!   reported as not found.

use crate::config::StorePaths;
use crate::db::{open_db, open_db_in_memory};
use crate::error::{StoreError, StoreResult};
use crate::model::note::{NewNote, Note, NoteId, NotePatch, NoteUpdate, NoteWithTags};
use crate::model::tag::{Tag, TagId};
use crate::repo::note_repo::{NoteListQuery, NoteRepository, SqliteNoteRepository};
use crate::repo::tag_repo::{SqliteTagRepository, TagRepository};
use crate::transfer::backup::backup_database;
use crate::transfer::export::{self, bundle_file_name, ExportFormat, ExportReport};
use crate::transfer::import;
use crate::transfer::since::SinceFilter;
use chrono::Local;
use log::info;
use rusqlite::{Connection, TransactionBehavior};
use std::path::{Path, PathBuf};

/// Owned handle to one note database.
pub struct Store {
    conn: Connection,
    /// `None` for in-memory stores, which have no file to back up.
    paths: Option<StorePaths>,
}

impl Store {
    /// Creates the store root if needed and opens `paths.database`.
    pub fn open(paths: StorePaths) -> StoreResult<Self> {
        paths.ensure_root()?;
        let conn = open_db(&paths.database)?;
        Ok(Self {
            conn,
            paths: Some(paths),
        })
    }

    /// Opens a private in-memory store. Backups are unavailable.
    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self {
            conn: open_db_in_memory()?,
            paths: None,
        })
    }

    pub fn paths(&self) -> Option<&StorePaths> {
        self.paths.as_ref()
    }

    /// Borrow of the underlying connection for read-only diagnostics.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn notes(&self) -> StoreResult<SqliteNoteRepository<'_>> {
        Ok(SqliteNoteRepository::try_new(&self.conn)?)
    }

    pub fn tags(&self) -> SqliteTagRepository<'_> {
        SqliteTagRepository::new(&self.conn)
    }

    /// Schema version recorded in the open database file.
    pub fn schema_version(&self) -> StoreResult<u32> {
        Ok(self
            .conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))?)
    }

    pub fn note_count(&self) -> StoreResult<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM notes;", [], |row| row.get(0))?)
    }

    /// Creates a note and attaches its tags in one transaction.
    ///
    /// # Errors
    /// - `Validation` when the title is blank.
    pub fn create_note(&mut self, new_note: &NewNote) -> StoreResult<NoteWithTags> {
        if new_note.title.trim().is_empty() {
            return Err(StoreError::Validation("title is required".to_string()));
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let note_id = {
            let notes = SqliteNoteRepository::try_new(&tx)?;
            let tags = SqliteTagRepository::new(&tx);
            let note = notes.create(&new_note.title, &new_note.content)?;
            attach_tags(&notes, &tags, note.id, &new_note.tags)?;
            note.id
        };
        tx.commit()?;

        info!(
            "event=note_create module=store status=ok note_id={} tags={}",
            note_id,
            new_note.tags.len()
        );
        self.get_note(note_id)
    }

    pub fn get_note(&self, id: NoteId) -> StoreResult<NoteWithTags> {
        Ok(self.notes()?.get_by_id(id)?)
    }

    pub fn check_exists(&self, id: NoteId) -> StoreResult<()> {
        Ok(self.notes()?.check_exists(id)?)
    }

    pub fn list_notes(&self, query: &NoteListQuery) -> StoreResult<Vec<NoteWithTags>> {
        Ok(self.notes()?.list_all(query)?)
    }

    /// Lists notes carrying the tag called `tag_name`.
    ///
    /// An unknown tag name is reported as not found rather than an empty list.
    pub fn list_notes_tagged(
        &self,
        tag_name: &str,
        ascending: bool,
    ) -> StoreResult<Vec<NoteWithTags>> {
        let tag = self.tags().get_by_name(tag_name)?;
        self.list_notes(&NoteListQuery {
            ascending,
            tag: Some(tag.id),
        })
    }

    /// Replaces content, optionally the title, and refreshes `updated_at`.
    /// A blank title counts as "no change".
    pub fn update_note(&self, id: NoteId, update: &NoteUpdate) -> StoreResult<NoteWithTags> {
        let notes = self.notes()?;
        notes.check_exists(id)?;
        let title = update
            .title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or("");
        notes.update(id, &update.content, title)?;
        info!("event=note_update module=store status=ok note_id={id}");
        Ok(notes.get_by_id(id)?)
    }

    /// Applies a title and/or tag-set correction without touching
    /// `updated_at`. A blank title counts as "no change".
    pub fn patch_note(&mut self, id: NoteId, patch: &NotePatch) -> StoreResult<NoteWithTags> {
        self.check_exists(id)?;
        if patch.is_empty() {
            return self.get_note(id);
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        {
            let notes = SqliteNoteRepository::try_new(&tx)?;
            if let Some(title) = patch.title.as_deref().filter(|t| !t.trim().is_empty()) {
                notes.patch(id, title)?;
            }
            if let Some(names) = &patch.tags {
                notes.remove_all_tags_from_note(id)?;
                attach_tags(&notes, &SqliteTagRepository::new(&tx), id, names)?;
            }
        }
        tx.commit()?;

        info!("event=note_patch module=store status=ok note_id={id}");
        self.get_note(id)
    }

    pub fn delete_note(&self, id: NoteId) -> StoreResult<()> {
        let notes = self.notes()?;
        notes.check_exists(id)?;
        notes.delete(id)?;
        info!("event=note_delete module=store status=ok note_id={id}");
        Ok(())
    }

    /// Full-text search over titles and content (FTS5 `MATCH` syntax).
    pub fn search(&self, term: &str) -> StoreResult<Vec<Note>> {
        Ok(self.notes()?.search(term)?)
    }

    /// Most recently updated notes; `limit <= 0` returns all.
    pub fn recent(&self, limit: i64) -> StoreResult<Vec<NoteWithTags>> {
        Ok(self.notes()?.get_recent(limit)?)
    }

    /// Attaches the tag called `name`, creating it when missing.
    pub fn add_tag(&self, note_id: NoteId, name: &str) -> StoreResult<Tag> {
        let notes = self.notes()?;
        notes.check_exists(note_id)?;
        let tag = self.tags().get_or_create(name)?;
        notes.add_tag_to_note(note_id, tag.id)?;
        Ok(tag)
    }

    /// Replaces the whole tag set of a note in one transaction.
    pub fn replace_note_tags(
        &mut self,
        note_id: NoteId,
        names: &[String],
    ) -> StoreResult<Vec<Tag>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        {
            let notes = SqliteNoteRepository::try_new(&tx)?;
            notes.check_exists(note_id)?;
            notes.remove_all_tags_from_note(note_id)?;
            attach_tags(&notes, &SqliteTagRepository::new(&tx), note_id, names)?;
        }
        tx.commit()?;
        self.tags_for_note(note_id)
    }

    pub fn tags_for_note(&self, note_id: NoteId) -> StoreResult<Vec<Tag>> {
        let notes = self.notes()?;
        notes.check_exists(note_id)?;
        Ok(notes.tags_for_note(note_id)?)
    }

    pub fn all_tags(&self) -> StoreResult<Vec<Tag>> {
        Ok(self.tags().get_all()?)
    }

    pub fn get_or_create_tag(&self, name: &str) -> StoreResult<Tag> {
        Ok(self.tags().get_or_create(name)?)
    }

    pub fn delete_tag(&self, id: TagId) -> StoreResult<()> {
        Ok(self.tags().delete(id)?)
    }

    /// Writes one file per note into `dest_dir`.
    ///
    /// `format` and `since` are parsed before anything is written.
    pub fn export_notes(
        &self,
        dest_dir: &Path,
        since: Option<&str>,
        format: &str,
    ) -> StoreResult<ExportReport> {
        let format: ExportFormat = format.parse()?;
        let since = since.map(SinceFilter::parse).transpose()?;
        Ok(export::export_notes(
            &self.notes()?,
            dest_dir,
            since.as_ref(),
            format,
        )?)
    }

    /// Streams every matching note into
    /// `dest_dir/notes_export_{timestamp}.json`.
    pub fn export_bundle(&self, dest_dir: &Path, since: Option<&str>) -> StoreResult<ExportReport> {
        let since = since.map(SinceFilter::parse).transpose()?;
        let dest_file = dest_dir.join(bundle_file_name(Local::now()));
        Ok(export::export_bundle(
            &self.notes()?,
            &dest_file,
            since.as_ref(),
        )?)
    }

    /// Copies the database file into the `backups` directory.
    ///
    /// # Errors
    /// - `Validation` for in-memory stores.
    pub fn backup(&self) -> StoreResult<PathBuf> {
        let paths = self.paths.as_ref().ok_or_else(|| {
            StoreError::Validation("in-memory store has no database file to back up".to_string())
        })?;
        Ok(backup_database(&paths.database, &paths.backups)?)
    }

    /// Imports every `*.md` file in `dir` as a note. All or nothing.
    pub fn import_markdown_dir(&mut self, dir: &Path) -> StoreResult<Vec<NoteId>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let created = {
            let notes = SqliteNoteRepository::try_new(&tx)?;
            import::import_markdown_dir(&notes, dir)?
        };
        tx.commit()?;
        Ok(created)
    }

    /// Re-creates notes from JSON export files in `dir`. All or nothing.
    pub fn import_json_dir(&mut self, dir: &Path) -> StoreResult<Vec<NoteId>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let created = {
            let notes = SqliteNoteRepository::try_new(&tx)?;
            let tags = SqliteTagRepository::new(&tx);
            import::import_json_dir(&notes, &tags, dir)?
        };
        tx.commit()?;
        Ok(created)
    }
}

fn attach_tags<N: NoteRepository, T: TagRepository>(
    notes: &N,
    tags: &T,
    note_id: NoteId,
    names: &[String],
) -> StoreResult<()> {
    for name in names {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let tag = tags.get_or_create(name)?;
        notes.add_tag_to_note(note_id, tag.id)?;
    }
    Ok(())
}
