//! Note repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide note CRUD, listing, recency and full-text queries.
//! - Own the `notes_tags` association writes.
//!
//! # Invariants
//! - `create` stamps `created_at == updated_at`.
//! - `update` always refreshes `updated_at` and never moves it below
//!   `created_at`; `patch` never touches it.
//! - Tag names on read models are sorted by name.
//! - The FTS shadow table is maintained by schema triggers, never here.

use crate::model::note::{Note, NoteId, NoteWithTags};
use crate::model::tag::{Tag, TagId};
use crate::repo::{RepoError, RepoResult};
use crate::search::fts::{search_notes, SearchQuery};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const NOTE_SELECT_SQL: &str = "SELECT
    id,
    title,
    content,
    created_at,
    updated_at
FROM notes";

/// Query options for listing notes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoteListQuery {
    /// Oldest first when `true`; newest first otherwise.
    pub ascending: bool,
    /// Restrict to notes associated with this tag.
    pub tag: Option<TagId>,
}

/// Repository interface for note operations.
pub trait NoteRepository {
    /// Inserts a note stamped with the current time and returns it.
    fn create(&self, title: &str, content: &str) -> RepoResult<Note>;
    /// Gets one note with its tag names.
    fn get_by_id(&self, id: NoteId) -> RepoResult<NoteWithTags>;
    /// Existence check that does not load content.
    fn check_exists(&self, id: NoteId) -> RepoResult<()>;
    /// Lists notes by `created_at`, optionally restricted to one tag.
    fn list_all(&self, query: &NoteListQuery) -> RepoResult<Vec<NoteWithTags>>;
    /// Replaces content and refreshes `updated_at`. An empty `title` keeps
    /// the current title.
    fn update(&self, id: NoteId, content: &str, title: &str) -> RepoResult<()>;
    /// Replaces the title only.
    fn patch(&self, id: NoteId, title: &str) -> RepoResult<()>;
    /// Deletes a note; associations and the search entry cascade.
    fn delete(&self, id: NoteId) -> RepoResult<()>;
    /// Full-text query using FTS5 `MATCH` syntax.
    fn search(&self, term: &str) -> RepoResult<Vec<Note>>;
    /// Most recently updated notes first. `limit <= 0` returns all.
    fn get_recent(&self, limit: i64) -> RepoResult<Vec<NoteWithTags>>;
    /// Associates a tag with a note. Repeating the call is a no-op.
    fn add_tag_to_note(&self, note_id: NoteId, tag_id: TagId) -> RepoResult<()>;
    /// Clears every association of a note.
    fn remove_all_tags_from_note(&self, note_id: NoteId) -> RepoResult<()>;
    /// Returns the tags of one note sorted by name.
    fn tags_for_note(&self, note_id: NoteId) -> RepoResult<Vec<Tag>>;
    /// Visits notes in `id` order, optionally only those created at or after
    /// `since`, without collecting them first. Returns the visited count.
    fn for_each_created_since<E, F>(
        &self,
        since: Option<DateTime<Utc>>,
        visit: F,
    ) -> Result<usize, E>
    where
        E: From<RepoError>,
        F: FnMut(NoteWithTags) -> Result<(), E>;
}

/// SQLite-backed note repository.
pub struct SqliteNoteRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNoteRepository<'conn> {
    /// Constructs a repository from a connection with the schema applied.
    ///
    /// # Errors
    /// - `RepoError::InvalidData` when a required table is missing.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_note_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl NoteRepository for SqliteNoteRepository<'_> {
    fn create(&self, title: &str, content: &str) -> RepoResult<Note> {
        let now = Utc::now();
        self.conn.execute(
            "INSERT INTO notes (title, content, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3);",
            params![title, content, now],
        )?;

        Ok(Note {
            id: self.conn.last_insert_rowid(),
            title: title.to_string(),
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    fn get_by_id(&self, id: NoteId) -> RepoResult<NoteWithTags> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NOTE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => self.with_tags(parse_note_row(row)?),
            None => Err(RepoError::NoteNotFound(id)),
        }
    }

    fn check_exists(&self, id: NoteId) -> RepoResult<()> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM notes WHERE id = ?1);",
            [id],
            |row| row.get(0),
        )?;
        if exists == 1 {
            Ok(())
        } else {
            Err(RepoError::NoteNotFound(id))
        }
    }

    fn list_all(&self, query: &NoteListQuery) -> RepoResult<Vec<NoteWithTags>> {
        let mut sql = format!("{NOTE_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(tag_id) = query.tag {
            sql.push_str(
                " AND EXISTS (
                    SELECT 1
                    FROM notes_tags nt
                    WHERE nt.note_id = notes.id
                      AND nt.tag_id = ?
                )",
            );
            bind_values.push(Value::Integer(tag_id));
        }

        if query.ascending {
            sql.push_str(" ORDER BY created_at ASC, id ASC");
        } else {
            sql.push_str(" ORDER BY created_at DESC, id DESC");
        }

        self.collect_with_tags(&sql, bind_values)
    }

    fn update(&self, id: NoteId, content: &str, title: &str) -> RepoResult<()> {
        let now = Utc::now();
        // MAX keeps updated_at >= created_at even if the clock stepped back.
        let changed = if title.is_empty() {
            self.conn.execute(
                "UPDATE notes
                 SET content = ?1, updated_at = MAX(?2, created_at)
                 WHERE id = ?3;",
                params![content, now, id],
            )?
        } else {
            self.conn.execute(
                "UPDATE notes
                 SET content = ?1, updated_at = MAX(?2, created_at), title = ?3
                 WHERE id = ?4;",
                params![content, now, title, id],
            )?
        };

        if changed == 0 {
            return Err(RepoError::NoteNotFound(id));
        }
        Ok(())
    }

    fn patch(&self, id: NoteId, title: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE notes SET title = ?1 WHERE id = ?2;",
            params![title, id],
        )?;
        if changed == 0 {
            return Err(RepoError::NoteNotFound(id));
        }
        Ok(())
    }

    fn delete(&self, id: NoteId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM notes WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NoteNotFound(id));
        }
        Ok(())
    }

    fn search(&self, term: &str) -> RepoResult<Vec<Note>> {
        Ok(search_notes(self.conn, &SearchQuery::raw(term))?)
    }

    fn get_recent(&self, limit: i64) -> RepoResult<Vec<NoteWithTags>> {
        let effective = if limit <= 0 { -1 } else { limit };
        self.collect_with_tags(
            &format!("{NOTE_SELECT_SQL} ORDER BY updated_at DESC, id DESC LIMIT ?"),
            vec![Value::Integer(effective)],
        )
    }

    fn add_tag_to_note(&self, note_id: NoteId, tag_id: TagId) -> RepoResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO notes_tags (note_id, tag_id) VALUES (?1, ?2);",
            params![note_id, tag_id],
        )?;
        Ok(())
    }

    fn remove_all_tags_from_note(&self, note_id: NoteId) -> RepoResult<()> {
        self.conn
            .execute("DELETE FROM notes_tags WHERE note_id = ?1;", [note_id])?;
        Ok(())
    }

    fn tags_for_note(&self, note_id: NoteId) -> RepoResult<Vec<Tag>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.id, t.name
             FROM tags t
             INNER JOIN notes_tags nt ON nt.tag_id = t.id
             WHERE nt.note_id = ?1
             ORDER BY t.name ASC;",
        )?;
        let mut rows = stmt.query([note_id])?;
        let mut tags = Vec::new();
        while let Some(row) = rows.next()? {
            tags.push(Tag {
                id: row.get(0)?,
                name: row.get(1)?,
            });
        }
        Ok(tags)
    }

    fn for_each_created_since<E, F>(
        &self,
        since: Option<DateTime<Utc>>,
        mut visit: F,
    ) -> Result<usize, E>
    where
        E: From<RepoError>,
        F: FnMut(NoteWithTags) -> Result<(), E>,
    {
        let mut sql = format!("{NOTE_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();
        if let Some(since) = since {
            sql.push_str(" AND created_at >= ?");
            bind_values.push(Value::Text(since_bound(since)));
        }
        sql.push_str(" ORDER BY id ASC");

        let mut stmt = self.conn.prepare(&sql).map_err(RepoError::from)?;
        let mut rows = stmt
            .query(params_from_iter(bind_values))
            .map_err(RepoError::from)?;
        let mut visited = 0;
        while let Some(row) = rows.next().map_err(RepoError::from)? {
            let note = parse_note_row(row)?;
            visit(self.with_tags(note)?)?;
            visited += 1;
        }
        Ok(visited)
    }
}

impl SqliteNoteRepository<'_> {
    fn with_tags(&self, note: Note) -> RepoResult<NoteWithTags> {
        let tags = load_tag_names(self.conn, note.id)?;
        Ok(NoteWithTags {
            id: note.id,
            title: note.title,
            content: note.content,
            tags,
            created_at: note.created_at,
            updated_at: note.updated_at,
        })
    }

    fn collect_with_tags(
        &self,
        sql: &str,
        bind_values: Vec<Value>,
    ) -> RepoResult<Vec<NoteWithTags>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            let note = parse_note_row(row)?;
            notes.push(self.with_tags(note)?);
        }
        Ok(notes)
    }
}

/// Formats a lower bound the same way rusqlite stores `DateTime<Utc>`, so
/// the text comparison in SQL matches chronological order.
fn since_bound(since: DateTime<Utc>) -> String {
    since.format("%F %T%.f%:z").to_string()
}

fn parse_note_row(row: &Row<'_>) -> RepoResult<Note> {
    let note = Note {
        id: row.get("id")?,
        title: row.get("title")?,
        content: row.get("content")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    if note.updated_at < note.created_at {
        return Err(RepoError::InvalidData(format!(
            "note {} has updated_at earlier than created_at",
            note.id
        )));
    }
    Ok(note)
}

fn load_tag_names(conn: &Connection, note_id: NoteId) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT t.name
         FROM notes_tags nt
         INNER JOIN tags t ON t.id = nt.tag_id
         WHERE nt.note_id = ?1
         ORDER BY t.name ASC;",
    )?;
    let mut rows = stmt.query([note_id])?;
    let mut names = Vec::new();
    while let Some(row) = rows.next()? {
        names.push(row.get(0)?);
    }
    Ok(names)
}

fn ensure_note_connection_ready(conn: &Connection) -> RepoResult<()> {
    for table in ["notes", "tags", "notes_tags", "notes_fts"] {
        if !table_exists(conn, table)? {
            return Err(RepoError::InvalidData(format!(
                "required table `{table}` is missing; open the database through `open_db`"
            )));
        }
    }
    Ok(())
}

pub(crate) fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
