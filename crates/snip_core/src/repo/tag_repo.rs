//! Tag repository contract and SQLite implementation.
//!
//! # Invariants
//! - Tag names are unique (`idx_tags_name`); lookups are exact-match.
//! - `get_or_create` never produces two rows for one name.
//! - `get_all` is sorted by name.

use crate::model::tag::{Tag, TagId};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{Connection, OptionalExtension};

pub trait TagRepository {
    fn create(&self, name: &str) -> RepoResult<Tag>;
    fn get_by_name(&self, name: &str) -> RepoResult<Tag>;
    fn get_or_create(&self, name: &str) -> RepoResult<Tag>;
    fn get_all(&self) -> RepoResult<Vec<Tag>>;
    /// Deletes a tag; its note associations cascade.
    fn delete(&self, id: TagId) -> RepoResult<()>;
}

pub struct SqliteTagRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTagRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn find_by_name(&self, name: &str) -> RepoResult<Option<Tag>> {
        let tag = self
            .conn
            .query_row(
                "SELECT id, name FROM tags WHERE name = ?1;",
                [name],
                |row| {
                    Ok(Tag {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(tag)
    }
}

impl TagRepository for SqliteTagRepository<'_> {
    fn create(&self, name: &str) -> RepoResult<Tag> {
        self.conn
            .execute("INSERT INTO tags (name) VALUES (?1);", [name])?;
        Ok(Tag {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    fn get_by_name(&self, name: &str) -> RepoResult<Tag> {
        self.find_by_name(name)?
            .ok_or_else(|| RepoError::TagNotFound(name.to_string()))
    }

    fn get_or_create(&self, name: &str) -> RepoResult<Tag> {
        // The unique index turns a concurrent duplicate insert into a no-op.
        self.conn.execute(
            "INSERT INTO tags (name) VALUES (?1) ON CONFLICT(name) DO NOTHING;",
            [name],
        )?;
        self.get_by_name(name)
    }

    fn get_all(&self) -> RepoResult<Vec<Tag>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM tags ORDER BY name ASC;")?;
        let mut rows = stmt.query([])?;
        let mut tags = Vec::new();
        while let Some(row) = rows.next()? {
            tags.push(Tag {
                id: row.get(0)?,
                name: row.get(1)?,
            });
        }
        Ok(tags)
    }

    fn delete(&self, id: TagId) -> RepoResult<()> {
        let changed = self.conn.execute("DELETE FROM tags WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::TagIdNotFound(id));
        }
        Ok(())
    }
}
