//! Note records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned note identity (`notes.id`).
pub type NoteId = i64;

/// One persisted note without its tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Note joined with the names of its associated tags.
///
/// This is also the JSON export record shape:
/// `{id, title, content, tags, created_at, updated_at}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteWithTags {
    pub id: NoteId,
    pub title: String,
    pub content: String,
    /// Tag names sorted alphabetically.
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NoteWithTags {
    /// Drops the tag list.
    pub fn into_note(self) -> Note {
        Note {
            id: self.id,
            title: self.title,
            content: self.content,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Input for creating a note through the store facade.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    /// Tag names; each is resolved with get-or-create semantics.
    pub tags: Vec<String>,
}

impl NewNote {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            tags: Vec::new(),
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Content edit. Always replaces content and refreshes `updated_at`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteUpdate {
    pub content: String,
    /// `None` keeps the current title.
    pub title: Option<String>,
}

/// Metadata correction. Does not touch `updated_at`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotePatch {
    /// `None` keeps the current title.
    pub title: Option<String>,
    /// `None` keeps the current tags; `Some` replaces the whole set.
    pub tags: Option<Vec<String>>,
}

impl NotePatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.tags.is_none()
    }
}
