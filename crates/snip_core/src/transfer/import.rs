//! Note import from Markdown files and JSON export records.
//!
//! Imported notes always get fresh ids and timestamps; only title, content
//! and tags are carried over.

use super::{TransferError, TransferResult};
use crate::model::note::NoteId;
use crate::repo::note_repo::NoteRepository;
use crate::repo::tag_repo::TagRepository;
use log::info;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// The parts of a JSON export record that survive re-import.
#[derive(Debug, Clone, Deserialize)]
struct ImportRecord {
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    tags: Vec<String>,
}

/// A per-note export file holds one record, a bundle holds an array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ImportPayload {
    One(ImportRecord),
    Many(Vec<ImportRecord>),
}

/// Creates one note per `*.md` file directly inside `dir`.
///
/// The file stem becomes the title and the file body the content. Entries
/// are processed in file-name order; subdirectories are skipped.
pub fn import_markdown_dir<N: NoteRepository>(
    notes: &N,
    dir: &Path,
) -> TransferResult<Vec<NoteId>> {
    let mut created = Vec::new();
    for path in files_with_extension(dir, "md")? {
        let Some(title) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        let content =
            fs::read_to_string(&path).map_err(|err| TransferError::io("read", &path, err))?;
        created.push(notes.create(title, &content)?.id);
    }

    info!(
        "event=import_markdown module=transfer status=ok notes={}",
        created.len()
    );
    Ok(created)
}

/// Re-creates the notes in one JSON export file (single record or bundle).
pub fn import_json_file<N: NoteRepository, T: TagRepository>(
    notes: &N,
    tags: &T,
    path: &Path,
) -> TransferResult<Vec<NoteId>> {
    let raw = fs::read(path).map_err(|err| TransferError::io("read", path, err))?;
    let records = match serde_json::from_slice::<ImportPayload>(&raw).map_err(|source| {
        TransferError::Json {
            path: path.to_path_buf(),
            source,
        }
    })? {
        ImportPayload::One(record) => vec![record],
        ImportPayload::Many(records) => records,
    };

    let mut created = Vec::with_capacity(records.len());
    for record in records {
        if record.title.trim().is_empty() {
            return Err(TransferError::Validation(format!(
                "record in `{}` has an empty title",
                path.display()
            )));
        }
        let note = notes.create(&record.title, &record.content)?;
        for name in &record.tags {
            let tag = tags.get_or_create(name)?;
            notes.add_tag_to_note(note.id, tag.id)?;
        }
        created.push(note.id);
    }
    Ok(created)
}

/// Imports every `*.json` file directly inside `dir`, in file-name order.
pub fn import_json_dir<N: NoteRepository, T: TagRepository>(
    notes: &N,
    tags: &T,
    dir: &Path,
) -> TransferResult<Vec<NoteId>> {
    let mut created = Vec::new();
    for path in files_with_extension(dir, "json")? {
        created.extend(import_json_file(notes, tags, &path)?);
    }

    info!(
        "event=import_json module=transfer status=ok notes={}",
        created.len()
    );
    Ok(created)
}

fn files_with_extension(dir: &Path, extension: &str) -> TransferResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(TransferError::MissingSource(dir.to_path_buf()));
    }

    let entries = fs::read_dir(dir).map_err(|err| TransferError::io("read directory", dir, err))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| TransferError::io("read directory", dir, err))?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == extension) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
