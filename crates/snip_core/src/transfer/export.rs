//! Note export to JSON and Markdown.
//!
//! # Responsibility
//! - Write one `{id}_{sanitized-title}.{ext}` file per note.
//! - Write every note into one JSON array bundle.
//!
//! # Invariants
//! - Per-note files are staged in a hidden directory inside the destination
//!   and published only after every note was rendered and synced.
//! - The bundle is written to `{dest}.tmp` and renamed on success only.
//! - Notes are exported in `id` order.

use super::atomic::{write_atomically, StagingDir};
use super::since::SinceFilter;
use super::{TransferError, TransferResult};
use crate::model::note::NoteWithTags;
use crate::repo::note_repo::NoteRepository;
use chrono::{DateTime, Local, Utc};
use log::info;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

const MAX_TITLE_CHARS: usize = 50;
const MARKDOWN_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const UNSAFE_FILENAME_CHARS: [char; 10] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|', ' '];

/// Per-note export file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Markdown,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "md",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "markdown" | "md" => Ok(Self::Markdown),
            _ => Err(TransferError::Validation(format!(
                "invalid format: `{s}`; expected json or markdown"
            ))),
        }
    }
}

impl Display for ExportFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::Markdown => f.write_str("markdown"),
        }
    }
}

/// Files produced by one export run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub written: Vec<PathBuf>,
    /// Number of notes exported.
    pub notes: usize,
}

/// Exports each matching note into its own file inside `dest_dir`.
///
/// `since` is resolved against the clock when the call starts.
///
/// # Errors
/// - `Io` when the destination cannot be created or written.
/// - `Json` / `Repo` when a note cannot be rendered or read.
///
/// On error no file from this run is visible in `dest_dir`, unless the
/// failure happened while moving already-rendered files into place.
pub fn export_notes<R: NoteRepository>(
    repo: &R,
    dest_dir: &Path,
    since: Option<&SinceFilter>,
    format: ExportFormat,
) -> TransferResult<ExportReport> {
    let started_at = Instant::now();
    let bound = since.map(SinceFilter::resolve);
    fs::create_dir_all(dest_dir).map_err(|err| TransferError::io("create", dest_dir, err))?;

    let staging = StagingDir::create(dest_dir)?;
    let mut staged: Vec<String> = Vec::new();
    let notes = repo.for_each_created_since(bound, |note: NoteWithTags| {
        let file_name = export_file_name(&note, format);
        let bytes = match format {
            ExportFormat::Json => render_json(&note, &staging.path().join(&file_name))?,
            ExportFormat::Markdown => render_markdown(&note).into_bytes(),
        };
        staging.write(&file_name, &bytes)?;
        staged.push(file_name);
        Ok::<(), TransferError>(())
    })?;
    let written = staging.publish(&staged, dest_dir)?;

    info!(
        "event=export_notes module=transfer status=ok format={} notes={} since={} duration_ms={}",
        format,
        notes,
        bound.map_or_else(|| "-".to_string(), |value| value.to_rfc3339()),
        started_at.elapsed().as_millis()
    );
    Ok(ExportReport { written, notes })
}

/// Streams every matching note into one pretty-printed JSON array at
/// `dest_file`.
pub fn export_bundle<R: NoteRepository>(
    repo: &R,
    dest_file: &Path,
    since: Option<&SinceFilter>,
) -> TransferResult<ExportReport> {
    let started_at = Instant::now();
    let bound = since.map(SinceFilter::resolve);
    if let Some(parent) = dest_file.parent() {
        fs::create_dir_all(parent).map_err(|err| TransferError::io("create", parent, err))?;
    }

    let mut notes = 0;
    write_atomically(dest_file, |writer| {
        let write_err = |err: std::io::Error| TransferError::io("write", dest_file, err);
        writer.write_all(b"[").map_err(write_err)?;
        let mut first = true;
        notes = repo.for_each_created_since(bound, |note: NoteWithTags| {
            let separator: &[u8] = if first { b"\n" } else { b",\n" };
            first = false;
            writer.write_all(separator).map_err(write_err)?;
            serde_json::to_writer_pretty(&mut *writer, &note).map_err(|source| {
                TransferError::Json {
                    path: dest_file.to_path_buf(),
                    source,
                }
            })
        })?;
        writer.write_all(b"\n]\n").map_err(write_err)?;
        Ok(())
    })?;

    info!(
        "event=export_bundle module=transfer status=ok notes={} duration_ms={}",
        notes,
        started_at.elapsed().as_millis()
    );
    Ok(ExportReport {
        written: vec![dest_file.to_path_buf()],
        notes,
    })
}

/// `notes_export_{YYYY-MM-DD_HH-MM-SS}.json`, local time.
pub fn bundle_file_name(at: DateTime<Local>) -> String {
    format!("notes_export_{}.json", at.format("%Y-%m-%d_%H-%M-%S"))
}

/// `{id}_{sanitized-title}.{ext}`.
pub fn export_file_name(note: &NoteWithTags, format: ExportFormat) -> String {
    format!(
        "{}_{}.{}",
        note.id,
        sanitize_filename(&note.title),
        format.extension()
    )
}

/// Replaces path-hostile characters and spaces with `_` and keeps the first
/// 50 characters.
pub fn sanitize_filename(title: &str) -> String {
    let replaced: String = title
        .chars()
        .map(|ch| if UNSAFE_FILENAME_CHARS.contains(&ch) { '_' } else { ch })
        .take(MAX_TITLE_CHARS)
        .collect();
    replaced.trim().to_string()
}

/// Markdown record: heading, content, optional tags, timestamps, separator.
pub fn render_markdown(note: &NoteWithTags) -> String {
    let mut out = format!("# {}\n\n{}\n\n", note.title, note.content);
    if !note.tags.is_empty() {
        out.push_str(&format!("**Tags:** {}\n", note.tags.join(", ")));
    }
    out.push_str(&format!("**Created:** {}\n", format_local(note.created_at)));
    out.push_str(&format!("**Updated:** {}\n", format_local(note.updated_at)));
    out.push_str("\n---\n\n");
    out
}

fn render_json(note: &NoteWithTags, path: &Path) -> TransferResult<Vec<u8>> {
    serde_json::to_vec_pretty(note).map_err(|source| TransferError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn format_local(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local)
        .format(MARKDOWN_TIMESTAMP_FORMAT)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::{export_file_name, render_markdown, sanitize_filename, ExportFormat};
    use crate::model::note::NoteWithTags;
    use chrono::{TimeZone, Utc};

    fn sample(title: &str, tags: &[&str]) -> NoteWithTags {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();
        NoteWithTags {
            id: 7,
            title: title.to_string(),
            content: "milk, eggs".to_string(),
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn sanitize_replaces_reserved_characters_and_spaces() {
        assert_eq!(
            sanitize_filename(r#"a/b\c:d*e?f"g<h>i|j k"#),
            "a_b_c_d_e_f_g_h_i_j_k"
        );
    }

    #[test]
    fn sanitize_truncates_to_fifty_characters() {
        let long = "é".repeat(80);
        assert_eq!(sanitize_filename(&long).chars().count(), 50);
    }

    #[test]
    fn file_name_uses_id_title_and_extension() {
        let note = sample("Weekly plan", &[]);
        assert_eq!(export_file_name(&note, ExportFormat::Markdown), "7_Weekly_plan.md");
        assert_eq!(export_file_name(&note, ExportFormat::Json), "7_Weekly_plan.json");
    }

    #[test]
    fn format_names_parse_case_insensitively() {
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("markdown".parse::<ExportFormat>().unwrap(), ExportFormat::Markdown);
        assert!("json@#$".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn markdown_includes_tags_line_only_when_tagged() {
        let tagged = render_markdown(&sample("Groceries", &["food", "home"]));
        assert!(tagged.starts_with("# Groceries\n\nmilk, eggs\n\n**Tags:** food, home\n"));
        assert!(tagged.contains("**Created:** "));
        assert!(tagged.ends_with("\n---\n\n"));

        let untagged = render_markdown(&sample("Groceries", &[]));
        assert!(!untagged.contains("**Tags:**"));
        assert!(untagged.starts_with("# Groceries\n\nmilk, eggs\n\n**Created:** "));
    }
}
