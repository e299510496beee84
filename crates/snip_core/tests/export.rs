use chrono::{Duration, Utc};
use rusqlite::params;
use snip_core::{ErrorKind, NewNote, NoteWithTags, Store};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

fn seeded_store() -> Store {
    let mut store = Store::open_in_memory().unwrap();
    store
        .create_note(&NewNote::new("Groceries", "milk, eggs").with_tags(["home", "food"]))
        .unwrap();
    store
        .create_note(&NewNote::new("Weekly plan: Q3?", "ship it"))
        .unwrap();
    store
}

fn file_names(dir: &Path) -> BTreeSet<String> {
    fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

fn set_created_at(store: &Store, id: i64, at: chrono::DateTime<Utc>) {
    store
        .connection()
        .execute(
            "UPDATE notes SET created_at = ?1, updated_at = ?1 WHERE id = ?2;",
            params![at, id],
        )
        .unwrap();
}

#[test]
fn json_export_writes_one_pretty_file_per_note() {
    let store = seeded_store();
    let dir = tempfile::tempdir().unwrap();

    let report = store.export_notes(dir.path(), None, "json").unwrap();

    assert_eq!(report.notes, 2);
    assert_eq!(
        file_names(dir.path()),
        BTreeSet::from([
            "1_Groceries.json".to_string(),
            "2_Weekly_plan__Q3_.json".to_string(),
        ])
    );
    let raw = fs::read_to_string(dir.path().join("1_Groceries.json")).unwrap();
    assert!(raw.contains("\n  \"title\": \"Groceries\""));
    let record: NoteWithTags = serde_json::from_str(&raw).unwrap();
    assert_eq!(record.tags, vec!["food", "home"]);
    assert_eq!(record, store.get_note(1).unwrap());

    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    for key in ["id", "title", "content", "tags", "created_at", "updated_at"] {
        assert!(value.get(key).is_some(), "missing `{key}`");
    }
}

#[test]
fn json_export_round_trips_through_import() {
    let source = seeded_store();
    let dir = tempfile::tempdir().unwrap();
    source.export_notes(dir.path(), None, "json").unwrap();

    let mut target = Store::open_in_memory().unwrap();
    let created = target.import_json_dir(dir.path()).unwrap();
    assert_eq!(created.len(), 2);

    for (original, id) in source.recent(0).unwrap().iter().rev().zip(created) {
        let imported = target.get_note(id).unwrap();
        assert_eq!(imported.title, original.title);
        assert_eq!(imported.content, original.content);
        assert_eq!(imported.tags, original.tags);
    }
}

#[test]
fn markdown_export_renders_heading_tags_and_separator() {
    let store = seeded_store();
    let dir = tempfile::tempdir().unwrap();

    let report = store.export_notes(dir.path(), None, "markdown").unwrap();

    let expected: Vec<PathBuf> = vec![
        dir.path().join("1_Groceries.md"),
        dir.path().join("2_Weekly_plan__Q3_.md"),
    ];
    assert_eq!(report.written, expected);
    let body = fs::read_to_string(&expected[0]).unwrap();
    assert!(body.starts_with("# Groceries\n\nmilk, eggs\n\n**Tags:** food, home\n**Created:** "));
    assert!(body.contains("\n**Updated:** "));
    assert!(body.ends_with("\n---\n\n"));
    let untagged = fs::read_to_string(&expected[1]).unwrap();
    assert!(!untagged.contains("**Tags:**"));
}

#[test]
fn relative_since_filter_uses_creation_time() {
    let store = seeded_store();
    set_created_at(&store, 1, Utc::now() - Duration::days(10));
    let dir = tempfile::tempdir().unwrap();

    let report = store.export_notes(dir.path(), Some("7d"), "json").unwrap();

    assert_eq!(report.notes, 1);
    assert_eq!(
        file_names(dir.path()),
        BTreeSet::from(["2_Weekly_plan__Q3_.json".to_string()])
    );
}

#[test]
fn absolute_since_filter_starts_at_midnight() {
    let store = seeded_store();
    let before = "2023-12-31T23:59:59Z".parse().unwrap();
    let at_midnight = "2024-01-01T00:00:00Z".parse().unwrap();
    set_created_at(&store, 1, before);
    set_created_at(&store, 2, at_midnight);
    let dir = tempfile::tempdir().unwrap();

    let report = store
        .export_notes(dir.path(), Some("2024-01-01"), "markdown")
        .unwrap();

    assert_eq!(report.written, vec![dir.path().join("2_Weekly_plan__Q3_.md")]);
}

#[test]
fn invalid_format_or_filter_fails_before_writing() {
    let store = seeded_store();
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out");

    let err = store.export_notes(&dest, None, "json@#$").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().contains("invalid format"));

    let err = store.export_notes(&dest, Some("7x"), "json").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(!dest.exists());
}

#[test]
fn export_leaves_no_staging_directory_behind() {
    let store = seeded_store();
    let dir = tempfile::tempdir().unwrap();

    store.export_notes(dir.path(), None, "md").unwrap();

    assert!(file_names(dir.path())
        .iter()
        .all(|name| !name.starts_with('.')));
}

#[test]
fn bundle_export_is_one_json_array() {
    let store = seeded_store();
    let dir = tempfile::tempdir().unwrap();

    let report = store.export_bundle(dir.path(), None).unwrap();

    assert_eq!(report.notes, 2);
    assert_eq!(report.written.len(), 1);
    let name = report.written[0].file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("notes_export_") && name.ends_with(".json"));
    let records: Vec<NoteWithTags> =
        serde_json::from_str(&fs::read_to_string(&report.written[0]).unwrap()).unwrap();
    let titles: Vec<_> = records.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Groceries", "Weekly plan: Q3?"]);
    assert_eq!(file_names(dir.path()).len(), 1);
}

#[test]
fn empty_bundle_is_valid_json() {
    let store = Store::open_in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();

    let report = store.export_bundle(dir.path(), None).unwrap();

    let records: Vec<NoteWithTags> =
        serde_json::from_str(&fs::read_to_string(&report.written[0]).unwrap()).unwrap();
    assert!(records.is_empty());
}

#[test]
fn bundle_reimports_as_new_notes() {
    let source = seeded_store();
    let dir = tempfile::tempdir().unwrap();
    source.export_bundle(dir.path(), None).unwrap();

    let mut target = Store::open_in_memory().unwrap();
    target
        .create_note(&NewNote::new("Existing", "first"))
        .unwrap();
    let created = target.import_json_dir(dir.path()).unwrap();

    assert_eq!(created, vec![2, 3]);
    assert_eq!(target.get_note(2).unwrap().tags, vec!["food", "home"]);
}

#[test]
fn markdown_directory_import_uses_file_stem_as_title() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("b-second.md"), "second body").unwrap();
    fs::write(dir.path().join("a-first.md"), "first body").unwrap();
    fs::write(dir.path().join("ignored.txt"), "nope").unwrap();
    fs::create_dir(dir.path().join("nested.md")).unwrap();

    let mut store = Store::open_in_memory().unwrap();
    let created = store.import_markdown_dir(dir.path()).unwrap();

    assert_eq!(created.len(), 2);
    let first = store.get_note(created[0]).unwrap();
    assert_eq!(first.title, "a-first");
    assert_eq!(first.content, "first body");
    assert_eq!(store.get_note(created[1]).unwrap().title, "b-second");
}

#[test]
fn importing_missing_directory_is_not_found() {
    let mut store = Store::open_in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();

    let err = store
        .import_markdown_dir(&dir.path().join("absent"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
