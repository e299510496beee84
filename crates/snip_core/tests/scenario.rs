use snip_core::{ErrorKind, NewNote, NotePatch, NoteUpdate, Store, StorePaths};

#[test]
fn groceries_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = Store::open(StorePaths::under(dir.path())).unwrap();

    let note = store
        .create_note(&NewNote::new("Groceries", "milk, eggs"))
        .unwrap();
    store.add_tag(note.id, "home").unwrap();

    let tagged = store.list_notes_tagged("home", false).unwrap();
    assert_eq!(tagged.len(), 1);
    assert_eq!(tagged[0].id, note.id);
    assert_eq!(tagged[0].tags, vec!["home"]);

    let hits = store.search("milk").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, note.id);

    store.delete_note(note.id).unwrap();

    assert_eq!(store.get_note(note.id).unwrap_err().kind(), ErrorKind::NotFound);
    assert!(store.search("milk").unwrap().is_empty());
    assert!(store.list_notes_tagged("home", false).unwrap().is_empty());
}

#[test]
fn edits_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let paths = StorePaths::under(dir.path());
    let id = {
        let mut store = Store::open(paths.clone()).unwrap();
        let note = store
            .create_note(&NewNote::new("Reading list", "dune").with_tags(["books"]))
            .unwrap();
        store
            .update_note(
                note.id,
                &NoteUpdate {
                    content: "dune, hyperion".to_string(),
                    title: None,
                },
            )
            .unwrap();
        store
            .patch_note(
                note.id,
                &NotePatch {
                    title: Some("Books 2025".to_string()),
                    tags: None,
                },
            )
            .unwrap();
        note.id
    };

    let store = Store::open(paths).unwrap();
    let note = store.get_note(id).unwrap();
    assert_eq!(note.title, "Books 2025");
    assert_eq!(note.content, "dune, hyperion");
    assert_eq!(note.tags, vec!["books"]);
    assert_eq!(store.search("hyperion").unwrap().len(), 1);
    assert_eq!(store.note_count().unwrap(), 1);
    assert_eq!(store.schema_version().unwrap(), snip_core::db::schema::SCHEMA_VERSION);
}

#[test]
fn patching_missing_note_is_not_found() {
    let mut store = Store::open_in_memory().unwrap();
    let err = store
        .patch_note(
            9,
            &NotePatch {
                title: Some("x".to_string()),
                tags: None,
            },
        )
        .unwrap_err();
    assert!(err.is_not_found());
}
