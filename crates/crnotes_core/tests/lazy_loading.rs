use crnotes_core::{IdAllocator, InMemoryStore, NoteDirectory, SharedStore};
use std::sync::Arc;

const USER: &str = "user@example.com";
const NOTE: &str = "Building a house";
const TEXT: &str = "This is really easy.";

/// Seeds one user with one note and returns the store plus the note id.
fn seeded() -> (Arc<InMemoryStore>, String) {
    let store = Arc::new(InMemoryStore::new());
    let shared: SharedStore = store.clone();
    let mut directory = NoteDirectory::open(IdAllocator::new(shared)).unwrap();
    let note = directory.get_user(USER).unwrap().add_note(NOTE).unwrap();
    note.set_text(TEXT).unwrap();
    let note_id = note.id().to_string();
    (store, note_id)
}

fn fresh_directory(store: &Arc<InMemoryStore>) -> NoteDirectory {
    let shared: SharedStore = store.clone();
    NoteDirectory::open(IdAllocator::new(shared)).unwrap()
}

#[test]
fn opening_loads_the_user_list() {
    let (store, _note_id) = seeded();
    let directory = fresh_directory(&store);
    assert_eq!(directory.users().len(), 1);
}

#[test]
fn opening_does_not_load_individual_users() {
    let (store, _note_id) = seeded();
    let directory = fresh_directory(&store);
    assert!(!directory.user(USER).unwrap().is_loaded());
}

#[test]
fn accessing_notes_loads_the_user() {
    let (store, _note_id) = seeded();
    let mut directory = fresh_directory(&store);
    let user = directory.get_user(USER).unwrap();
    assert!(!user.notes().unwrap().is_empty());
    assert!(user.is_loaded());
}

#[test]
fn loading_a_user_does_not_load_its_notes() {
    let (store, note_id) = seeded();
    let mut directory = fresh_directory(&store);
    let user = directory.get_user(USER).unwrap();
    assert!(!user.notes().unwrap()[&note_id].is_loaded());
}

#[test]
fn accessing_text_loads_the_note() {
    let (store, note_id) = seeded();
    let mut directory = fresh_directory(&store);
    let note = directory
        .get_user(USER)
        .unwrap()
        .note_mut(&note_id)
        .unwrap();
    assert_eq!(note.text().unwrap(), TEXT);
    assert!(note.is_loaded());
}

#[test]
fn repeated_reads_cost_no_extra_round_trips() {
    let (store, note_id) = seeded();
    let mut directory = fresh_directory(&store);
    let after_open = store.read_count();

    let user = directory.get_user(USER).unwrap();
    user.notes().unwrap();
    let after_user_load = store.read_count();
    assert!(after_user_load > after_open);

    user.notes().unwrap();
    user.name().unwrap();
    assert_eq!(store.read_count(), after_user_load);

    let note = user.note_mut(&note_id).unwrap();
    note.text().unwrap();
    let after_note_load = store.read_count();
    note.text().unwrap();
    note.name().unwrap();
    assert_eq!(store.read_count(), after_note_load);
}
