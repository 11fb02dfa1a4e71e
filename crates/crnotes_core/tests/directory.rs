use crnotes_core::{
    CoreError, EntityKind, IdAllocator, InMemoryStore, KeyValueStore, NoteDirectory,
    SharedStore,
};
use std::sync::Arc;

const TESTUSER: &str = "user@example.com";

fn fixture() -> (Arc<InMemoryStore>, NoteDirectory) {
    let store = Arc::new(InMemoryStore::new());
    let shared: SharedStore = store.clone();
    let directory = NoteDirectory::open(IdAllocator::new(shared)).unwrap();
    (store, directory)
}

#[test]
fn empty_store_has_no_users() {
    let (store, directory) = fixture();
    assert!(directory.users().is_empty());
    assert_eq!(store.key_count().unwrap(), 0);
}

#[test]
fn add_user_records_name_counter_and_index() {
    let (store, mut directory) = fixture();
    assert_eq!(directory.add_user(TESTUSER).unwrap(), TESTUSER);
    assert_eq!(directory.users().len(), 1);

    let user = directory.get_user(TESTUSER).unwrap();
    assert_eq!(user.name().unwrap(), TESTUSER);
    assert!(user.notes().unwrap().is_empty());
    assert_eq!(store.key_count().unwrap(), 3);
    assert_eq!(
        store.hash_get("users", TESTUSER).unwrap().as_deref(),
        Some("user_1")
    );
}

#[test]
fn unsafe_usernames_are_rejected() {
    let (store, mut directory) = fixture();
    let too_long = ".".repeat(256);
    for username in ["", "/user@example.com", "\0user@example.com", too_long.as_str()] {
        assert!(matches!(
            directory.add_user(username).unwrap_err(),
            CoreError::InvalidName { .. }
        ));
    }
    assert!(directory.users().is_empty());
    assert_eq!(store.key_count().unwrap(), 0);
}

#[test]
fn get_user_is_an_upsert() {
    let (store, mut directory) = fixture();
    let first_id = directory.get_user(TESTUSER).unwrap().id().to_string();
    assert_eq!(store.key_count().unwrap(), 3);

    let second_id = directory.get_user(TESTUSER).unwrap().id().to_string();
    assert_eq!(first_id, second_id);
    assert_eq!(directory.users().len(), 1);
    assert_eq!(directory.ids().last_id(EntityKind::User).unwrap(), 1);
    assert_eq!(store.key_count().unwrap(), 3);
}

#[test]
fn add_user_refuses_existing_username() {
    let (_store, mut directory) = fixture();
    directory.add_user(TESTUSER).unwrap();
    assert!(matches!(
        directory.add_user(TESTUSER).unwrap_err(),
        CoreError::AlreadyExists { .. }
    ));
    assert_eq!(directory.ids().last_id(EntityKind::User).unwrap(), 1);
}

#[test]
fn delete_user_leaves_only_the_counter() {
    let (store, mut directory) = fixture();
    directory.add_user(TESTUSER).unwrap();

    assert_eq!(directory.delete_user(TESTUSER).unwrap(), TESTUSER);
    assert!(directory.users().is_empty());
    assert_eq!(store.keys().unwrap(), vec!["user_lastid".to_string()]);
}

#[test]
fn delete_unknown_user_is_not_found() {
    let (_store, mut directory) = fixture();
    assert!(matches!(
        directory.delete_user("nobody@example.com").unwrap_err(),
        CoreError::NotFound {
            kind: EntityKind::User,
            ..
        }
    ));
}

#[test]
fn deleting_a_user_removes_exactly_its_keys() {
    let (store, mut directory) = fixture();
    let keeper = directory.get_user("keeper@example.com").unwrap();
    keeper.add_note("kept").unwrap();

    let leaver = directory.get_user("leaver@example.com").unwrap();
    for name in ["a", "b", "c", "d"] {
        leaver.add_note(name).unwrap();
    }
    let before = store.key_count().unwrap();

    directory.delete_user("leaver@example.com").unwrap();
    // 4 notes * 2 fields + user name + note-id set; the index survives
    assert_eq!(store.key_count().unwrap(), before - 10);
    assert!(directory.contains_user("keeper@example.com"));
    assert_eq!(
        directory
            .get_user("keeper@example.com")
            .unwrap()
            .notes()
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn delete_clears_everything_but_counters() {
    let (store, mut directory) = fixture();
    for username in ["a@example.com", "b@example.com"] {
        let user = directory.get_user(username).unwrap();
        user.add_note("note").unwrap();
    }

    directory.delete().unwrap();
    assert!(directory.users().is_empty());
    assert_eq!(
        store.keys().unwrap(),
        vec!["note_lastid".to_string(), "user_lastid".to_string()]
    );
}

#[test]
fn reopening_restores_users_from_the_index() {
    let store = Arc::new(InMemoryStore::new());
    let shared: SharedStore = store.clone();
    {
        let mut directory = NoteDirectory::open(IdAllocator::new(shared.clone())).unwrap();
        directory
            .get_user("a@example.com")
            .unwrap()
            .add_note("Shopping")
            .unwrap()
            .set_text("milk, eggs")
            .unwrap();
        directory.get_user("b@example.com").unwrap();
    }

    let mut directory = NoteDirectory::open(IdAllocator::new(shared)).unwrap();
    let usernames: Vec<&String> = directory.users().keys().collect();
    assert_eq!(usernames, vec!["a@example.com", "b@example.com"]);

    let user = directory.get_user("a@example.com").unwrap();
    let views = user.views().unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].text, "milk, eggs");
}

fn reopen(store: &Arc<InMemoryStore>) -> NoteDirectory {
    let shared: SharedStore = store.clone();
    NoteDirectory::open(IdAllocator::new(shared)).unwrap()
}

#[test]
fn delete_user_succeeds_when_name_key_is_gone() {
    let (store, mut directory) = fixture();
    directory
        .get_user(TESTUSER)
        .unwrap()
        .add_note("left behind")
        .unwrap();
    store.delete("user_1_name").unwrap();

    let mut directory = reopen(&store);
    assert_eq!(directory.delete_user(TESTUSER).unwrap(), TESTUSER);
    assert!(directory.users().is_empty());
    assert_eq!(
        store.keys().unwrap(),
        vec!["note_lastid".to_string(), "user_lastid".to_string()]
    );
}

#[test]
fn delete_tolerates_a_user_without_name_key() {
    let (store, mut directory) = fixture();
    directory.get_user("a@example.com").unwrap();
    directory.get_user("b@example.com").unwrap();
    store.delete("user_2_name").unwrap();

    let mut directory = reopen(&store);
    directory.delete().unwrap();
    assert!(directory.users().is_empty());
    assert_eq!(store.keys().unwrap(), vec!["user_lastid".to_string()]);
}

#[test]
fn failed_delete_can_be_retried() {
    let (store, mut directory) = fixture();
    for username in ["a@example.com", "b@example.com"] {
        directory
            .get_user(username)
            .unwrap()
            .add_note("note")
            .unwrap();
    }
    store.delete("user_2_notes").unwrap();
    store.set("user_2_notes", "not a set").unwrap();

    let mut directory = reopen(&store);
    assert!(matches!(directory.delete().unwrap_err(), CoreError::Store(_)));
    // the first user is fully gone, the second is untouched
    let usernames: Vec<&String> = directory.users().keys().collect();
    assert_eq!(usernames, vec!["b@example.com"]);
    assert_eq!(store.hash_get("users", "a@example.com").unwrap(), None);
    assert_eq!(store.get("user_1_name").unwrap(), None);

    store.delete("user_2_notes").unwrap();
    store.set_add("user_2_notes", "note_2").unwrap();
    directory.delete().unwrap();
    assert!(directory.users().is_empty());
    assert_eq!(
        store.keys().unwrap(),
        vec!["note_lastid".to_string(), "user_lastid".to_string()]
    );
}

#[test]
fn rename_user_moves_the_index_entry() {
    let (store, mut directory) = fixture();
    directory
        .get_user(TESTUSER)
        .unwrap()
        .add_note("kept")
        .unwrap();

    assert_eq!(
        directory.rename_user(TESTUSER, "renamed@example.com").unwrap(),
        "renamed@example.com"
    );
    assert!(!directory.contains_user(TESTUSER));
    assert_eq!(store.hash_get("users", TESTUSER).unwrap(), None);
    assert_eq!(
        store.hash_get("users", "renamed@example.com").unwrap().as_deref(),
        Some("user_1")
    );
    assert_eq!(
        store.get("user_1_name").unwrap().as_deref(),
        Some("renamed@example.com")
    );

    let mut directory = reopen(&store);
    let user = directory.get_user("renamed@example.com").unwrap();
    assert_eq!(user.id(), "user_1");
    assert_eq!(user.name().unwrap(), "renamed@example.com");
    assert_eq!(user.notes().unwrap().len(), 1);
    assert_eq!(directory.ids().last_id(EntityKind::User).unwrap(), 1);
}

#[test]
fn rename_user_rejects_taken_unknown_and_unsafe_names() {
    let (store, mut directory) = fixture();
    directory.add_user("a@example.com").unwrap();
    directory.add_user("b@example.com").unwrap();
    let before = store.keys().unwrap();

    assert!(matches!(
        directory.rename_user("a@example.com", "b@example.com").unwrap_err(),
        CoreError::AlreadyExists { .. }
    ));
    assert!(matches!(
        directory.rename_user("nobody@example.com", "c@example.com").unwrap_err(),
        CoreError::NotFound {
            kind: EntityKind::User,
            ..
        }
    ));
    assert!(matches!(
        directory.rename_user("a@example.com", "a/b").unwrap_err(),
        CoreError::InvalidName { .. }
    ));
    assert_eq!(store.keys().unwrap(), before);
    assert_eq!(
        store.get("user_1_name").unwrap().as_deref(),
        Some("a@example.com")
    );
}
