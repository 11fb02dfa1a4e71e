//! Lazily loaded user entity owning its notes.
//!
//! # Responsibility
//! - Enumerate the user's note ids on first access to `notes`.
//! - Keep the per-user note-id set in step with note create/delete.
//!
//! # Invariants
//! - Loading instantiates unloaded `Note` handles; note fields stay lazy.
//! - A note's own fields are written before its id enters the note-id set,
//!   so a crash can leave an orphan note but never a dangling member.
//! - After `delete` every operation fails with `StaleHandle`.

use crate::model::error::{CoreError, CoreResult};
use crate::model::keys::{name_key, notes_key, EntityKind, IdAllocator};
use crate::model::name::validate_name;
use crate::model::note::{Note, NoteView};
use crate::model::state::LoadState;
use log::{debug, info};
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};

pub struct User {
    id: String,
    ids: IdAllocator,
    state: LoadState,
    name: Option<String>,
    notes: BTreeMap<String, Note>,
}

impl User {
    /// Allocates an id and persists the user's name. Starts loaded with no notes.
    pub fn create(ids: &IdAllocator, name: &str) -> CoreResult<Self> {
        validate_name(name).map_err(|reason| CoreError::invalid_name(name, reason))?;

        let id = ids.next_id(EntityKind::User)?;
        ids.store().set(&name_key(&id), name)?;
        info!("event=user_create module=model status=ok user_id={id}");

        Ok(Self {
            id,
            ids: ids.clone(),
            state: LoadState::Loaded,
            name: Some(name.to_string()),
            notes: BTreeMap::new(),
        })
    }

    /// Builds a handle for an existing user without touching the store.
    pub fn by_reference(ids: &IdAllocator, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ids: ids.clone(),
            state: LoadState::Unloaded,
            name: None,
            notes: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.state.is_loaded()
    }

    pub fn name(&mut self) -> CoreResult<&str> {
        self.ensure_live()?;
        if self.name.is_none() {
            self.load()?;
        }
        Ok(self.name.as_deref().unwrap_or_default())
    }

    /// Rewrites `user_{n}_name` only; `NoteDirectory::rename_user` keeps the
    /// username index in step.
    pub(crate) fn set_name(&mut self, name: &str) -> CoreResult<()> {
        self.ensure_live()?;
        validate_name(name).map_err(|reason| CoreError::invalid_name(name, reason))?;
        self.ids.store().set(&name_key(&self.id), name)?;
        self.name = Some(name.to_string());
        Ok(())
    }

    /// Notes keyed by id, loading the id set on first access.
    pub fn notes(&mut self) -> CoreResult<&BTreeMap<String, Note>> {
        self.load()?;
        Ok(&self.notes)
    }

    pub fn note_mut(&mut self, note_id: &str) -> CoreResult<&mut Note> {
        self.load()?;
        self.notes
            .get_mut(note_id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Note, note_id))
    }

    /// Creates a note and records it in this user's note-id set.
    pub fn add_note(&mut self, name: &str) -> CoreResult<&mut Note> {
        self.ensure_live()?;
        let note = Note::create(&self.ids, name)?;
        let note_id = note.id().to_string();
        self.ids.store().set_add(&notes_key(&self.id), &note_id)?;
        debug!(
            "event=note_add module=model status=ok user_id={} note_id={}",
            self.id, note_id
        );
        Ok(self.notes.entry(note_id).or_insert(note))
    }

    /// Renames one note. Membership is keyed by id, so only the note changes.
    pub fn rename_note(&mut self, note_id: &str, new_name: &str) -> CoreResult<String> {
        self.note_mut(note_id)?.set_name(new_name)?;
        Ok(new_name.to_string())
    }

    /// Deletes one note's fields and its membership record.
    pub fn delete_note(&mut self, note_id: &str) -> CoreResult<String> {
        self.note_mut(note_id)?.delete()?;
        self.notes.remove(note_id);
        self.ids.store().set_remove(&notes_key(&self.id), note_id)?;
        debug!(
            "event=note_remove module=model status=ok user_id={} note_id={}",
            self.id, note_id
        );
        Ok(note_id.to_string())
    }

    /// Views of every note, ordered by name then id.
    pub fn views(&mut self) -> CoreResult<Vec<NoteView>> {
        self.load()?;
        let mut views = self
            .notes
            .values_mut()
            .map(Note::view)
            .collect::<CoreResult<Vec<_>>>()?;
        views.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(views)
    }

    /// Deletes every owned note, then the user's own keys.
    ///
    /// Only the note-id set is read; the name key may already be gone. Each
    /// note leaves the in-memory map as soon as its keys are removed, so a
    /// failed cascade can be rerun.
    pub fn delete(&mut self) -> CoreResult<()> {
        self.ensure_live()?;
        let store = self.ids.store().clone();
        let notes_key = notes_key(&self.id);
        for note_id in store.set_members(&notes_key)? {
            self.notes
                .entry(note_id.clone())
                .or_insert_with(|| Note::by_reference(store.clone(), note_id));
        }

        let mut deleted = 0usize;
        while let Some((note_id, mut note)) = self.notes.pop_first() {
            if let Err(err) = note.delete() {
                self.notes.insert(note_id, note);
                return Err(err);
            }
            deleted += 1;
        }
        store.delete(&name_key(&self.id))?;
        store.delete(&notes_key)?;
        info!(
            "event=user_delete module=model status=ok user_id={} notes={deleted}",
            self.id
        );
        self.name = None;
        self.state = LoadState::Deleted;
        Ok(())
    }

    fn ensure_live(&self) -> CoreResult<()> {
        if self.state.is_deleted() {
            return Err(CoreError::stale(EntityKind::User, &self.id));
        }
        Ok(())
    }

    /// Reads the name and note-id set once; no-op when already loaded.
    fn load(&mut self) -> CoreResult<()> {
        self.ensure_live()?;
        if self.state.is_loaded() {
            return Ok(());
        }

        let store = self.ids.store().clone();
        if self.name.is_none() {
            let key = name_key(&self.id);
            match store.get(&key)? {
                Some(name) => self.name = Some(name),
                None => return Err(CoreError::MissingRecord { key }),
            }
        }
        for note_id in store.set_members(&notes_key(&self.id))? {
            self.notes
                .entry(note_id.clone())
                .or_insert_with(|| Note::by_reference(store.clone(), note_id));
        }
        self.state = LoadState::Loaded;
        debug!(
            "event=user_load module=model status=ok user_id={} notes={}",
            self.id,
            self.notes.len()
        );
        Ok(())
    }
}

impl Debug for User {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("name", &self.name)
            .field("notes", &self.notes.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::User;
    use crate::kv::{InMemoryStore, KeyValueStore, SharedStore};
    use crate::model::error::CoreError;
    use crate::model::keys::IdAllocator;
    use std::sync::Arc;

    fn fixture() -> (Arc<InMemoryStore>, IdAllocator) {
        let store = Arc::new(InMemoryStore::new());
        let shared: SharedStore = store.clone();
        (store, IdAllocator::new(shared))
    }

    #[test]
    fn new_user_has_no_notes_and_two_keys() {
        let (store, ids) = fixture();
        let mut user = User::create(&ids, "user@example.com").unwrap();
        assert!(user.notes().unwrap().is_empty());
        assert_eq!(store.key_count().unwrap(), 2);
    }

    #[test]
    fn add_note_writes_fields_set_and_counter() {
        let (store, ids) = fixture();
        let mut user = User::create(&ids, "user@example.com").unwrap();
        let note_id = user.add_note("Test Note").unwrap().id().to_string();

        assert_eq!(user.notes().unwrap().len(), 1);
        assert_eq!(user.note_mut(&note_id).unwrap().name().unwrap(), "Test Note");
        // user name, user counter, note name, note text, note counter, note-id set
        assert_eq!(store.key_count().unwrap(), 6);
    }

    #[test]
    fn delete_note_rejects_unknown_id() {
        let (_store, ids) = fixture();
        let mut user = User::create(&ids, "user@example.com").unwrap();
        let err = user.delete_note("note_9").unwrap_err();
        assert!(matches!(err, CoreError::NotFound { id, .. } if id == "note_9"));
    }

    #[test]
    fn rename_keeps_membership_and_key_count() {
        let (store, ids) = fixture();
        let mut user = User::create(&ids, "user@example.com").unwrap();
        let note_id = user.add_note("Test Note").unwrap().id().to_string();

        user.rename_note(&note_id, "Test Note2").unwrap();
        let views = user.views().unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].name, "Test Note2");
        assert_eq!(store.key_count().unwrap(), 6);
    }

    #[test]
    fn rename_rejects_unsafe_name_without_writing() {
        let (_store, ids) = fixture();
        let mut user = User::create(&ids, "user@example.com").unwrap();
        let note_id = user.add_note("keep").unwrap().id().to_string();

        let err = user.rename_note(&note_id, "a/b").unwrap_err();
        assert!(matches!(err, CoreError::InvalidName { .. }));
        assert_eq!(user.note_mut(&note_id).unwrap().name().unwrap(), "keep");
    }

    #[test]
    fn delete_without_name_key_still_clears_notes() {
        let (store, ids) = fixture();
        let mut user = User::create(&ids, "user@example.com").unwrap();
        user.add_note("orphaned").unwrap();
        store.delete("user_1_name").unwrap();

        let mut reopened = User::by_reference(&ids, "user_1");
        reopened.delete().unwrap();
        assert!(reopened.state().is_deleted());
        assert_eq!(
            store.keys().unwrap(),
            vec!["note_lastid".to_string(), "user_lastid".to_string()]
        );
    }

    #[test]
    fn failed_delete_keeps_handle_live_for_retry() {
        let (store, ids) = fixture();
        let mut user = User::create(&ids, "user@example.com").unwrap();
        user.add_note("first").unwrap();
        user.add_note("second").unwrap();

        // a scalar where the note-id set belongs stops the cascade
        let mut reopened = User::by_reference(&ids, "user_1");
        let members = store.set_members("user_1_notes").unwrap();
        store.delete("user_1_notes").unwrap();
        store.set("user_1_notes", "corrupt").unwrap();
        assert!(matches!(reopened.delete().unwrap_err(), CoreError::Store(_)));
        assert!(!reopened.state().is_deleted());

        store.delete("user_1_notes").unwrap();
        for note_id in &members {
            store.set_add("user_1_notes", note_id).unwrap();
        }
        reopened.delete().unwrap();
        assert_eq!(
            store.keys().unwrap(),
            vec!["note_lastid".to_string(), "user_lastid".to_string()]
        );
    }
}
