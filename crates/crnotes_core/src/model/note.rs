//! Lazily loaded note entity.
//!
//! # Responsibility
//! - Cache a note's `name` and `text`, fetching them on first read.
//! - Write field changes through to the store immediately.
//!
//! # Invariants
//! - `id` never changes after construction.
//! - A field is fetched at most once per instance; cached fields are never
//!   re-read from the store.
//! - Writing one field does not load the other.
//! - After `delete` every operation fails with `StaleHandle`.
//! - `delete` leaves the owning user's note-id set untouched.

use crate::kv::SharedStore;
use crate::model::error::{CoreError, CoreResult};
use crate::model::keys::{name_key, text_key, EntityKind, IdAllocator};
use crate::model::name::validate_name;
use crate::model::state::LoadState;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};

/// Presentation shape of one note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteView {
    pub id: String,
    pub name: String,
    pub text: String,
}

pub struct Note {
    id: String,
    store: SharedStore,
    state: LoadState,
    name: Option<String>,
    text: Option<String>,
}

impl Note {
    /// Creates and persists a new note with empty text.
    ///
    /// The name is validated before an id is allocated, so a rejected name
    /// leaves the store untouched.
    pub fn create(ids: &IdAllocator, name: &str) -> CoreResult<Self> {
        validate_name(name).map_err(|reason| CoreError::invalid_name(name, reason))?;

        let id = ids.next_id(EntityKind::Note)?;
        let store = ids.store().clone();
        store.set(&name_key(&id), name)?;
        store.set(&text_key(&id), "")?;
        debug!("event=note_create module=model status=ok note_id={id}");

        Ok(Self {
            id,
            store,
            state: LoadState::Loaded,
            name: Some(name.to_string()),
            text: Some(String::new()),
        })
    }

    /// Builds a handle for an existing note without touching the store.
    pub fn by_reference(store: SharedStore, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            store,
            state: LoadState::Unloaded,
            name: None,
            text: None,
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

    pub fn text(&mut self) -> CoreResult<&str> {
        self.ensure_live()?;
        if self.text.is_none() {
            self.load()?;
        }
        Ok(self.text.as_deref().unwrap_or_default())
    }

    pub fn set_name(&mut self, name: &str) -> CoreResult<()> {
        self.ensure_live()?;
        validate_name(name).map_err(|reason| CoreError::invalid_name(name, reason))?;
        self.store.set(&name_key(&self.id), name)?;
        self.name = Some(name.to_string());
        self.settle();
        Ok(())
    }

    pub fn set_text(&mut self, text: &str) -> CoreResult<()> {
        self.ensure_live()?;
        self.store.set(&text_key(&self.id), text)?;
        self.text = Some(text.to_string());
        self.settle();
        Ok(())
    }

    /// Removes the persisted fields. The parent's membership record is the
    /// caller's to remove.
    pub fn delete(&mut self) -> CoreResult<()> {
        self.ensure_live()?;
        self.store.delete(&name_key(&self.id))?;
        self.store.delete(&text_key(&self.id))?;
        self.state = LoadState::Deleted;
        self.name = None;
        self.text = None;
        debug!(
            "event=note_delete module=model status=ok note_id={}",
            self.id
        );
        Ok(())
    }

    /// Snapshot for presentation, loading fields if needed.
    pub fn view(&mut self) -> CoreResult<NoteView> {
        let name = self.name()?.to_string();
        let text = self.text()?.to_string();
        Ok(NoteView {
            id: self.id.clone(),
            name,
            text,
        })
    }

    fn ensure_live(&self) -> CoreResult<()> {
        if self.state.is_deleted() {
            return Err(CoreError::stale(EntityKind::Note, &self.id));
        }
        Ok(())
    }

    /// Fetches every field not cached yet.
    fn load(&mut self) -> CoreResult<()> {
        if self.name.is_none() {
            self.name = Some(self.fetch(name_key(&self.id))?);
        }
        if self.text.is_none() {
            self.text = Some(self.fetch(text_key(&self.id))?);
        }
        self.state = LoadState::Loaded;
        debug!("event=note_load module=model status=ok note_id={}", self.id);
        Ok(())
    }

    fn fetch(&self, key: String) -> CoreResult<String> {
        match self.store.get(&key)? {
            Some(value) => Ok(value),
            None => Err(CoreError::MissingRecord { key }),
        }
    }

    fn settle(&mut self) {
        if self.state == LoadState::Unloaded && self.name.is_some() && self.text.is_some() {
            self.state = LoadState::Loaded;
        }
    }
}

impl Debug for Note {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Note")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
