//! Note use-case service.
//!
//! # Responsibility
//! - Provide list/create/read/update/delete for one user's notes.
//! - Map object-cache errors to caller-facing semantics.
//!
//! # Invariants
//! - Users are resolved with `NoteDirectory::get_user`, so every call upserts
//!   the caller's user record.
//! - `update` validates a new name before writing any field.
//! - `list` is ordered by note name, then id.

use crate::model::directory::NoteDirectory;
use crate::model::error::CoreError;
use crate::model::keys::EntityKind;
use crate::model::name::{validate_name, NameError};
use crate::model::note::NoteView;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for note use-cases.
#[derive(Debug)]
pub enum NoteServiceError {
    /// Note or user name is not a safe name.
    InvalidName { name: String, reason: NameError },
    /// Target note does not belong to the user.
    NoteNotFound(String),
    /// Any other object-cache or store failure.
    Core(CoreError),
}

impl Display for NoteServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName { name, reason } => write!(f, "invalid name `{name}`: {reason}"),
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::Core(err) => write!(f, "{err}"),
        }
    }
}

impl Error for NoteServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidName { reason, .. } => Some(reason),
            Self::Core(err) => Some(err),
            Self::NoteNotFound(_) => None,
        }
    }
}

impl From<CoreError> for NoteServiceError {
    fn from(value: CoreError) -> Self {
        match value {
            CoreError::InvalidName { name, reason } => Self::InvalidName { name, reason },
            CoreError::NotFound {
                kind: EntityKind::Note,
                id,
            } => Self::NoteNotFound(id),
            other => Self::Core(other),
        }
    }
}

pub type NoteServiceResult<T> = Result<T, NoteServiceError>;

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NoteUpdate {
    pub name: Option<String>,
    pub text: Option<String>,
}

/// Note service facade over one directory.
#[derive(Debug)]
pub struct NoteService {
    directory: NoteDirectory,
}

impl NoteService {
    pub fn new(directory: NoteDirectory) -> Self {
        Self { directory }
    }

    pub fn directory(&self) -> &NoteDirectory {
        &self.directory
    }

    pub fn directory_mut(&mut self) -> &mut NoteDirectory {
        &mut self.directory
    }

    /// All notes of `username`, ordered by name.
    pub fn list(&mut self, username: &str) -> NoteServiceResult<Vec<NoteView>> {
        let user = self.directory.get_user(username)?;
        Ok(user.views()?)
    }

    pub fn create(&mut self, username: &str, name: &str) -> NoteServiceResult<NoteView> {
        let user = self.directory.get_user(username)?;
        let note = user.add_note(name)?;
        Ok(note.view()?)
    }

    pub fn read(&mut self, username: &str, note_id: &str) -> NoteServiceResult<NoteView> {
        let user = self.directory.get_user(username)?;
        Ok(user.note_mut(note_id)?.view()?)
    }

    /// Applies `update` and returns the resulting note.
    pub fn update(
        &mut self,
        username: &str,
        note_id: &str,
        update: &NoteUpdate,
    ) -> NoteServiceResult<NoteView> {
        if let Some(name) = update.name.as_deref() {
            validate_name(name).map_err(|reason| NoteServiceError::InvalidName {
                name: name.to_string(),
                reason,
            })?;
        }

        let user = self.directory.get_user(username)?;
        let note = user.note_mut(note_id)?;
        if let Some(name) = update.name.as_deref() {
            note.set_name(name)?;
        }
        if let Some(text) = update.text.as_deref() {
            note.set_text(text)?;
        }
        Ok(note.view()?)
    }

    pub fn delete(&mut self, username: &str, note_id: &str) -> NoteServiceResult<String> {
        let user = self.directory.get_user(username)?;
        Ok(user.delete_note(note_id)?)
    }
}
