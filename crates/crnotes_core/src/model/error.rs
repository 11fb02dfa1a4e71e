//! Error taxonomy of the object cache.

use crate::kv::KvError;
use crate::model::keys::EntityKind;
use crate::model::name::NameError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Debug)]
pub enum CoreError {
    /// Candidate name failed the safe-name predicate. Nothing was written.
    InvalidName { name: String, reason: NameError },
    /// Id or username is not present in the in-memory mapping.
    NotFound { kind: EntityKind, id: String },
    /// Username is already registered in the directory.
    AlreadyExists { username: String },
    /// Handle used after its entity was deleted.
    StaleHandle { kind: EntityKind, id: String },
    /// Referenced record has no persisted fields.
    MissingRecord { key: String },
    /// Backing store failure, propagated unchanged.
    Store(KvError),
}

impl CoreError {
    pub(crate) fn invalid_name(name: &str, reason: NameError) -> Self {
        Self::InvalidName {
            name: name.to_string(),
            reason,
        }
    }

    pub(crate) fn not_found(kind: EntityKind, id: &str) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub(crate) fn stale(kind: EntityKind, id: &str) -> Self {
        Self::StaleHandle {
            kind,
            id: id.to_string(),
        }
    }
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName { name, reason } => write!(f, "invalid name `{name}`: {reason}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::AlreadyExists { username } => write!(f, "user already exists: {username}"),
            Self::StaleHandle { kind, id } => write!(f, "{kind} {id} was deleted"),
            Self::MissingRecord { key } => write!(f, "missing persisted record `{key}`"),
            Self::Store(err) => write!(f, "store unavailable: {err}"),
        }
    }
}

impl Error for CoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidName { reason, .. } => Some(reason),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<KvError> for CoreError {
    fn from(value: KvError) -> Self {
        Self::Store(value)
    }
}
