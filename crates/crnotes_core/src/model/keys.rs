//! Key naming and id allocation.
//!
//! # Responsibility
//! - Own the store key layout used by every entity.
//! - Allocate `{kind}_{n}` ids from per-kind counters.
//!
//! # Invariants
//! - Counters only ever grow; ids are never reused, even after deletion.
//! - Allocation atomicity is delegated to `KeyValueStore::incr`.
//!
//! # Key layout
//! ```text
//! users             hash  username -> user id
//! user_{n}_name     scalar
//! user_{n}_notes    set   note ids
//! note_{n}_name     scalar
//! note_{n}_text     scalar
//! user_lastid       counter
//! note_lastid       counter
//! ```

use crate::kv::{KvError, KvResult, SharedStore};
use log::debug;
use std::fmt::{Debug, Display, Formatter};

/// Global username -> user id index.
pub const USERS_KEY: &str = "users";

const LASTID_SUFFIX: &str = "_lastid";
const NAME_SUFFIX: &str = "_name";
const TEXT_SUFFIX: &str = "_text";
const NOTES_SUFFIX: &str = "_notes";

/// Entity kinds that own an id counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    User,
    Note,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Note => "note",
        }
    }

    /// Counter key for this kind, e.g. `note_lastid`.
    pub fn counter_key(self) -> String {
        format!("{}{LASTID_SUFFIX}", self.as_str())
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn name_key(id: &str) -> String {
    format!("{id}{NAME_SUFFIX}")
}

pub fn text_key(id: &str) -> String {
    format!("{id}{TEXT_SUFFIX}")
}

pub fn notes_key(user_id: &str) -> String {
    format!("{user_id}{NOTES_SUFFIX}")
}

/// Id allocator bound to one store connection.
///
/// Built once per connection and handed to entity constructors; cloning
/// shares the same store handle.
#[derive(Clone)]
pub struct IdAllocator {
    store: SharedStore,
}

impl Debug for IdAllocator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdAllocator").finish_non_exhaustive()
    }
}

impl IdAllocator {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Allocates the next id for `kind`.
    pub fn next_id(&self, kind: EntityKind) -> KvResult<String> {
        let counter = self.store.incr(&kind.counter_key())?;
        let id = format!("{}_{counter}", kind.as_str());
        debug!("event=id_alloc module=keys status=ok kind={kind} id={id}");
        Ok(id)
    }

    /// Last value handed out for `kind`, 0 when nothing was allocated yet.
    pub fn last_id(&self, kind: EntityKind) -> KvResult<i64> {
        let key = kind.counter_key();
        match self.store.get(&key)? {
            Some(value) => value
                .parse::<i64>()
                .map_err(|_| KvError::NotAnInteger { key, value }),
            None => Ok(0),
        }
    }
}
