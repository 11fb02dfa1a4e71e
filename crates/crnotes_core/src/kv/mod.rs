//! Key-value store capability contract and backends.
//!
//! # Responsibility
//! - Define the minimal store surface the object cache relies on: scalars,
//!   atomic counters, hash and set sub-collections keyed by a parent key.
//! - Ship an in-memory backend for tests and a durable SQLite backend.
//!
//! # Invariants
//! - `incr` is the only operation that must be atomic across callers.
//! - A hash or set with no members does not exist and is not counted.
//! - A key holds exactly one kind of value; mixing kinds is `WrongType`.

use crate::db::DbError;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

mod memory;
mod sqlite;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

pub type KvResult<T> = Result<T, KvError>;

/// Shared handle to a store, cloned into every entity of one object graph.
pub type SharedStore = Arc<dyn KeyValueStore>;

/// Kind of value stored under a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Scalar,
    Hash,
    Set,
}

impl ValueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Hash => "hash",
            Self::Set => "set",
        }
    }
}

/// Store failure. The object cache never retries; it propagates these.
#[derive(Debug)]
pub enum KvError {
    Db(DbError),
    WrongType {
        key: String,
        expected: ValueKind,
        found: ValueKind,
    },
    NotAnInteger {
        key: String,
        value: String,
    },
    CounterOverflow {
        key: String,
    },
    Poisoned,
}

impl Display for KvError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::WrongType {
                key,
                expected,
                found,
            } => write!(
                f,
                "key `{key}` holds a {} value, expected {}",
                found.as_str(),
                expected.as_str()
            ),
            Self::NotAnInteger { key, value } => {
                write!(f, "key `{key}` holds non-integer value `{value}`")
            }
            Self::CounterOverflow { key } => write!(f, "counter `{key}` is exhausted"),
            Self::Poisoned => write!(f, "store lock poisoned"),
        }
    }
}

impl Error for KvError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for KvError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for KvError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// String-keyed store with scalar, counter, hash and set values.
///
/// All methods take `&self`; backends synchronize internally so one handle
/// can be shared by every entity of an object graph.
pub trait KeyValueStore: Send + Sync {
    /// Reads a scalar value.
    fn get(&self, key: &str) -> KvResult<Option<String>>;
    /// Writes a scalar value, replacing any previous scalar.
    fn set(&self, key: &str, value: &str) -> KvResult<()>;
    /// Removes the key whatever kind of value it holds. Returns whether it existed.
    fn delete(&self, key: &str) -> KvResult<bool>;
    /// Atomically increments an integer scalar (missing counts as 0) and
    /// returns the new value.
    fn incr(&self, key: &str) -> KvResult<i64>;

    /// Reads one hash field.
    fn hash_get(&self, key: &str, field: &str) -> KvResult<Option<String>>;
    /// Writes one hash field.
    fn hash_set(&self, key: &str, field: &str, value: &str) -> KvResult<()>;
    /// Removes one hash field. Returns whether it existed.
    fn hash_delete(&self, key: &str, field: &str) -> KvResult<bool>;
    /// Returns every field of a hash ordered by field.
    fn hash_entries(&self, key: &str) -> KvResult<BTreeMap<String, String>>;

    /// Adds a set member. Returns whether it was newly added.
    fn set_add(&self, key: &str, member: &str) -> KvResult<bool>;
    /// Removes a set member. Returns whether it existed.
    fn set_remove(&self, key: &str, member: &str) -> KvResult<bool>;
    /// Returns every member of a set in ascending order.
    fn set_members(&self, key: &str) -> KvResult<Vec<String>>;

    /// Number of distinct existing keys, across all value kinds.
    fn key_count(&self) -> KvResult<usize>;
}

/// Successor of a stored counter; fails instead of wrapping at `i64::MAX`.
fn next_counter(key: &str, current: i64) -> KvResult<i64> {
    current.checked_add(1).ok_or_else(|| KvError::CounterOverflow {
        key: key.to_string(),
    })
}

fn parse_counter(key: &str, value: &str) -> KvResult<i64> {
    value.parse::<i64>().map_err(|_| KvError::NotAnInteger {
        key: key.to_string(),
        value: value.to_string(),
    })
}
