//! HashMap-backed store for tests and ephemeral use.

use super::{next_counter, parse_counter, KeyValueStore, KvError, KvResult, ValueKind};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone)]
enum Value {
    Scalar(String),
    Hash(BTreeMap<String, String>),
    Set(BTreeSet<String>),
}

impl Value {
    fn kind(&self) -> ValueKind {
        match self {
            Self::Scalar(_) => ValueKind::Scalar,
            Self::Hash(_) => ValueKind::Hash,
            Self::Set(_) => ValueKind::Set,
        }
    }
}

/// In-memory store.
///
/// Counts read round-trips (`get`, `hash_get`, `hash_entries`,
/// `set_members`) so tests can observe how often the cache hits the store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, Value>>,
    reads: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of read round-trips served so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Sorted list of existing keys.
    pub fn keys(&self) -> KvResult<Vec<String>> {
        let entries = self.lock()?;
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    fn lock(&self) -> KvResult<MutexGuard<'_, HashMap<String, Value>>> {
        self.entries.lock().map_err(|_| KvError::Poisoned)
    }

    fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::SeqCst);
    }
}

fn wrong_type(key: &str, expected: ValueKind, found: &Value) -> KvError {
    KvError::WrongType {
        key: key.to_string(),
        expected,
        found: found.kind(),
    }
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> KvResult<Option<String>> {
        self.record_read();
        let entries = self.lock()?;
        match entries.get(key) {
            None => Ok(None),
            Some(Value::Scalar(value)) => Ok(Some(value.clone())),
            Some(other) => Err(wrong_type(key, ValueKind::Scalar, other)),
        }
    }

    fn set(&self, key: &str, value: &str) -> KvResult<()> {
        let mut entries = self.lock()?;
        if let Some(existing) = entries.get(key) {
            if !matches!(existing, Value::Scalar(_)) {
                return Err(wrong_type(key, ValueKind::Scalar, existing));
            }
        }
        entries.insert(key.to_string(), Value::Scalar(value.to_string()));
        Ok(())
    }

    fn delete(&self, key: &str) -> KvResult<bool> {
        let mut entries = self.lock()?;
        Ok(entries.remove(key).is_some())
    }

    fn incr(&self, key: &str) -> KvResult<i64> {
        let mut entries = self.lock()?;
        let current = match entries.get(key) {
            None => 0,
            Some(Value::Scalar(value)) => parse_counter(key, value)?,
            Some(other) => return Err(wrong_type(key, ValueKind::Scalar, other)),
        };
        let next = next_counter(key, current)?;
        entries.insert(key.to_string(), Value::Scalar(next.to_string()));
        Ok(next)
    }

    fn hash_get(&self, key: &str, field: &str) -> KvResult<Option<String>> {
        self.record_read();
        let entries = self.lock()?;
        match entries.get(key) {
            None => Ok(None),
            Some(Value::Hash(fields)) => Ok(fields.get(field).cloned()),
            Some(other) => Err(wrong_type(key, ValueKind::Hash, other)),
        }
    }

    fn hash_set(&self, key: &str, field: &str, value: &str) -> KvResult<()> {
        let mut entries = self.lock()?;
        let slot = entries
            .entry(key.to_string())
            .or_insert_with(|| Value::Hash(BTreeMap::new()));
        match slot {
            Value::Hash(fields) => {
                fields.insert(field.to_string(), value.to_string());
                Ok(())
            }
            other => Err(wrong_type(key, ValueKind::Hash, other)),
        }
    }

    fn hash_delete(&self, key: &str, field: &str) -> KvResult<bool> {
        let mut entries = self.lock()?;
        let (removed, now_empty) = match entries.get_mut(key) {
            None => return Ok(false),
            Some(Value::Hash(fields)) => {
                let removed = fields.remove(field).is_some();
                (removed, fields.is_empty())
            }
            Some(other) => return Err(wrong_type(key, ValueKind::Hash, other)),
        };
        if now_empty {
            entries.remove(key);
        }
        Ok(removed)
    }

    fn hash_entries(&self, key: &str) -> KvResult<BTreeMap<String, String>> {
        self.record_read();
        let entries = self.lock()?;
        match entries.get(key) {
            None => Ok(BTreeMap::new()),
            Some(Value::Hash(fields)) => Ok(fields.clone()),
            Some(other) => Err(wrong_type(key, ValueKind::Hash, other)),
        }
    }

    fn set_add(&self, key: &str, member: &str) -> KvResult<bool> {
        let mut entries = self.lock()?;
        let slot = entries
            .entry(key.to_string())
            .or_insert_with(|| Value::Set(BTreeSet::new()));
        match slot {
            Value::Set(members) => Ok(members.insert(member.to_string())),
            other => Err(wrong_type(key, ValueKind::Set, other)),
        }
    }

    fn set_remove(&self, key: &str, member: &str) -> KvResult<bool> {
        let mut entries = self.lock()?;
        let (removed, now_empty) = match entries.get_mut(key) {
            None => return Ok(false),
            Some(Value::Set(members)) => {
                let removed = members.remove(member);
                (removed, members.is_empty())
            }
            Some(other) => return Err(wrong_type(key, ValueKind::Set, other)),
        };
        if now_empty {
            entries.remove(key);
        }
        Ok(removed)
    }

    fn set_members(&self, key: &str) -> KvResult<Vec<String>> {
        self.record_read();
        let entries = self.lock()?;
        match entries.get(key) {
            None => Ok(Vec::new()),
            Some(Value::Set(members)) => Ok(members.iter().cloned().collect()),
            Some(other) => Err(wrong_type(key, ValueKind::Set, other)),
        }
    }

    fn key_count(&self) -> KvResult<usize> {
        Ok(self.lock()?.len())
    }
}
