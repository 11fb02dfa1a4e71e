//! SQLite-backed durable store.
//!
//! # Invariants
//! - Each value kind lives in its own table; a key appears in at most one.
//! - `incr` runs inside an IMMEDIATE transaction so concurrent processes
//!   sharing one database file never observe the same counter value.

use super::{next_counter, parse_counter, KeyValueStore, KvError, KvResult, ValueKind};
use crate::db::{open_db, open_db_in_memory};
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Durable store over one SQLite connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (creating if needed) a store file.
    pub fn open(path: impl AsRef<Path>) -> KvResult<Self> {
        let path = path.as_ref();
        let conn = open_db(path)?;
        info!(
            "event=store_open module=kv status=ok backend=sqlite path={}",
            path.display()
        );
        Ok(Self::from_connection(conn))
    }

    /// Opens an ephemeral store that vanishes with the handle.
    pub fn open_in_memory() -> KvResult<Self> {
        let conn = open_db_in_memory()?;
        info!("event=store_open module=kv status=ok backend=sqlite path=:memory:");
        Ok(Self::from_connection(conn))
    }

    /// Wraps a connection that already went through `db` bootstrap.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn lock(&self) -> KvResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| KvError::Poisoned)
    }
}

fn kind_of(conn: &Connection, key: &str) -> KvResult<Option<ValueKind>> {
    let kind = conn
        .query_row(
            "SELECT kind FROM (
                SELECT 'scalar' AS kind FROM kv_scalars WHERE key = ?1
                UNION ALL
                SELECT 'hash' AS kind FROM kv_hash_fields WHERE key = ?1
                UNION ALL
                SELECT 'set' AS kind FROM kv_set_members WHERE key = ?1
             ) LIMIT 1;",
            [key],
            |row| row.get::<_, String>(0),
        )
        .optional()?;

    Ok(kind.map(|value| match value.as_str() {
        "hash" => ValueKind::Hash,
        "set" => ValueKind::Set,
        _ => ValueKind::Scalar,
    }))
}

fn ensure_kind(conn: &Connection, key: &str, expected: ValueKind) -> KvResult<()> {
    match kind_of(conn, key)? {
        Some(found) if found != expected => Err(KvError::WrongType {
            key: key.to_string(),
            expected,
            found,
        }),
        _ => Ok(()),
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> KvResult<Option<String>> {
        let conn = self.lock()?;
        ensure_kind(&conn, key, ValueKind::Scalar)?;
        let value = conn
            .query_row(
                "SELECT value FROM kv_scalars WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> KvResult<()> {
        let conn = self.lock()?;
        ensure_kind(&conn, key, ValueKind::Scalar)?;
        conn.execute(
            "INSERT INTO kv_scalars (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value;",
            params![key, value],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> KvResult<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut removed = 0;
        removed += tx.execute("DELETE FROM kv_scalars WHERE key = ?1;", [key])?;
        removed += tx.execute("DELETE FROM kv_hash_fields WHERE key = ?1;", [key])?;
        removed += tx.execute("DELETE FROM kv_set_members WHERE key = ?1;", [key])?;
        tx.commit()?;
        Ok(removed > 0)
    }

    fn incr(&self, key: &str) -> KvResult<i64> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        ensure_kind(&tx, key, ValueKind::Scalar)?;
        let current = tx
            .query_row(
                "SELECT value FROM kv_scalars WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        let next = match current {
            Some(value) => next_counter(key, parse_counter(key, &value)?)?,
            None => 1,
        };
        tx.execute(
            "INSERT INTO kv_scalars (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value;",
            params![key, next.to_string()],
        )?;
        tx.commit()?;
        debug!("event=counter_incr module=kv status=ok key={key} value={next}");
        Ok(next)
    }

    fn hash_get(&self, key: &str, field: &str) -> KvResult<Option<String>> {
        let conn = self.lock()?;
        ensure_kind(&conn, key, ValueKind::Hash)?;
        let value = conn
            .query_row(
                "SELECT value FROM kv_hash_fields WHERE key = ?1 AND field = ?2;",
                params![key, field],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn hash_set(&self, key: &str, field: &str, value: &str) -> KvResult<()> {
        let conn = self.lock()?;
        ensure_kind(&conn, key, ValueKind::Hash)?;
        conn.execute(
            "INSERT INTO kv_hash_fields (key, field, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(key, field) DO UPDATE SET value = excluded.value;",
            params![key, field, value],
        )?;
        Ok(())
    }

    fn hash_delete(&self, key: &str, field: &str) -> KvResult<bool> {
        let conn = self.lock()?;
        ensure_kind(&conn, key, ValueKind::Hash)?;
        let removed = conn.execute(
            "DELETE FROM kv_hash_fields WHERE key = ?1 AND field = ?2;",
            params![key, field],
        )?;
        Ok(removed > 0)
    }

    fn hash_entries(&self, key: &str) -> KvResult<BTreeMap<String, String>> {
        let conn = self.lock()?;
        ensure_kind(&conn, key, ValueKind::Hash)?;
        let mut stmt = conn.prepare(
            "SELECT field, value FROM kv_hash_fields WHERE key = ?1 ORDER BY field ASC;",
        )?;
        let mut rows = stmt.query([key])?;
        let mut fields = BTreeMap::new();
        while let Some(row) = rows.next()? {
            fields.insert(row.get::<_, String>(0)?, row.get::<_, String>(1)?);
        }
        Ok(fields)
    }

    fn set_add(&self, key: &str, member: &str) -> KvResult<bool> {
        let conn = self.lock()?;
        ensure_kind(&conn, key, ValueKind::Set)?;
        let added = conn.execute(
            "INSERT OR IGNORE INTO kv_set_members (key, member) VALUES (?1, ?2);",
            params![key, member],
        )?;
        Ok(added > 0)
    }

    fn set_remove(&self, key: &str, member: &str) -> KvResult<bool> {
        let conn = self.lock()?;
        ensure_kind(&conn, key, ValueKind::Set)?;
        let removed = conn.execute(
            "DELETE FROM kv_set_members WHERE key = ?1 AND member = ?2;",
            params![key, member],
        )?;
        Ok(removed > 0)
    }

    fn set_members(&self, key: &str) -> KvResult<Vec<String>> {
        let conn = self.lock()?;
        ensure_kind(&conn, key, ValueKind::Set)?;
        let mut stmt = conn
            .prepare("SELECT member FROM kv_set_members WHERE key = ?1 ORDER BY member ASC;")?;
        let mut rows = stmt.query([key])?;
        let mut members = Vec::new();
        while let Some(row) = rows.next()? {
            members.push(row.get::<_, String>(0)?);
        }
        Ok(members)
    }

    fn key_count(&self) -> KvResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM (
                SELECT key FROM kv_scalars
                UNION
                SELECT key FROM kv_hash_fields
                UNION
                SELECT key FROM kv_set_members
             );",
            [],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}
