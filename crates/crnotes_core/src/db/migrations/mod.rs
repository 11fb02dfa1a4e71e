//! Key-value table bootstrap steps.
//!
//! # Invariants
//! - Step versions are strictly increasing.
//! - All pending steps run in one transaction; the applied version is
//!   mirrored to `PRAGMA user_version`.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

/// `(version, sql)` pairs, oldest first.
const LAYOUT_STEPS: &[(u32, &str)] = &[(1, include_str!("0001_kv_tables.sql"))];

/// Latest table layout version known by this binary.
pub fn latest_version() -> u32 {
    LAYOUT_STEPS.last().map_or(0, |(version, _)| *version)
}

/// Brings the connection's tables up to `latest_version()`.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let current: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    let latest = latest_version();

    if current > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current,
            latest_supported: latest,
        });
    }
    if current == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (version, sql) in LAYOUT_STEPS.iter().filter(|(version, _)| *version > current) {
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", version)?;
    }
    tx.commit()?;

    info!("event=db_layout module=db status=ok from={current} to={latest}");
    Ok(())
}
