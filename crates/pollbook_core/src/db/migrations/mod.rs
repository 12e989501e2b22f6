//! Embedded schema scripts and the executor that applies them.
//!
//! # Invariants
//! - Script versions are strictly increasing, starting at 1.
//! - The highest applied version is recorded in `PRAGMA user_version`.
//! - All pending scripts commit together or not at all.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct SchemaScript {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SCHEMA_SCRIPTS: &[SchemaScript] = &[
    SchemaScript {
        version: 1,
        name: "places_folk_polls",
        sql: include_str!("0001_init.sql"),
    },
    SchemaScript {
        version: 2,
        name: "registrations_ballots",
        sql: include_str!("0002_registrations_ballots.sql"),
    },
    SchemaScript {
        version: 3,
        name: "staff",
        sql: include_str!("0003_staff.sql"),
    },
];

/// Schema version this binary migrates databases up to.
pub fn latest_version() -> u32 {
    SCHEMA_SCRIPTS.last().map_or(0, |script| script.version)
}

/// Brings the connected database up to [`latest_version`].
///
/// # Errors
/// - `DbError::UnsupportedSchemaVersion` when the file was written by a newer
///   binary.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from_version = schema_version(conn)?;
    let to_version = latest_version();

    if from_version > to_version {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from_version,
            latest_supported: to_version,
        });
    }
    if from_version == to_version {
        return Ok(());
    }

    info!("event=db_migrate module=db status=start from_version={from_version} to_version={to_version}");
    let tx = conn.transaction()?;
    for script in pending_scripts(from_version) {
        tx.execute_batch(script.sql)?;
        tx.pragma_update(None, "user_version", script.version)?;
        info!(
            "event=db_migrate_step module=db status=ok version={} name={}",
            script.version, script.name
        );
    }
    tx.commit()?;
    info!("event=db_migrate module=db status=ok version={to_version}");

    Ok(())
}

/// Reads `PRAGMA user_version`.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

fn pending_scripts(from_version: u32) -> impl Iterator<Item = &'static SchemaScript> {
    SCHEMA_SCRIPTS
        .iter()
        .filter(move |script| script.version > from_version)
}
