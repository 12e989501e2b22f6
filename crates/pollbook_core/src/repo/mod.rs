//! Repository layer over the SQLite store.
//!
//! # Responsibility
//! - Define per-aggregate data access contracts.
//! - Keep SQL details out of the rule logic in `service`.
//!
//! # Invariants
//! - Repositories are only constructed over fully migrated connections.
//! - Uniqueness and foreign-key failures surface as `Conflict` and
//!   `ReferenceViolation`, never as raw SQLite errors.
//! - Repositories accept a `Transaction` wherever they accept a
//!   `Connection`, so services can compose them inside one unit of work.

pub mod ballot_repo;
pub mod error;
pub mod folk_repo;
pub mod guard;
pub mod place_repo;
pub mod poll_repo;
pub mod registration_repo;

use crate::db::migrations::{latest_version, schema_version};
use crate::model::error::ValidationError;
use crate::model::ids::{CenterCode, FolkId, PollCode};
use error::{RepoError, RepoResult};
use rusqlite::Connection;

/// Rejects connections whose schema is not at the version this crate expects.
pub(crate) fn ensure_schema_ready(conn: &Connection) -> RepoResult<()> {
    let expected = latest_version();
    let actual = schema_version(conn)?;
    if actual != expected {
        return Err(RepoError::InvalidData(format!(
            "repository requires schema version {expected}, got {actual}"
        )));
    }
    Ok(())
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn int_to_bool(value: i64, column: &'static str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean `{other}` in {column}"
        ))),
    }
}

pub(crate) fn decode_folk_id(value: &str, column: &'static str) -> RepoResult<FolkId> {
    FolkId::parse(value).map_err(|err| invalid_column(column, err))
}

pub(crate) fn decode_poll_code(value: &str, column: &'static str) -> RepoResult<PollCode> {
    PollCode::parse(value).map_err(|err| invalid_column(column, err))
}

pub(crate) fn decode_center_code(value: &str, column: &'static str) -> RepoResult<CenterCode> {
    CenterCode::parse(value).map_err(|err| invalid_column(column, err))
}

pub(crate) fn invalid_column(column: &'static str, err: ValidationError) -> RepoError {
    RepoError::InvalidData(format!("{column}: {err}"))
}
