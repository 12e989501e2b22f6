//! Mutation guard for polls and operating periods.
//!
//! # Responsibility
//! - Refuse updates and deletes that would retroactively invalidate
//!   registrations or cast ballots.
//!
//! # Invariants
//! - A poll referenced by any ballot is immutable.
//! - An operating period is immutable once any registration at its center
//!   has a voting date inside the period's date range.
//! - Checks run on the same connection (and transaction) as the mutation
//!   they protect.

use crate::model::ids::PollCode;
use crate::model::poll::{OperatingPeriod, PeriodId};
use crate::repo::error::{RepoError, RepoResult};
use log::warn;
use rusqlite::{params, Connection};
use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Record that cannot be edited or removed because data depends on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum ProtectedRecord {
    Poll {
        code: PollCode,
        ballots: u64,
    },
    OperatingPeriod {
        period_id: PeriodId,
        registrations: u64,
    },
}

impl Display for ProtectedRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Poll { code, ballots } => {
                write!(f, "poll {code} is referenced by {ballots} ballot(s)")
            }
            Self::OperatingPeriod {
                period_id,
                registrations,
            } => write!(
                f,
                "operating period {period_id} covers {registrations} registration(s)"
            ),
        }
    }
}

/// Counts ballots cast on `code`.
pub fn poll_ballot_count(conn: &Connection, code: &PollCode) -> RepoResult<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM ballots WHERE poll_code = ?1;",
        [code.as_str()],
        |row| row.get(0),
    )?;
    Ok(count.max(0) as u64)
}

/// Counts registrations at the period's center dated inside its range.
pub fn period_registration_count(conn: &Connection, period: &OperatingPeriod) -> RepoResult<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*)
         FROM registrations
         WHERE center_id = ?1
           AND voting_date BETWEEN ?2 AND ?3;",
        params![period.center_id, period.first_date(), period.last_date()],
        |row| row.get(0),
    )?;
    Ok(count.max(0) as u64)
}

/// Fails with `RepoError::Protected` when the poll has ballots.
pub fn ensure_poll_mutable(conn: &Connection, code: &PollCode) -> RepoResult<()> {
    let ballots = poll_ballot_count(conn, code)?;
    if ballots > 0 {
        warn!(
            "event=mutation_guard module=guard status=rejected record=poll poll={} ballots={}",
            code, ballots
        );
        return Err(RepoError::Protected(ProtectedRecord::Poll {
            code: code.clone(),
            ballots,
        }));
    }
    Ok(())
}

/// Fails with `RepoError::Protected` when registrations fall inside the
/// period.
pub fn ensure_period_mutable(conn: &Connection, period: &OperatingPeriod) -> RepoResult<()> {
    let registrations = period_registration_count(conn, period)?;
    if registrations > 0 {
        warn!(
            "event=mutation_guard module=guard status=rejected record=operating_period period_id={} registrations={}",
            period.period_id, registrations
        );
        return Err(RepoError::Protected(ProtectedRecord::OperatingPeriod {
            period_id: period.period_id,
            registrations,
        }));
    }
    Ok(())
}
