//! Ballot persistence and the read set consulted while casting.
//!
//! # Responsibility
//! - Expose exactly the reads the casting pipeline needs, plus the single
//!   ballot insert that commits a cast.
//! - Translate the `(folk, poll)` uniqueness violation into
//!   `RepoError::Conflict`.
//!
//! # Invariants
//! - Every method is safe to call inside the caster's transaction.
//! - No method updates or deletes ballots.

use crate::model::ballot::{Ballot, NewBallot, PollTally, VoteChoice};
use crate::model::ids::{FolkId, PlaceId, PollCode};
use crate::model::poll::{OperatingPeriod, Poll};
use crate::model::registration::RegistrationId;
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::place_repo::load_center_periods;
use crate::repo::poll_repo::load_poll;
use crate::repo::{decode_folk_id, decode_poll_code, ensure_schema_ready, invalid_column};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

const BALLOT_SELECT_SQL: &str = "SELECT
    ballot_id,
    folk_id,
    poll_code,
    choice,
    cast_at,
    registration_id,
    receipt_uuid
FROM ballots";

/// Store port used by the ballot-casting pipeline.
pub trait BallotRepository {
    fn ballot_exists(&self, folk_id: &FolkId, poll_code: &PollCode) -> RepoResult<bool>;
    fn find_poll(&self, poll_code: &PollCode) -> RepoResult<Option<Poll>>;
    /// Ids of valid registrations matching all four keys.
    fn matching_valid_registrations(
        &self,
        folk_id: &FolkId,
        poll_code: &PollCode,
        center_id: PlaceId,
        voting_date: NaiveDate,
    ) -> RepoResult<Vec<RegistrationId>>;
    fn center_operating_periods(&self, center_id: PlaceId) -> RepoResult<Vec<OperatingPeriod>>;
    /// Inserts the ballot. A second ballot for the same `(folk, poll)`
    /// yields `RepoError::Conflict`.
    fn insert_ballot(&self, ballot: &NewBallot) -> RepoResult<Ballot>;
    fn get_ballot(&self, folk_id: &FolkId, poll_code: &PollCode) -> RepoResult<Option<Ballot>>;
    fn list_ballots(&self, poll_code: &PollCode) -> RepoResult<Vec<Ballot>>;
    fn tally(&self, poll_code: &PollCode) -> RepoResult<PollTally>;
}

/// SQLite-backed ballot repository.
pub struct SqliteBallotRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBallotRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

impl BallotRepository for SqliteBallotRepository<'_> {
    fn ballot_exists(&self, folk_id: &FolkId, poll_code: &PollCode) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM ballots
                WHERE folk_id = ?1
                  AND poll_code = ?2
            );",
            params![folk_id.as_str(), poll_code.as_str()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn find_poll(&self, poll_code: &PollCode) -> RepoResult<Option<Poll>> {
        load_poll(self.conn, poll_code)
    }

    fn matching_valid_registrations(
        &self,
        folk_id: &FolkId,
        poll_code: &PollCode,
        center_id: PlaceId,
        voting_date: NaiveDate,
    ) -> RepoResult<Vec<RegistrationId>> {
        let mut stmt = self.conn.prepare(
            "SELECT registration_id
             FROM registrations
             WHERE folk_id = ?1
               AND poll_code = ?2
               AND center_id = ?3
               AND voting_date = ?4
               AND is_valid = 1
             ORDER BY registration_id ASC;",
        )?;
        let mut rows = stmt.query(params![
            folk_id.as_str(),
            poll_code.as_str(),
            center_id,
            voting_date
        ])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(row.get(0)?);
        }
        Ok(ids)
    }

    fn center_operating_periods(&self, center_id: PlaceId) -> RepoResult<Vec<OperatingPeriod>> {
        load_center_periods(self.conn, center_id)
    }

    fn insert_ballot(&self, ballot: &NewBallot) -> RepoResult<Ballot> {
        let inserted = self.conn.execute(
            "INSERT INTO ballots (
                folk_id,
                poll_code,
                choice,
                cast_at,
                registration_id,
                receipt_uuid
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                ballot.folk_id.as_str(),
                ballot.poll_code.as_str(),
                ballot.choice.as_str(),
                ballot.cast_at,
                ballot.registration_id,
                ballot.receipt.to_string(),
            ],
        );

        match inserted {
            Ok(_) => Ok(Ballot {
                ballot_id: self.conn.last_insert_rowid(),
                folk_id: ballot.folk_id.clone(),
                poll_code: ballot.poll_code.clone(),
                choice: ballot.choice,
                cast_at: ballot.cast_at,
                registration_id: ballot.registration_id,
                receipt: ballot.receipt,
            }),
            Err(err) => match RepoError::from(err) {
                RepoError::Conflict(_) => Err(RepoError::Conflict(format!(
                    "ballot already cast for poll {}",
                    ballot.poll_code
                ))),
                other => Err(other),
            },
        }
    }

    fn get_ballot(&self, folk_id: &FolkId, poll_code: &PollCode) -> RepoResult<Option<Ballot>> {
        let mut stmt = self.conn.prepare(&format!(
            "{BALLOT_SELECT_SQL}
             WHERE folk_id = ?1
               AND poll_code = ?2;"
        ))?;
        let mut rows = stmt.query(params![folk_id.as_str(), poll_code.as_str()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_ballot_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_ballots(&self, poll_code: &PollCode) -> RepoResult<Vec<Ballot>> {
        let mut stmt = self.conn.prepare(&format!(
            "{BALLOT_SELECT_SQL}
             WHERE poll_code = ?1
             ORDER BY cast_at ASC, ballot_id ASC;"
        ))?;
        let mut rows = stmt.query([poll_code.as_str()])?;
        let mut ballots = Vec::new();
        while let Some(row) = rows.next()? {
            ballots.push(parse_ballot_row(row)?);
        }
        Ok(ballots)
    }

    fn tally(&self, poll_code: &PollCode) -> RepoResult<PollTally> {
        let mut stmt = self.conn.prepare(
            "SELECT choice, COUNT(*)
             FROM ballots
             WHERE poll_code = ?1
             GROUP BY choice;",
        )?;
        let mut rows = stmt.query([poll_code.as_str()])?;
        let mut tally = PollTally::default();
        while let Some(row) = rows.next()? {
            let choice: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            let choice = choice
                .parse::<VoteChoice>()
                .map_err(|err| invalid_column("ballots.choice", err))?;
            tally.add(choice, count.max(0) as u64);
        }
        Ok(tally)
    }
}

fn parse_ballot_row(row: &Row<'_>) -> RepoResult<Ballot> {
    let folk_id: String = row.get("folk_id")?;
    let poll_code: String = row.get("poll_code")?;
    let choice: String = row.get("choice")?;
    let receipt: String = row.get("receipt_uuid")?;

    Ok(Ballot {
        ballot_id: row.get("ballot_id")?,
        folk_id: decode_folk_id(&folk_id, "ballots.folk_id")?,
        poll_code: decode_poll_code(&poll_code, "ballots.poll_code")?,
        choice: choice
            .parse()
            .map_err(|err| invalid_column("ballots.choice", err))?,
        cast_at: row.get("cast_at")?,
        registration_id: row.get("registration_id")?,
        receipt: Uuid::parse_str(&receipt).map_err(|_| {
            RepoError::InvalidData(format!(
                "invalid uuid `{receipt}` in ballots.receipt_uuid"
            ))
        })?,
    })
}
