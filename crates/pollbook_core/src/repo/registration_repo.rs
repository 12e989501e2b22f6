//! Registration persistence.
//!
//! # Invariants
//! - Rows are insert-only; there is no update path for a registration.
//! - `is_valid` is written exactly once, by the caller that computed it.

use crate::model::ids::{FolkId, PlaceId, PollCode};
use crate::model::registration::{NewRegistration, Registration, RegistrationId};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::{bool_to_int, decode_folk_id, decode_poll_code, ensure_schema_ready, int_to_bool};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};

pub(crate) const REGISTRATION_SELECT_SQL: &str = "SELECT
    registration_id,
    folk_id,
    poll_code,
    center_id,
    voting_date,
    created_at,
    is_valid
FROM registrations";

/// Repository interface for registrations.
pub trait RegistrationRepository {
    fn insert_registration(&self, registration: &NewRegistration) -> RepoResult<Registration>;
    fn get_registration(&self, registration_id: RegistrationId)
        -> RepoResult<Option<Registration>>;
    /// All registrations of one folk, oldest voting date first.
    fn list_for_folk(&self, folk_id: &FolkId) -> RepoResult<Vec<Registration>>;
    /// Registrations at one center for one voting date.
    fn list_for_center_date(
        &self,
        center_id: PlaceId,
        voting_date: NaiveDate,
    ) -> RepoResult<Vec<Registration>>;
    /// Registrations of one poll across all centers.
    fn list_for_poll(&self, poll_code: &PollCode) -> RepoResult<Vec<Registration>>;
}

/// SQLite-backed registration repository.
pub struct SqliteRegistrationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRegistrationRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }

    fn query_many(
        &self,
        filter: &str,
        params: impl rusqlite::Params,
    ) -> RepoResult<Vec<Registration>> {
        let mut stmt = self.conn.prepare(&format!(
            "{REGISTRATION_SELECT_SQL}
             WHERE {filter}
             ORDER BY voting_date ASC, registration_id ASC;"
        ))?;
        let mut rows = stmt.query(params)?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_registration_row(row)?);
        }
        Ok(items)
    }
}

impl RegistrationRepository for SqliteRegistrationRepository<'_> {
    fn insert_registration(&self, registration: &NewRegistration) -> RepoResult<Registration> {
        self.conn.execute(
            "INSERT INTO registrations (
                folk_id,
                poll_code,
                center_id,
                voting_date,
                created_at,
                is_valid
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                registration.folk_id.as_str(),
                registration.poll_code.as_str(),
                registration.center_id,
                registration.voting_date,
                registration.created_at,
                bool_to_int(registration.is_valid),
            ],
        )?;

        Ok(Registration {
            registration_id: self.conn.last_insert_rowid(),
            folk_id: registration.folk_id.clone(),
            poll_code: registration.poll_code.clone(),
            center_id: registration.center_id,
            voting_date: registration.voting_date,
            created_at: registration.created_at,
            is_valid: registration.is_valid,
        })
    }

    fn get_registration(
        &self,
        registration_id: RegistrationId,
    ) -> RepoResult<Option<Registration>> {
        let mut items = self.query_many("registration_id = ?1", [registration_id])?;
        Ok(items.pop())
    }

    fn list_for_folk(&self, folk_id: &FolkId) -> RepoResult<Vec<Registration>> {
        self.query_many("folk_id = ?1", [folk_id.as_str()])
    }

    fn list_for_center_date(
        &self,
        center_id: PlaceId,
        voting_date: NaiveDate,
    ) -> RepoResult<Vec<Registration>> {
        self.query_many(
            "center_id = ?1 AND voting_date = ?2",
            params![center_id, voting_date],
        )
    }

    fn list_for_poll(&self, poll_code: &PollCode) -> RepoResult<Vec<Registration>> {
        self.query_many("poll_code = ?1", [poll_code.as_str()])
    }
}

pub(crate) fn parse_registration_row(row: &Row<'_>) -> RepoResult<Registration> {
    let folk_id: String = row.get("folk_id")?;
    let poll_code: String = row.get("poll_code")?;
    let registration = Registration {
        registration_id: row.get("registration_id")?,
        folk_id: decode_folk_id(&folk_id, "registrations.folk_id")?,
        poll_code: decode_poll_code(&poll_code, "registrations.poll_code")?,
        center_id: row.get("center_id")?,
        voting_date: row.get("voting_date")?,
        created_at: row.get("created_at")?,
        is_valid: int_to_bool(row.get("is_valid")?, "registrations.is_valid")?,
    };
    if registration.voting_date < registration.created_at.date() {
        return Err(RepoError::InvalidData(format!(
            "registration {} has voting date before its creation date",
            registration.registration_id
        )));
    }
    Ok(registration)
}
