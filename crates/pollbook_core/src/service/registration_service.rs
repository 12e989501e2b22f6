//! Registration creation and validity stamping.
//!
//! # Responsibility
//! - Create registrations for a (folk, poll, center, date) tuple.
//! - Stamp each new registration with whether an operating period of its
//!   center covers the voting date.
//!
//! # Invariants
//! - Registrations without a covering period are stored as invalid, not
//!   rejected.
//! - Validity is computed inside the same transaction as the insert, so a
//!   concurrent period edit cannot slip between the check and the write.
//! - `voting_date` must not precede the creation date.

use crate::clock::Clock;
use crate::model::error::ValidationError;
use crate::model::ids::{FolkId, PlaceId, PollCode};
use crate::model::poll::OperatingPeriod;
use crate::model::registration::{NewRegistration, Registration};
use crate::repo::error::RepoError;
use crate::repo::folk_repo::{FolkRepository, SqliteFolkRepository};
use crate::repo::place_repo::{PlaceRepository, SqlitePlaceRepository};
use crate::repo::poll_repo::{PollRepository, SqlitePollRepository};
use crate::repo::registration_repo::{RegistrationRepository, SqliteRegistrationRepository};
use chrono::{NaiveDate, NaiveDateTime};
use log::{info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Returns whether any period covers `voting_date`.
///
/// Callers pass the periods of the registration's own center.
pub fn registration_validity(periods: &[OperatingPeriod], voting_date: NaiveDate) -> bool {
    periods.iter().any(|period| period.covers_date(voting_date))
}

/// Input of a registration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRequest {
    pub folk_id: FolkId,
    pub poll_code: PollCode,
    pub center_id: PlaceId,
    pub voting_date: NaiveDate,
}

/// Errors from registration creation.
#[derive(Debug)]
pub enum RegistrationError {
    Validation(ValidationError),
    UnknownFolk(FolkId),
    UnknownPoll(PollCode),
    UnknownCenter(PlaceId),
    /// The same (folk, poll, center, date) is already registered.
    Duplicate,
    Repo(RepoError),
}

impl Display for RegistrationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::UnknownFolk(id) => write!(f, "folk not found: {}", id.masked()),
            Self::UnknownPoll(code) => write!(f, "poll not found: {code}"),
            Self::UnknownCenter(id) => write!(f, "voting center not found: {id}"),
            Self::Duplicate => write!(f, "registration already exists"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RegistrationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for RegistrationError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Conflict(_) => Self::Duplicate,
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<rusqlite::Error> for RegistrationError {
    fn from(value: rusqlite::Error) -> Self {
        Self::from(RepoError::from(value))
    }
}

/// Use-case service that creates registrations.
pub struct RegistrationService<'conn, C: Clock> {
    conn: &'conn Connection,
    clock: C,
}

impl<'conn, C: Clock> RegistrationService<'conn, C> {
    pub fn new(conn: &'conn Connection, clock: C) -> Self {
        Self { conn, clock }
    }

    /// Creates one registration and returns the stored row.
    ///
    /// # Errors
    /// - `Validation(VotingDateInPast)` when the voting date precedes today.
    /// - `UnknownFolk`, `UnknownPoll`, `UnknownCenter` for dangling keys.
    /// - `Duplicate` when the exact tuple is already registered.
    pub fn register(
        &self,
        request: &RegistrationRequest,
    ) -> Result<Registration, RegistrationError> {
        let created_at = self.clock.now();
        if request.voting_date < created_at.date() {
            return Err(RegistrationError::Validation(
                ValidationError::VotingDateInPast,
            ));
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let registration = Self::register_in(&tx, request, created_at)?;
        tx.commit()?;

        if registration.is_valid {
            info!(
                "event=registration_create module=registration status=ok registration_id={} folk={} poll={} center_id={} valid=true",
                registration.registration_id,
                registration.folk_id.masked(),
                registration.poll_code,
                registration.center_id
            );
        } else {
            warn!(
                "event=registration_create module=registration status=ok registration_id={} folk={} poll={} center_id={} valid=false reason=no_covering_period",
                registration.registration_id,
                registration.folk_id.masked(),
                registration.poll_code,
                registration.center_id
            );
        }
        Ok(registration)
    }

    fn register_in(
        tx: &Transaction<'_>,
        request: &RegistrationRequest,
        created_at: NaiveDateTime,
    ) -> Result<Registration, RegistrationError> {
        if SqliteFolkRepository::try_new(tx)?
            .get_folk(&request.folk_id)?
            .is_none()
        {
            return Err(RegistrationError::UnknownFolk(request.folk_id.clone()));
        }
        if SqlitePollRepository::try_new(tx)?
            .get_poll(&request.poll_code)?
            .is_none()
        {
            return Err(RegistrationError::UnknownPoll(request.poll_code.clone()));
        }

        let places = SqlitePlaceRepository::try_new(tx)?;
        if places.get_center(request.center_id)?.is_none() {
            return Err(RegistrationError::UnknownCenter(request.center_id));
        }
        let periods = places.list_operating_periods(request.center_id)?;
        let is_valid = registration_validity(&periods, request.voting_date);

        let registration = SqliteRegistrationRepository::try_new(tx)?.insert_registration(
            &NewRegistration {
                folk_id: request.folk_id.clone(),
                poll_code: request.poll_code.clone(),
                center_id: request.center_id,
                voting_date: request.voting_date,
                created_at,
                is_valid,
            },
        )?;
        Ok(registration)
    }
}
