//! Ballot-casting orchestrator.
//!
//! # Responsibility
//! - Validate and commit one ballot as a single all-or-nothing unit.
//! - Fold every outcome, including store failures, into an immutable
//!   [`CastOutcome`] carrying a stable result code.
//!
//! # Invariants
//! - Phases run in a fixed order and the first failing phase decides the
//!   code. Every phase before the insert is read-only.
//! - The transaction commits only when the insert succeeded.
//! - A uniqueness conflict at insert time is a duplicate ballot (code 1),
//!   never a system error.
//! - The orchestrator performs no retries.
//!
//! | Code | Meaning |
//! |---|---|
//! | 0 | ballot recorded |
//! | 1 | duplicate ballot |
//! | 2 | unknown poll |
//! | 3 | poll not open |
//! | 4 | no matching registration |
//! | 5 | ambiguous registration |
//! | 6 | center not currently operating |
//! | -1 | system error |

use crate::clock::Clock;
use crate::model::ballot::{Ballot, NewBallot, VoteChoice};
use crate::model::ids::{FolkId, PlaceId, PollCode};
use crate::repo::ballot_repo::{BallotRepository, SqliteBallotRepository};
use crate::repo::error::RepoError;
use chrono::{NaiveDate, NaiveDateTime};
use log::{error, info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

const SYSTEM_ERROR_MESSAGE: &str = "system error: the ballot was not recorded, try again later";

/// Input of one cast attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CastRequest {
    pub folk_id: FolkId,
    pub poll_code: PollCode,
    pub choice: VoteChoice,
    /// Center the voter is physically at.
    pub center_id: PlaceId,
    pub voting_date: NaiveDate,
}

/// Closed set of cast results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CastKind {
    Success,
    DuplicateBallot,
    UnknownPoll,
    PollNotOpen,
    NoMatchingRegistration,
    AmbiguousRegistration,
    CenterNotOperating,
    SystemError,
}

impl CastKind {
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::DuplicateBallot => 1,
            Self::UnknownPoll => 2,
            Self::PollNotOpen => 3,
            Self::NoMatchingRegistration => 4,
            Self::AmbiguousRegistration => 5,
            Self::CenterNotOperating => 6,
            Self::SystemError => -1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::DuplicateBallot => "duplicate_ballot",
            Self::UnknownPoll => "unknown_poll",
            Self::PollNotOpen => "poll_not_open",
            Self::NoMatchingRegistration => "no_matching_registration",
            Self::AmbiguousRegistration => "ambiguous_registration",
            Self::CenterNotOperating => "center_not_operating",
            Self::SystemError => "system_error",
        }
    }
}

/// Why a cast did not produce a ballot.
#[derive(Debug)]
pub enum CastRejection {
    DuplicateBallot,
    UnknownPoll,
    PollNotOpen,
    NoMatchingRegistration,
    AmbiguousRegistration { matches: usize },
    CenterNotOperating,
    System(RepoError),
}

impl CastRejection {
    pub fn kind(&self) -> CastKind {
        match self {
            Self::DuplicateBallot => CastKind::DuplicateBallot,
            Self::UnknownPoll => CastKind::UnknownPoll,
            Self::PollNotOpen => CastKind::PollNotOpen,
            Self::NoMatchingRegistration => CastKind::NoMatchingRegistration,
            Self::AmbiguousRegistration { .. } => CastKind::AmbiguousRegistration,
            Self::CenterNotOperating => CastKind::CenterNotOperating,
            Self::System(_) => CastKind::SystemError,
        }
    }
}

impl Display for CastRejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateBallot => write!(f, "duplicate ballot"),
            Self::UnknownPoll => write!(f, "unknown poll"),
            Self::PollNotOpen => write!(f, "poll not open"),
            Self::NoMatchingRegistration => write!(f, "no matching registration"),
            Self::AmbiguousRegistration { matches } => {
                write!(f, "ambiguous registration ({matches} matches)")
            }
            Self::CenterNotOperating => write!(f, "center not currently operating"),
            Self::System(err) => write!(f, "{err}"),
        }
    }
}

impl From<RepoError> for CastRejection {
    fn from(value: RepoError) -> Self {
        Self::System(value)
    }
}

/// Immutable result of one cast attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CastOutcome {
    kind: CastKind,
    message: String,
    receipt: Option<Uuid>,
}

impl CastOutcome {
    fn success(ballot: &Ballot) -> Self {
        Self {
            kind: CastKind::Success,
            message: format!(
                "ballot recorded: poll {} choice {}",
                ballot.poll_code, ballot.choice
            ),
            receipt: Some(ballot.receipt),
        }
    }

    fn rejected(rejection: &CastRejection, request: &CastRequest) -> Self {
        let message = match rejection {
            CastRejection::DuplicateBallot => {
                format!("duplicate ballot: a ballot for poll {} was already cast", request.poll_code)
            }
            CastRejection::UnknownPoll => format!("unknown poll: {}", request.poll_code),
            CastRejection::PollNotOpen => {
                format!("poll not open: {} is outside its availability window", request.poll_code)
            }
            CastRejection::NoMatchingRegistration => format!(
                "no matching registration for poll {} at center {} on {}",
                request.poll_code, request.center_id, request.voting_date
            ),
            CastRejection::AmbiguousRegistration { matches } => format!(
                "ambiguous registration: {matches} valid registrations match poll {} at center {} on {}",
                request.poll_code, request.center_id, request.voting_date
            ),
            CastRejection::CenterNotOperating => format!(
                "center not operating: center {} is closed at this time",
                request.center_id
            ),
            CastRejection::System(_) => SYSTEM_ERROR_MESSAGE.to_string(),
        };
        Self {
            kind: rejection.kind(),
            message,
            receipt: None,
        }
    }

    /// Stable result code, `0` on success.
    pub fn code(&self) -> i32 {
        self.kind.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> CastKind {
        self.kind
    }

    pub fn is_success(&self) -> bool {
        self.kind == CastKind::Success
    }

    /// Receipt id of the recorded ballot.
    pub fn receipt(&self) -> Option<Uuid> {
        self.receipt
    }
}

impl Display for CastOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\t{}", self.code(), self.message)
    }
}

/// Runs cast phases 1 through 6 against `store`.
///
/// The caller owns the transaction: it commits on `Ok` and rolls back on
/// `Err`.
pub fn run_cast_phases<S: BallotRepository + ?Sized>(
    store: &S,
    request: &CastRequest,
    now: NaiveDateTime,
    receipt: Uuid,
) -> Result<Ballot, CastRejection> {
    if store.ballot_exists(&request.folk_id, &request.poll_code)? {
        return Err(CastRejection::DuplicateBallot);
    }

    let poll = store
        .find_poll(&request.poll_code)?
        .ok_or(CastRejection::UnknownPoll)?;

    if !poll.is_open_at(now) {
        return Err(CastRejection::PollNotOpen);
    }

    let matches = store.matching_valid_registrations(
        &request.folk_id,
        &request.poll_code,
        request.center_id,
        request.voting_date,
    )?;
    let registration_id = match matches.as_slice() {
        [] => return Err(CastRejection::NoMatchingRegistration),
        [only] => *only,
        many => {
            return Err(CastRejection::AmbiguousRegistration {
                matches: many.len(),
            })
        }
    };

    let operating = store
        .center_operating_periods(request.center_id)?
        .iter()
        .any(|period| {
            period.covers_date(request.voting_date) && period.covers_time_of_day(now.time())
        });
    if !operating {
        return Err(CastRejection::CenterNotOperating);
    }

    store
        .insert_ballot(&NewBallot {
            folk_id: request.folk_id.clone(),
            poll_code: request.poll_code.clone(),
            choice: request.choice,
            cast_at: now,
            registration_id,
            receipt,
        })
        .map_err(|err| match err {
            RepoError::Conflict(_) => CastRejection::DuplicateBallot,
            other => CastRejection::System(other),
        })
}

/// Use-case service that casts ballots over one connection.
pub struct BallotService<'conn, C: Clock> {
    conn: &'conn Connection,
    clock: C,
}

impl<'conn, C: Clock> BallotService<'conn, C> {
    pub fn new(conn: &'conn Connection, clock: C) -> Self {
        Self { conn, clock }
    }

    /// Casts one ballot; never returns an error, see [`CastOutcome::code`].
    pub fn cast(&self, request: &CastRequest) -> CastOutcome {
        let started_at = Instant::now();
        let outcome = match self.cast_in_transaction(request) {
            Ok(ballot) => CastOutcome::success(&ballot),
            Err(rejection) => {
                if let CastRejection::System(err) = &rejection {
                    error!(
                        "event=ballot_cast module=ballot status=error folk={} poll={} error={}",
                        request.folk_id.masked(),
                        request.poll_code,
                        err
                    );
                }
                CastOutcome::rejected(&rejection, request)
            }
        };

        let duration_ms = started_at.elapsed().as_millis();
        match outcome.kind() {
            CastKind::Success => info!(
                "event=ballot_cast module=ballot status=ok folk={} poll={} center_id={} code=0 duration_ms={}",
                request.folk_id.masked(),
                request.poll_code,
                request.center_id,
                duration_ms
            ),
            CastKind::SystemError => {}
            kind => warn!(
                "event=ballot_cast module=ballot status=rejected folk={} poll={} center_id={} code={} reason={} duration_ms={}",
                request.folk_id.masked(),
                request.poll_code,
                request.center_id,
                kind.code(),
                kind.as_str(),
                duration_ms
            ),
        }
        outcome
    }

    fn cast_in_transaction(&self, request: &CastRequest) -> Result<Ballot, CastRejection> {
        // IMMEDIATE takes the write lock up front; phases 1-6 see no
        // concurrent writer.
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(RepoError::from)?;
        let now = self.clock.now();
        let store = SqliteBallotRepository::try_new(&tx)?;
        let ballot = run_cast_phases(&store, request, now, Uuid::new_v4())?;
        tx.commit().map_err(|err| match RepoError::from(err) {
            RepoError::Conflict(_) => CastRejection::DuplicateBallot,
            other => CastRejection::System(other),
        })?;
        Ok(ballot)
    }
}
