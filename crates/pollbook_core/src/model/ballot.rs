//! Ballot domain model.
//!
//! # Invariants
//! - At most one ballot exists per `(folk_id, poll_code)`.
//! - A ballot references the registration it was cast under, and that
//!   registration belongs to the same folk and poll.
//! - Ballots are never updated or deleted by core.

use crate::model::error::ValidationError;
use crate::model::ids::{FolkId, PollCode};
use crate::model::registration::RegistrationId;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Closed set of answers a voter may give.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VoteChoice {
    Yes,
    No,
    Abstain,
}

impl VoteChoice {
    pub const ALL: [VoteChoice; 3] = [VoteChoice::Yes, VoteChoice::No, VoteChoice::Abstain];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yes => "YES",
            Self::No => "NO",
            Self::Abstain => "ABSTAIN",
        }
    }
}

impl FromStr for VoteChoice {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "YES" => Ok(Self::Yes),
            "NO" => Ok(Self::No),
            "ABSTAIN" => Ok(Self::Abstain),
            _ => Err(ValidationError::InvalidVoteChoice(s.to_string())),
        }
    }
}

impl Display for VoteChoice {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable row id of a ballot.
pub type BallotId = i64;

/// The single final vote of one folk on one poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    pub ballot_id: BallotId,
    pub folk_id: FolkId,
    pub poll_code: PollCode,
    pub choice: VoteChoice,
    pub cast_at: NaiveDateTime,
    pub registration_id: RegistrationId,
    /// Opaque receipt handed back to the voter.
    pub receipt: Uuid,
}

/// Ballot fields prior to persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBallot {
    pub folk_id: FolkId,
    pub poll_code: PollCode,
    pub choice: VoteChoice,
    pub cast_at: NaiveDateTime,
    pub registration_id: RegistrationId,
    pub receipt: Uuid,
}

/// Per-choice ballot counts for one poll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollTally {
    pub yes: u64,
    pub no: u64,
    pub abstain: u64,
}

impl PollTally {
    pub fn add(&mut self, choice: VoteChoice, count: u64) {
        match choice {
            VoteChoice::Yes => self.yes += count,
            VoteChoice::No => self.no += count,
            VoteChoice::Abstain => self.abstain += count,
        }
    }

    pub fn count(&self, choice: VoteChoice) -> u64 {
        match choice {
            VoteChoice::Yes => self.yes,
            VoteChoice::No => self.no,
            VoteChoice::Abstain => self.abstain,
        }
    }

    pub fn total(&self) -> u64 {
        VoteChoice::ALL.iter().map(|choice| self.count(*choice)).sum()
    }

    /// `(choice, count)` pairs in `YES, NO, ABSTAIN` order.
    pub fn entries(&self) -> impl Iterator<Item = (VoteChoice, u64)> + '_ {
        VoteChoice::ALL
            .into_iter()
            .map(move |choice| (choice, self.count(choice)))
    }
}
