//! Field-level validation failures for domain values.

use crate::model::place::format_milli;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Rule violations detected while constructing or validating domain values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Folk identifiers are exactly 16 ASCII digits.
    InvalidFolkId(String),
    /// Poll codes are exactly 4 alphanumeric characters.
    InvalidPollCode(String),
    /// Center codes are exactly 4 alphanumeric characters.
    InvalidCenterCode(String),
    /// Coordinate text is not a decimal with at most three fraction digits.
    InvalidCoordinate(String),
    /// Coordinate axis value lies outside `[-1000, 1000]`.
    CoordinateOutOfRange { axis: char, milli: i64 },
    /// Unknown vote choice text.
    InvalidVoteChoice(String),
    /// Unknown staff role text.
    InvalidStaffRole(String),
    /// Required free-text field is blank.
    BlankField(&'static str),
    /// Poll window must close strictly after it opens.
    InvalidPollWindow,
    /// Operating period must not end before it starts.
    InvalidOperatingPeriod,
    /// Operating period closes each day before it opens.
    InvalidDailyHours,
    /// Voting date lies before the registration creation date.
    VotingDateInPast,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidFolkId(value) => {
                write!(f, "folk id must be 16 digits, got `{value}`")
            }
            Self::InvalidPollCode(value) => {
                write!(f, "poll code must be 4 alphanumeric characters, got `{value}`")
            }
            Self::InvalidCenterCode(value) => {
                write!(f, "center code must be 4 alphanumeric characters, got `{value}`")
            }
            Self::InvalidCoordinate(value) => write!(f, "invalid coordinate `{value}`"),
            Self::CoordinateOutOfRange { axis, milli } => write!(
                f,
                "coordinate {axis}={} is outside [-1000, 1000]",
                format_milli(*milli)
            ),
            Self::InvalidVoteChoice(value) => {
                write!(f, "vote choice must be YES|NO|ABSTAIN, got `{value}`")
            }
            Self::InvalidStaffRole(value) => {
                write!(f, "staff role must be clerk|monitor, got `{value}`")
            }
            Self::BlankField(field) => write!(f, "{field} must not be blank"),
            Self::InvalidPollWindow => write!(f, "poll must close after it opens"),
            Self::InvalidOperatingPeriod => {
                write!(f, "operating period must not end before it starts")
            }
            Self::InvalidDailyHours => {
                write!(f, "operating period daily end time must not precede its start time")
            }
            Self::VotingDateInPast => {
                write!(f, "voting date must not precede the registration date")
            }
        }
    }
}

impl Error for ValidationError {}
