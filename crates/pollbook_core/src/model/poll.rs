//! Polls and voting center operating periods.
//!
//! # Invariants
//! - A poll accepts ballots during `[opens_at, closes_at)`.
//! - An operating period covers every calendar date from `starts_at` to
//!   `ends_at` inclusive, and on each of those dates accepts voters between
//!   the start and end time of day inclusive.
//! - Daily hours never wrap past midnight: the end time of day is not
//!   earlier than the start time of day.

use crate::model::error::ValidationError;
use crate::model::ids::{PlaceId, PollCode};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// One question put to the electorate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    pub code: PollCode,
    pub question: String,
    pub opens_at: NaiveDateTime,
    pub closes_at: NaiveDateTime,
}

impl Poll {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.question.trim().is_empty() {
            return Err(ValidationError::BlankField("question"));
        }
        if self.closes_at <= self.opens_at {
            return Err(ValidationError::InvalidPollWindow);
        }
        Ok(())
    }

    /// Returns whether `now` falls inside the half-open availability window.
    pub fn is_open_at(&self, now: NaiveDateTime) -> bool {
        self.opens_at <= now && now < self.closes_at
    }
}

/// Stable row id of an operating period.
pub type PeriodId = i64;

/// Interval during which a voting center accepts voters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatingPeriod {
    pub period_id: PeriodId,
    pub center_id: PlaceId,
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
}

impl OperatingPeriod {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_period_bounds(self.starts_at, self.ends_at)
    }

    pub fn first_date(&self) -> NaiveDate {
        self.starts_at.date()
    }

    pub fn last_date(&self) -> NaiveDate {
        self.ends_at.date()
    }

    pub fn covers_date(&self, date: NaiveDate) -> bool {
        self.first_date() <= date && date <= self.last_date()
    }

    pub fn covers_time_of_day(&self, time: NaiveTime) -> bool {
        self.starts_at.time() <= time && time <= self.ends_at.time()
    }
}

/// Shared bound check for new and edited periods.
pub fn validate_period_bounds(
    starts_at: NaiveDateTime,
    ends_at: NaiveDateTime,
) -> Result<(), ValidationError> {
    if ends_at < starts_at {
        return Err(ValidationError::InvalidOperatingPeriod);
    }
    // Daily hours are `[start time, end time]` on every covered date, so
    // they cannot wrap past midnight.
    if ends_at.time() < starts_at.time() {
        return Err(ValidationError::InvalidDailyHours);
    }
    Ok(())
}
