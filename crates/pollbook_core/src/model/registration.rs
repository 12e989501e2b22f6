//! Registration: a folk's commitment to vote on one poll at one center and date.
//!
//! # Invariants
//! - Unique on `(folk_id, poll_code, center_id, voting_date)`.
//! - `voting_date >= created_at.date()`.
//! - `is_valid` is computed once when the registration is created and is
//!   never recomputed afterwards.

use crate::model::ids::{FolkId, PlaceId, PollCode};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Stable row id of a registration.
pub type RegistrationId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub registration_id: RegistrationId,
    pub folk_id: FolkId,
    pub poll_code: PollCode,
    pub center_id: PlaceId,
    pub voting_date: NaiveDate,
    pub created_at: NaiveDateTime,
    pub is_valid: bool,
}

/// Registration fields prior to persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRegistration {
    pub folk_id: FolkId,
    pub poll_code: PollCode,
    pub center_id: PlaceId,
    pub voting_date: NaiveDate,
    pub created_at: NaiveDateTime,
    pub is_valid: bool,
}
