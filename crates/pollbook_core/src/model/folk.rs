//! Folk (people), the optional staff specialization and staff shifts.

use crate::model::error::ValidationError;
use crate::model::ids::{FolkId, PlaceId};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// One person. Every folk lives at exactly one residence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folk {
    pub folk_id: FolkId,
    pub first_name: String,
    pub last_name: String,
    /// Place id of a residence.
    pub residence_id: PlaceId,
}

impl Folk {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.first_name.trim().is_empty() {
            return Err(ValidationError::BlankField("first_name"));
        }
        if self.last_name.trim().is_empty() {
            return Err(ValidationError::BlankField("last_name"));
        }
        Ok(())
    }
}

/// Closed set of staff roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Clerk,
    Monitor,
}

impl StaffRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Clerk => "clerk",
            Self::Monitor => "monitor",
        }
    }
}

impl FromStr for StaffRole {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clerk" => Ok(Self::Clerk),
            "monitor" => Ok(Self::Monitor),
            _ => Err(ValidationError::InvalidStaffRole(s.to_string())),
        }
    }
}

impl Display for StaffRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Staff specialization of a folk record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staff {
    pub folk_id: FolkId,
    pub role: StaffRole,
}

/// One shift assignment of a staff member at a voting center.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffSchedule {
    pub staff_id: FolkId,
    pub center_id: PlaceId,
    pub shift_start: NaiveDateTime,
}
