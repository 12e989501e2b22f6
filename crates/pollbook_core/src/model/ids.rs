//! Validated identifiers for folk, polls and voting centers.
//!
//! # Invariants
//! - `FolkId` is exactly 16 ASCII digits.
//! - `PollCode` and `CenterCode` are exactly 4 ASCII alphanumerics, stored
//!   uppercase.

use crate::model::error::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

static FOLK_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{16}$").expect("valid folk id regex"));
static SHORT_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9]{4}$").expect("valid short code regex"));

/// Row id of a `places` record. Residences and voting centers share this space.
pub type PlaceId = i64;

/// Personal identifier of one folk record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FolkId(String);

impl FolkId {
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let trimmed = value.trim();
        if !FOLK_ID_RE.is_match(trimmed) {
            return Err(ValidationError::InvalidFolkId(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Log-safe rendering that keeps only the last four digits.
    pub fn masked(&self) -> String {
        let visible = &self.0[self.0.len() - 4..];
        format!("{}{visible}", "*".repeat(self.0.len() - 4))
    }
}

/// Four-character poll code, e.g. `POL4`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PollCode(String);

impl PollCode {
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        normalize_short_code(value)
            .map(Self)
            .ok_or_else(|| ValidationError::InvalidPollCode(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Four-character voting center code, unique across centers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CenterCode(String);

impl CenterCode {
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        normalize_short_code(value)
            .map(Self)
            .ok_or_else(|| ValidationError::InvalidCenterCode(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn normalize_short_code(value: &str) -> Option<String> {
    let normalized = value.trim().to_ascii_uppercase();
    SHORT_CODE_RE.is_match(&normalized).then_some(normalized)
}

macro_rules! string_id_impls {
    ($ty:ident) => {
        impl Display for $ty {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $ty {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $ty {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(&value)
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.0
            }
        }
    };
}

string_id_impls!(FolkId);
string_id_impls!(PollCode);
string_id_impls!(CenterCode);
