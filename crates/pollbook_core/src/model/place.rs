//! Places: residences and voting centers.
//!
//! # Responsibility
//! - Model the closed `Residence | VotingCenter` specialization of a place.
//! - Hold fixed-point coordinates used by nearest-center resolution.
//!
//! # Invariants
//! - A place is exactly one kind; there is no place that is both.
//! - Each coordinate axis lies within `[-1000, 1000]` with three fraction
//!   digits of precision.

use crate::model::error::ValidationError;
use crate::model::ids::{CenterCode, PlaceId};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Bound of each coordinate axis, in thousandths.
pub const COORDINATE_LIMIT_MILLI: i64 = 1_000_000;

static DECIMAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(-?)([0-9]{1,4})(?:\.([0-9]{1,3}))?$").expect("valid decimal regex")
});

/// Planar coordinate stored as thousandths of a unit on each axis.
///
/// Integer storage keeps distance comparisons exact, so ties between
/// equidistant centers are real ties rather than float noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    x_milli: i64,
    y_milli: i64,
}

/// Unchecked wire shape; only reachable through `Coordinate::from_milli`.
#[derive(Deserialize)]
struct RawCoordinate {
    x_milli: i64,
    y_milli: i64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = ValidationError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Self::from_milli(raw.x_milli, raw.y_milli)
    }
}

impl Coordinate {
    pub fn from_milli(x_milli: i64, y_milli: i64) -> Result<Self, ValidationError> {
        check_axis('x', x_milli)?;
        check_axis('y', y_milli)?;
        Ok(Self { x_milli, y_milli })
    }

    /// Parses decimal text such as `"-12.5"` for each axis.
    pub fn from_decimal_str(x: &str, y: &str) -> Result<Self, ValidationError> {
        Self::from_milli(parse_milli(x)?, parse_milli(y)?)
    }

    pub fn x_milli(&self) -> i64 {
        self.x_milli
    }

    pub fn y_milli(&self) -> i64 {
        self.y_milli
    }

    /// Exact squared Euclidean distance in square thousandths.
    pub fn distance_squared_milli(&self, other: &Coordinate) -> i64 {
        let dx = self.x_milli - other.x_milli;
        let dy = self.y_milli - other.y_milli;
        dx * dx + dy * dy
    }

    /// Euclidean distance in whole units, for display.
    pub fn distance(&self, other: &Coordinate) -> f64 {
        (self.distance_squared_milli(other) as f64).sqrt() / 1000.0
    }
}

fn check_axis(axis: char, milli: i64) -> Result<(), ValidationError> {
    if !(-COORDINATE_LIMIT_MILLI..=COORDINATE_LIMIT_MILLI).contains(&milli) {
        return Err(ValidationError::CoordinateOutOfRange { axis, milli });
    }
    Ok(())
}

fn parse_milli(value: &str) -> Result<i64, ValidationError> {
    let trimmed = value.trim();
    let caps = DECIMAL_RE
        .captures(trimmed)
        .ok_or_else(|| ValidationError::InvalidCoordinate(value.to_string()))?;

    let whole: i64 = caps[2]
        .parse()
        .map_err(|_| ValidationError::InvalidCoordinate(value.to_string()))?;
    let fraction = match caps.get(3) {
        Some(digits) => {
            let text = format!("{:0<3}", digits.as_str());
            text.parse::<i64>()
                .map_err(|_| ValidationError::InvalidCoordinate(value.to_string()))?
        }
        None => 0,
    };

    let magnitude = whole * 1000 + fraction;
    Ok(if &caps[1] == "-" { -magnitude } else { magnitude })
}

/// Renders a thousandths value as decimal text, e.g. `-0.500`.
pub fn format_milli(milli: i64) -> String {
    let sign = if milli < 0 { "-" } else { "" };
    let abs = milli.unsigned_abs();
    format!("{sign}{}.{:03}", abs / 1000, abs % 1000)
}

/// Postal address shared by every place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zipcode: String,
}

impl Address {
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("street", &self.street),
            ("city", &self.city),
            ("state", &self.state),
            ("zipcode", &self.zipcode),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::BlankField(field));
            }
        }
        Ok(())
    }
}

/// Closed specialization of a place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlaceKind {
    Residence,
    VotingCenter { code: CenterCode },
}

/// Persisted place with its specialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Place {
    pub place_id: PlaceId,
    pub address: Address,
    pub coordinate: Coordinate,
    pub kind: PlaceKind,
}

/// Voting center read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingCenter {
    pub place_id: PlaceId,
    pub code: CenterCode,
    pub address: Address,
    pub coordinate: Coordinate,
}

impl From<VotingCenter> for Place {
    fn from(value: VotingCenter) -> Self {
        Self {
            place_id: value.place_id,
            address: value.address,
            coordinate: value.coordinate,
            kind: PlaceKind::VotingCenter { code: value.code },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{format_milli, Coordinate};
    use crate::model::error::ValidationError;

    #[test]
    fn decimal_text_parses_to_thousandths() {
        let c = Coordinate::from_decimal_str("-12.5", "999.999").unwrap();
        assert_eq!(c.x_milli(), -12_500);
        assert_eq!(c.y_milli(), 999_999);
    }

    #[test]
    fn coordinates_outside_bound_are_rejected() {
        let err = Coordinate::from_decimal_str("1000.001", "0").unwrap_err();
        assert!(matches!(
            err,
            ValidationError::CoordinateOutOfRange { axis: 'x', .. }
        ));
        assert!(Coordinate::from_decimal_str("-1000", "1000").is_ok());
        assert!(Coordinate::from_decimal_str("1.2345", "0").is_err());
    }

    #[test]
    fn squared_distance_is_exact() {
        let a = Coordinate::from_milli(0, 0).unwrap();
        let b = Coordinate::from_milli(3_000, 4_000).unwrap();
        assert_eq!(a.distance_squared_milli(&b), 25_000_000);
        assert!((a.distance(&b) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn deserialization_enforces_axis_bound() {
        let err = serde_json::from_str::<Coordinate>(r#"{"x_milli":5000000,"y_milli":0}"#)
            .unwrap_err();
        assert!(err.to_string().contains("outside [-1000, 1000]"));
        assert!(
            serde_json::from_str::<Coordinate>(&format!(r#"{{"x_milli":{},"y_milli":0}}"#, i64::MAX))
                .is_err()
        );

        let edge: Coordinate =
            serde_json::from_str(r#"{"x_milli":-1000000,"y_milli":1000000}"#).unwrap();
        assert_eq!(edge, Coordinate::from_milli(-1_000_000, 1_000_000).unwrap());
        assert_eq!(serde_json::to_string(&edge).unwrap(), r#"{"x_milli":-1000000,"y_milli":1000000}"#);
    }

    #[test]
    fn format_milli_keeps_sign_for_small_values() {
        assert_eq!(format_milli(-500), "-0.500");
        assert_eq!(format_milli(12_050), "12.050");
    }
}
