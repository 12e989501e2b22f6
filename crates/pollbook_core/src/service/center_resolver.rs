//! Nearest operating voting center resolution.
//!
//! # Responsibility
//! - Find the voting center closest to a folk's residence among centers
//!   operating on a target date.
//! - Report whether an existing registration chose that optimal center.
//!
//! # Invariants
//! - Resolution is read-only and deterministic: ties on distance are broken
//!   by the lexicographically smallest center code.
//! - Distances compare exactly on integer squared thousandths.
//! - A non-optimal registration is reported, never corrected.

use crate::model::ids::{CenterCode, FolkId, PlaceId};
use crate::model::place::{Coordinate, VotingCenter};
use crate::model::poll::OperatingPeriod;
use crate::model::registration::RegistrationId;
use crate::repo::error::RepoError;
use crate::repo::folk_repo::{FolkRepository, SqliteFolkRepository};
use crate::repo::place_repo::{PlaceRepository, SqlitePlaceRepository};
use crate::repo::registration_repo::{RegistrationRepository, SqliteRegistrationRepository};
use chrono::NaiveDate;
use log::debug;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::Serialize;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One eligible center and its distance from a residence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CenterDistance {
    pub center_id: PlaceId,
    pub code: CenterCode,
    pub distance_squared_milli: i64,
}

impl CenterDistance {
    /// Euclidean distance in coordinate units.
    pub fn distance(&self) -> f64 {
        (self.distance_squared_milli as f64).sqrt() / 1000.0
    }
}

/// Outcome of comparing a registration's center with the optimal one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CenterCheck {
    /// The chosen center is at the minimal distance.
    Optimal { chosen: CenterCode },
    /// A strictly closer center operates on the voting date.
    Suboptimal {
        chosen: CenterCode,
        closest: CenterCode,
    },
    /// No center operates on the voting date.
    NoEligibleCenter,
}

/// Errors from center resolution.
#[derive(Debug)]
pub enum ResolveError {
    UnknownFolk(FolkId),
    UnknownRegistration(RegistrationId),
    Repo(RepoError),
}

impl Display for ResolveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownFolk(id) => write!(f, "folk not found: {}", id.masked()),
            Self::UnknownRegistration(id) => write!(f, "registration not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ResolveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ResolveError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<rusqlite::Error> for ResolveError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(RepoError::from(value))
    }
}

/// Orders the centers with a period covering `date` by distance from `home`,
/// then by code.
pub fn rank_eligible_centers(
    home: &Coordinate,
    centers: &[VotingCenter],
    covering_periods: &[OperatingPeriod],
    date: NaiveDate,
) -> Vec<CenterDistance> {
    let operating: BTreeSet<PlaceId> = covering_periods
        .iter()
        .filter(|period| period.covers_date(date))
        .map(|period| period.center_id)
        .collect();

    let mut ranked: Vec<CenterDistance> = centers
        .iter()
        .filter(|center| operating.contains(&center.place_id))
        .map(|center| CenterDistance {
            center_id: center.place_id,
            code: center.code.clone(),
            distance_squared_milli: home.distance_squared_milli(&center.coordinate),
        })
        .collect();
    ranked.sort_by(|a, b| {
        a.distance_squared_milli
            .cmp(&b.distance_squared_milli)
            .then_with(|| a.code.cmp(&b.code))
    });
    ranked
}

/// Read-only resolver over one connection.
pub struct CenterResolver<'conn> {
    conn: &'conn Connection,
}

impl<'conn> CenterResolver<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Code of the nearest center operating on `date`, or `None` when no
    /// center operates that day.
    pub fn closest_center(
        &self,
        folk_id: &FolkId,
        date: NaiveDate,
    ) -> Result<Option<CenterCode>, ResolveError> {
        let ranked = self.rank_centers(folk_id, date)?;
        let closest = ranked.into_iter().next().map(|entry| entry.code);
        debug!(
            "event=closest_center module=resolver status=ok folk={} date={} center={}",
            folk_id.masked(),
            date,
            closest.as_ref().map_or("none", |code| code.as_str())
        );
        Ok(closest)
    }

    /// Every center operating on `date`, nearest first.
    pub fn rank_centers(
        &self,
        folk_id: &FolkId,
        date: NaiveDate,
    ) -> Result<Vec<CenterDistance>, ResolveError> {
        // Deferred transaction: all reads see one snapshot; dropped without
        // writes.
        let snapshot = Transaction::new_unchecked(self.conn, TransactionBehavior::Deferred)?;
        Self::rank_in(&snapshot, folk_id, date)
    }

    /// Compares a registration's center against the closest operating center
    /// for its voting date.
    pub fn check_registration(
        &self,
        registration_id: RegistrationId,
    ) -> Result<CenterCheck, ResolveError> {
        let snapshot = Transaction::new_unchecked(self.conn, TransactionBehavior::Deferred)?;
        let registration = SqliteRegistrationRepository::try_new(&snapshot)?
            .get_registration(registration_id)?
            .ok_or(ResolveError::UnknownRegistration(registration_id))?;

        let ranked = Self::rank_in(&snapshot, &registration.folk_id, registration.voting_date)?;
        let Some(best) = ranked.first() else {
            return Ok(CenterCheck::NoEligibleCenter);
        };

        let chosen = match ranked
            .iter()
            .find(|entry| entry.center_id == registration.center_id)
        {
            Some(entry) => entry.clone(),
            None => {
                // Chosen center does not operate that day; still name it.
                let places = SqlitePlaceRepository::try_new(&snapshot)?;
                let center = places.get_center(registration.center_id)?.ok_or_else(|| {
                    RepoError::not_found("voting center", registration.center_id)
                })?;
                return Ok(CenterCheck::Suboptimal {
                    chosen: center.code,
                    closest: best.code.clone(),
                });
            }
        };

        if chosen.distance_squared_milli <= best.distance_squared_milli {
            Ok(CenterCheck::Optimal {
                chosen: chosen.code,
            })
        } else {
            Ok(CenterCheck::Suboptimal {
                chosen: chosen.code,
                closest: best.code.clone(),
            })
        }
    }

    fn rank_in(
        conn: &Connection,
        folk_id: &FolkId,
        date: NaiveDate,
    ) -> Result<Vec<CenterDistance>, ResolveError> {
        let home = SqliteFolkRepository::try_new(conn)?
            .residence_coordinate(folk_id)?
            .ok_or_else(|| ResolveError::UnknownFolk(folk_id.clone()))?;

        let places = SqlitePlaceRepository::try_new(conn)?;
        let periods = places.list_periods_covering(date)?;
        let centers = places.list_centers()?;
        Ok(rank_eligible_centers(&home, &centers, &periods, date))
    }
}

#[cfg(test)]
mod tests {
    use super::rank_eligible_centers;
    use crate::model::ids::CenterCode;
    use crate::model::place::{Address, Coordinate, VotingCenter};
    use crate::model::poll::OperatingPeriod;
    use chrono::{NaiveDate, NaiveDateTime};

    fn center(place_id: i64, code: &str, x: i64, y: i64) -> VotingCenter {
        VotingCenter {
            place_id,
            code: CenterCode::parse(code).unwrap(),
            address: Address {
                street: "1 Main St".to_string(),
                city: "Springfield".to_string(),
                state: "IL".to_string(),
                zipcode: "62701".to_string(),
            },
            coordinate: Coordinate::from_milli(x, y).unwrap(),
        }
    }

    fn period(center_id: i64, start: &str, end: &str) -> OperatingPeriod {
        OperatingPeriod {
            period_id: center_id,
            center_id,
            starts_at: NaiveDateTime::parse_from_str(start, "%Y-%m-%d %H:%M:%S").unwrap(),
            ends_at: NaiveDateTime::parse_from_str(end, "%Y-%m-%d %H:%M:%S").unwrap(),
        }
    }

    #[test]
    fn ranking_skips_centers_closed_on_date() {
        let home = Coordinate::from_milli(0, 0).unwrap();
        let centers = vec![center(1, "NEAR", 1_000, 0), center(2, "FARR", 9_000, 0)];
        let periods = vec![
            period(1, "2025-03-01 08:00:00", "2025-03-02 18:00:00"),
            period(2, "2025-02-18 08:00:00", "2025-02-21 18:00:00"),
        ];
        let date = NaiveDate::from_ymd_opt(2025, 2, 20).unwrap();

        let ranked = rank_eligible_centers(&home, &centers, &periods, date);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].code.as_str(), "FARR");
    }

    #[test]
    fn equal_distances_break_ties_by_smallest_code() {
        let home = Coordinate::from_milli(0, 0).unwrap();
        let centers = vec![
            center(1, "ZETA", 3_000, 4_000),
            center(2, "ALFA", -4_000, 3_000),
            center(3, "MIDL", 0, -5_000),
        ];
        let periods = vec![
            period(1, "2025-02-18 08:00:00", "2025-02-21 18:00:00"),
            period(2, "2025-02-18 08:00:00", "2025-02-21 18:00:00"),
            period(3, "2025-02-18 08:00:00", "2025-02-21 18:00:00"),
        ];
        let date = NaiveDate::from_ymd_opt(2025, 2, 20).unwrap();

        let ranked = rank_eligible_centers(&home, &centers, &periods, date);
        let codes: Vec<&str> = ranked.iter().map(|entry| entry.code.as_str()).collect();
        assert_eq!(codes, vec!["ALFA", "MIDL", "ZETA"]);
        assert!((ranked[0].distance() - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn no_operating_center_yields_empty_ranking() {
        let home = Coordinate::from_milli(0, 0).unwrap();
        let centers = vec![center(1, "NEAR", 1_000, 0)];
        let date = NaiveDate::from_ymd_opt(2025, 2, 20).unwrap();

        assert!(rank_eligible_centers(&home, &centers, &[], date).is_empty());
    }
}
