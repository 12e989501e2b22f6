#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use pollbook_core::model::folk::Folk;
use pollbook_core::model::ids::{CenterCode, FolkId, PlaceId, PollCode};
use pollbook_core::model::place::{Address, Coordinate};
use pollbook_core::model::poll::{OperatingPeriod, Poll};
use pollbook_core::model::registration::Registration;
use pollbook_core::repo::folk_repo::{FolkRepository, SqliteFolkRepository};
use pollbook_core::repo::place_repo::{PlaceRepository, SqlitePlaceRepository};
use pollbook_core::repo::poll_repo::{PollRepository, SqlitePollRepository};
use pollbook_core::{FixedClock, RegistrationRequest, RegistrationService};
use rusqlite::Connection;

pub const VOTER: &str = "1234567890123403";
pub const UNREGISTERED: &str = "1234567890123412";

/// Ids created by [`seed`].
pub struct Seeded {
    /// `CEN1` at (2, 0), operating 2025-02-18 08:00 to 2025-02-21 18:00.
    pub center1: PlaceId,
    /// `CEN2` at (5, 0), operating 2025-01-10 08:00 to 2025-03-31 20:00.
    pub center2: PlaceId,
    pub center1_period: OperatingPeriod,
    /// Residence at the origin shared by both folk.
    pub residence: PlaceId,
}

pub fn at(text: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").unwrap()
}

pub fn date(text: &str) -> NaiveDate {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").unwrap()
}

pub fn folk_id(text: &str) -> FolkId {
    FolkId::parse(text).unwrap()
}

pub fn poll_code(text: &str) -> PollCode {
    PollCode::parse(text).unwrap()
}

pub fn address(street: &str) -> Address {
    Address {
        street: street.to_string(),
        city: "Springfield".to_string(),
        state: "IL".to_string(),
        zipcode: "62701".to_string(),
    }
}

pub fn coordinate(x: &str, y: &str) -> Coordinate {
    Coordinate::from_decimal_str(x, y).unwrap()
}

/// Seeds two centers, one residence, two folk and polls `POL1` and `POL4`.
///
/// Centers are created first so `CEN1` gets place id 1.
pub fn seed(conn: &Connection) -> Seeded {
    let places = SqlitePlaceRepository::try_new(conn).unwrap();
    let center1 = places
        .create_voting_center(
            &CenterCode::parse("CEN1").unwrap(),
            &address("1 Civic Plaza"),
            coordinate("2", "0"),
        )
        .unwrap();
    let center2 = places
        .create_voting_center(
            &CenterCode::parse("CEN2").unwrap(),
            &address("5 Market St"),
            coordinate("5", "0"),
        )
        .unwrap();
    let center1_period = places
        .add_operating_period(
            center1.place_id,
            at("2025-02-18 08:00:00"),
            at("2025-02-21 18:00:00"),
        )
        .unwrap();
    places
        .add_operating_period(
            center2.place_id,
            at("2025-01-10 08:00:00"),
            at("2025-03-31 20:00:00"),
        )
        .unwrap();
    let residence = places
        .create_residence(&address("12 Elm St"), coordinate("0", "0"))
        .unwrap();

    let folk = SqliteFolkRepository::try_new(conn).unwrap();
    for (id, first_name) in [(VOTER, "Ada"), (UNREGISTERED, "Brook")] {
        folk.create_folk(&Folk {
            folk_id: folk_id(id),
            first_name: first_name.to_string(),
            last_name: "Lovelace".to_string(),
            residence_id: residence,
        })
        .unwrap();
    }

    let polls = SqlitePollRepository::try_new(conn).unwrap();
    polls
        .create_poll(&Poll {
            code: poll_code("POL1"),
            question: "Approve the annual budget?".to_string(),
            opens_at: at("2025-01-01 00:00:00"),
            closes_at: at("2025-03-01 00:00:00"),
        })
        .unwrap();
    polls
        .create_poll(&Poll {
            code: poll_code("POL4"),
            question: "Extend the library opening hours?".to_string(),
            opens_at: at("2025-02-01 00:00:00"),
            closes_at: at("2025-03-01 00:00:00"),
        })
        .unwrap();

    Seeded {
        center1: center1.place_id,
        center2: center2.place_id,
        center1_period,
        residence,
    }
}

/// Registers `folk` for `poll` at `center` on `voting_date`, created at
/// 2025-02-01 09:00.
pub fn register(
    conn: &Connection,
    folk: &str,
    poll: &str,
    center: PlaceId,
    voting_date: &str,
) -> Registration {
    RegistrationService::new(conn, FixedClock(at("2025-02-01 09:00:00")))
        .register(&RegistrationRequest {
            folk_id: folk_id(folk),
            poll_code: poll_code(poll),
            center_id: center,
            voting_date: date(voting_date),
        })
        .unwrap()
}
