mod common;

use common::{address, at, coordinate, date, folk_id, register, seed, VOTER};
use pollbook_core::db::open_db_in_memory;
use pollbook_core::model::ids::CenterCode;
use pollbook_core::repo::place_repo::{PlaceRepository, SqlitePlaceRepository};
use pollbook_core::service::center_resolver::ResolveError;
use pollbook_core::{CenterCheck, CenterResolver};

fn code(text: &str) -> CenterCode {
    CenterCode::parse(text).unwrap()
}

#[test]
fn closest_center_only_considers_centers_operating_that_day() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let resolver = CenterResolver::new(&conn);
    let voter = folk_id(VOTER);

    assert_eq!(
        resolver.closest_center(&voter, date("2025-02-20")).unwrap(),
        Some(code("CEN1"))
    );
    assert_eq!(
        resolver.closest_center(&voter, date("2025-01-15")).unwrap(),
        Some(code("CEN2"))
    );
    assert_eq!(
        resolver.closest_center(&voter, date("2025-04-10")).unwrap(),
        None
    );
}

#[test]
fn equidistant_centers_resolve_to_smallest_code_every_time() {
    let conn = open_db_in_memory().unwrap();
    let seeded = seed(&conn);
    let places = SqlitePlaceRepository::try_new(&conn).unwrap();
    let twin = places
        .create_voting_center(&code("CEN0"), &address("2 West Rd"), coordinate("-2", "0"))
        .unwrap();
    places
        .add_operating_period(twin.place_id, at("2025-02-20 07:00:00"), at("2025-02-20 21:00:00"))
        .unwrap();

    let resolver = CenterResolver::new(&conn);
    for _ in 0..3 {
        assert_eq!(
            resolver
                .closest_center(&folk_id(VOTER), date("2025-02-20"))
                .unwrap(),
            Some(code("CEN0"))
        );
    }

    let ranked = resolver
        .rank_centers(&folk_id(VOTER), date("2025-02-20"))
        .unwrap();
    let codes: Vec<&str> = ranked.iter().map(|entry| entry.code.as_str()).collect();
    assert_eq!(codes, vec!["CEN0", "CEN1", "CEN2"]);

    // A tie with the closest center still counts as optimal.
    let registration = register(&conn, VOTER, "POL4", seeded.center1, "2025-02-20");
    assert_eq!(
        resolver
            .check_registration(registration.registration_id)
            .unwrap(),
        CenterCheck::Optimal {
            chosen: code("CEN1")
        }
    );
}

#[test]
fn check_registration_reports_without_modifying() {
    let conn = open_db_in_memory().unwrap();
    let seeded = seed(&conn);
    let resolver = CenterResolver::new(&conn);

    let optimal = register(&conn, VOTER, "POL4", seeded.center1, "2025-02-20");
    let farther = register(&conn, VOTER, "POL4", seeded.center2, "2025-02-20");
    let closed_day = register(&conn, VOTER, "POL4", seeded.center1, "2025-02-25");
    let nobody_open = register(&conn, VOTER, "POL4", seeded.center2, "2025-04-10");

    assert_eq!(
        resolver.check_registration(optimal.registration_id).unwrap(),
        CenterCheck::Optimal {
            chosen: code("CEN1")
        }
    );
    assert_eq!(
        resolver.check_registration(farther.registration_id).unwrap(),
        CenterCheck::Suboptimal {
            chosen: code("CEN2"),
            closest: code("CEN1"),
        }
    );
    assert_eq!(
        resolver
            .check_registration(closed_day.registration_id)
            .unwrap(),
        CenterCheck::Suboptimal {
            chosen: code("CEN1"),
            closest: code("CEN2"),
        }
    );
    assert_eq!(
        resolver
            .check_registration(nobody_open.registration_id)
            .unwrap(),
        CenterCheck::NoEligibleCenter
    );

    let valid: i64 = conn
        .query_row(
            "SELECT is_valid FROM registrations WHERE registration_id = ?1;",
            [farther.registration_id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(valid, 1);
}

#[test]
fn unknown_inputs_are_reported() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let resolver = CenterResolver::new(&conn);

    assert!(matches!(
        resolver.closest_center(&folk_id("9999999999999999"), date("2025-02-20")),
        Err(ResolveError::UnknownFolk(_))
    ));
    assert!(matches!(
        resolver.check_registration(404),
        Err(ResolveError::UnknownRegistration(404))
    ));
}
