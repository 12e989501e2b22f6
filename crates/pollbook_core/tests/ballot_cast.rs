mod common;

use common::{at, date, folk_id, poll_code, register, seed, UNREGISTERED, VOTER};
use pollbook_core::db::{open_db, open_db_in_memory};
use pollbook_core::model::ids::PlaceId;
use pollbook_core::repo::ballot_repo::{BallotRepository, SqliteBallotRepository};
use pollbook_core::{BallotService, CastKind, CastOutcome, CastRequest, FixedClock, VoteChoice};
use rusqlite::Connection;
use std::sync::{Arc, Barrier};
use std::thread;

fn request(folk: &str, poll: &str, choice: VoteChoice, center: PlaceId, day: &str) -> CastRequest {
    CastRequest {
        folk_id: folk_id(folk),
        poll_code: poll_code(poll),
        choice,
        center_id: center,
        voting_date: date(day),
    }
}

fn cast_at(conn: &Connection, now: &str, request: &CastRequest) -> CastOutcome {
    BallotService::new(conn, FixedClock(at(now))).cast(request)
}

fn ballot_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM ballots;", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn registered_voter_at_open_center_casts_successfully() {
    let conn = open_db_in_memory().unwrap();
    let seeded = seed(&conn);
    let registration = register(&conn, VOTER, "POL4", seeded.center1, "2025-02-20");
    assert_eq!(seeded.center1, 1);

    let outcome = cast_at(
        &conn,
        "2025-02-20 10:00:00",
        &request(VOTER, "POL4", VoteChoice::No, 1, "2025-02-20"),
    );
    assert_eq!(outcome.code(), 0, "{}", outcome.message());
    assert_eq!(outcome.kind(), CastKind::Success);
    assert!(outcome.message().contains("POL4"));
    assert!(outcome.message().contains("NO"));

    let ballot = SqliteBallotRepository::try_new(&conn)
        .unwrap()
        .get_ballot(&folk_id(VOTER), &poll_code("POL4"))
        .unwrap()
        .unwrap();
    assert_eq!(ballot.registration_id, registration.registration_id);
    assert_eq!(ballot.choice, VoteChoice::No);
    assert_eq!(ballot.cast_at, at("2025-02-20 10:00:00"));
    assert_eq!(Some(ballot.receipt), outcome.receipt());
}

#[test]
fn second_cast_for_same_pair_is_duplicate_whatever_the_input() {
    let conn = open_db_in_memory().unwrap();
    let seeded = seed(&conn);
    register(&conn, VOTER, "POL4", seeded.center1, "2025-02-20");
    let first = cast_at(
        &conn,
        "2025-02-20 10:00:00",
        &request(VOTER, "POL4", VoteChoice::No, seeded.center1, "2025-02-20"),
    );
    assert_eq!(first.code(), 0);

    let again = cast_at(
        &conn,
        "2025-02-20 11:00:00",
        &request(VOTER, "POL4", VoteChoice::Yes, seeded.center2, "2025-02-21"),
    );
    assert_eq!(again.code(), 1);
    assert_eq!(again.kind(), CastKind::DuplicateBallot);
    assert!(again.receipt().is_none());
    assert_eq!(ballot_count(&conn), 1);
}

#[test]
fn voter_without_registration_gets_code_four() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);

    let outcome = cast_at(
        &conn,
        "2025-01-15 10:00:00",
        &request(UNREGISTERED, "POL1", VoteChoice::Yes, 1, "2025-01-15"),
    );
    assert_eq!(outcome.code(), 4);
    assert_eq!(ballot_count(&conn), 0);
}

#[test]
fn unknown_poll_gets_code_two() {
    let conn = open_db_in_memory().unwrap();
    let seeded = seed(&conn);

    let outcome = cast_at(
        &conn,
        "2025-02-20 10:00:00",
        &request(VOTER, "POL9", VoteChoice::Yes, seeded.center1, "2025-02-20"),
    );
    assert_eq!(outcome.code(), 2);
}

#[test]
fn casts_outside_poll_window_get_code_three() {
    let conn = open_db_in_memory().unwrap();
    let seeded = seed(&conn);
    register(&conn, VOTER, "POL4", seeded.center1, "2025-02-20");
    let ballot = request(VOTER, "POL4", VoteChoice::Abstain, seeded.center1, "2025-02-20");

    assert_eq!(cast_at(&conn, "2025-01-31 23:59:59", &ballot).code(), 3);
    assert_eq!(cast_at(&conn, "2025-03-01 00:00:00", &ballot).code(), 3);
    assert_eq!(ballot_count(&conn), 0);
}

#[test]
fn wrong_center_or_invalid_registration_gets_code_four() {
    let conn = open_db_in_memory().unwrap();
    let seeded = seed(&conn);
    register(&conn, VOTER, "POL4", seeded.center1, "2025-02-20");
    let invalid = register(&conn, UNREGISTERED, "POL4", seeded.center1, "2025-02-25");
    assert!(!invalid.is_valid);

    let wrong_center = cast_at(
        &conn,
        "2025-02-20 10:00:00",
        &request(VOTER, "POL4", VoteChoice::Yes, seeded.center2, "2025-02-20"),
    );
    assert_eq!(wrong_center.code(), 4);

    let invalid_registration = cast_at(
        &conn,
        "2025-02-25 10:00:00",
        &request(UNREGISTERED, "POL4", VoteChoice::Yes, seeded.center1, "2025-02-25"),
    );
    assert_eq!(invalid_registration.code(), 4);
}

#[test]
fn center_outside_daily_hours_gets_code_six() {
    let conn = open_db_in_memory().unwrap();
    let seeded = seed(&conn);
    register(&conn, VOTER, "POL4", seeded.center1, "2025-02-20");
    let ballot = request(VOTER, "POL4", VoteChoice::Yes, seeded.center1, "2025-02-20");

    assert_eq!(cast_at(&conn, "2025-02-20 07:59:59", &ballot).code(), 6);
    assert_eq!(cast_at(&conn, "2025-02-20 18:00:01", &ballot).code(), 6);
    assert_eq!(cast_at(&conn, "2025-02-20 18:00:00", &ballot).code(), 0);
}

#[test]
fn tally_counts_ballots_per_choice() {
    let conn = open_db_in_memory().unwrap();
    let seeded = seed(&conn);
    register(&conn, VOTER, "POL4", seeded.center1, "2025-02-20");
    register(&conn, UNREGISTERED, "POL4", seeded.center1, "2025-02-20");
    for (folk, choice) in [(VOTER, VoteChoice::Yes), (UNREGISTERED, VoteChoice::Yes)] {
        let outcome = cast_at(
            &conn,
            "2025-02-20 12:00:00",
            &request(folk, "POL4", choice, seeded.center1, "2025-02-20"),
        );
        assert_eq!(outcome.code(), 0);
    }

    let repo = SqliteBallotRepository::try_new(&conn).unwrap();
    let tally = repo.tally(&poll_code("POL4")).unwrap();
    assert_eq!((tally.yes, tally.no, tally.abstain), (2, 0, 0));
    assert_eq!(repo.list_ballots(&poll_code("POL4")).unwrap().len(), 2);
    assert_eq!(repo.tally(&poll_code("POL1")).unwrap().total(), 0);
}

#[test]
fn concurrent_casts_for_one_pair_yield_exactly_one_ballot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pollbook.sqlite3");
    {
        let conn = open_db(&path).unwrap();
        let seeded = seed(&conn);
        register(&conn, VOTER, "POL4", seeded.center1, "2025-02-20");
    }

    let codes = cast_concurrently(
        &path,
        vec![
            request(VOTER, "POL4", VoteChoice::Yes, 1, "2025-02-20"),
            request(VOTER, "POL4", VoteChoice::No, 1, "2025-02-20"),
        ],
    );
    let mut sorted = codes.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, vec![0, 1], "codes: {codes:?}");

    let conn = open_db(&path).unwrap();
    assert_eq!(ballot_count(&conn), 1);
}

#[test]
fn concurrent_casts_for_different_pairs_both_succeed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pollbook.sqlite3");
    {
        let conn = open_db(&path).unwrap();
        let seeded = seed(&conn);
        register(&conn, VOTER, "POL4", seeded.center1, "2025-02-20");
        register(&conn, UNREGISTERED, "POL4", seeded.center1, "2025-02-20");
    }

    let codes = cast_concurrently(
        &path,
        vec![
            request(VOTER, "POL4", VoteChoice::Yes, 1, "2025-02-20"),
            request(UNREGISTERED, "POL4", VoteChoice::No, 1, "2025-02-20"),
        ],
    );
    assert_eq!(codes, vec![0, 0]);

    let conn = open_db(&path).unwrap();
    assert_eq!(ballot_count(&conn), 2);
}

/// Casts each request on its own connection and thread, released together.
fn cast_concurrently(path: &std::path::Path, requests: Vec<CastRequest>) -> Vec<i32> {
    let barrier = Arc::new(Barrier::new(requests.len()));
    let handles: Vec<_> = requests
        .into_iter()
        .map(|request| {
            let barrier = Arc::clone(&barrier);
            let path = path.to_path_buf();
            thread::spawn(move || {
                let conn = open_db(&path).unwrap();
                barrier.wait();
                cast_at(&conn, "2025-02-20 10:00:00", &request).code()
            })
        })
        .collect();
    handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect()
}

#[test]
fn store_failure_reports_generic_system_error_and_writes_nothing() {
    let conn = open_db_in_memory().unwrap();
    let seeded = seed(&conn);
    register(&conn, VOTER, "POL4", seeded.center1, "2025-02-20");

    // An open transaction on the connection makes BEGIN IMMEDIATE fail.
    conn.execute_batch("BEGIN;").unwrap();
    let outcome = cast_at(
        &conn,
        "2025-02-20 10:00:00",
        &request(VOTER, "POL4", VoteChoice::Yes, seeded.center1, "2025-02-20"),
    );
    conn.execute_batch("ROLLBACK;").unwrap();

    assert_eq!(outcome.code(), -1);
    assert_eq!(outcome.kind(), CastKind::SystemError);
    assert!(outcome.message().starts_with("system error"));
    assert!(!outcome.message().contains(VOTER));
    assert!(outcome.receipt().is_none());
    assert_eq!(ballot_count(&conn), 0);

    let retry = cast_at(
        &conn,
        "2025-02-20 10:00:00",
        &request(VOTER, "POL4", VoteChoice::Yes, seeded.center1, "2025-02-20"),
    );
    assert_eq!(retry.code(), 0);
}
