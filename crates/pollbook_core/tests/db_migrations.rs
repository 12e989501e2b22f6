use pollbook_core::db::migrations::{latest_version, schema_version};
use pollbook_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

const TABLES: [&str; 10] = [
    "places",
    "residences",
    "voting_centers",
    "folk",
    "polls",
    "operating_periods",
    "registrations",
    "ballots",
    "staff",
    "staff_schedules",
];

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn).unwrap(), latest_version());
    for table in TABLES {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn foreign_keys_are_enforced() {
    let conn = open_db_in_memory().unwrap();
    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);

    let err = conn
        .execute(
            "INSERT INTO folk (folk_id, first_name, last_name, residence_id)
             VALUES ('1234567890123403', 'Ada', 'Lovelace', 42);",
            [],
        )
        .unwrap_err();
    assert!(DbError::from(err).is_foreign_key_violation());
}

#[test]
fn reopening_file_database_is_idempotent_and_uses_wal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pollbook.sqlite3");

    let first = open_db(&path).unwrap();
    assert_eq!(schema_version(&first).unwrap(), latest_version());
    drop(first);

    let second = open_db(&path).unwrap();
    assert_eq!(schema_version(&second).unwrap(), latest_version());
    let journal_mode: String = second
        .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(journal_mode.to_ascii_lowercase(), "wal");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn a_place_cannot_be_both_residence_and_center() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO places (place_id, kind, street, city, state, zipcode, x_milli, y_milli)
         VALUES (1, 'residence', '12 Elm St', 'Springfield', 'IL', '62701', 0, 0);",
        [],
    )
    .unwrap();
    conn.execute("INSERT INTO residences (place_id) VALUES (1);", [])
        .unwrap();

    let err = conn
        .execute(
            "INSERT INTO voting_centers (place_id, code) VALUES (1, 'CEN1');",
            [],
        )
        .unwrap_err();
    assert!(DbError::from(err).is_foreign_key_violation());
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
