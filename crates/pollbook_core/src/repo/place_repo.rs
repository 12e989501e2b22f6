//! Place, voting center and operating period persistence.
//!
//! # Responsibility
//! - Create residences and voting centers with their specialization row.
//! - Store operating periods and guard their mutation.
//!
//! # Invariants
//! - A place row and its specialization row are written in one transaction.
//! - Center listings are ordered by center code.
//! - Operating period update/delete pass the mutation guard first.

use crate::model::ids::{CenterCode, PlaceId};
use crate::model::place::{Address, Coordinate, Place, PlaceKind, VotingCenter};
use crate::model::poll::{validate_period_bounds, OperatingPeriod, PeriodId};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::guard::ensure_period_mutable;
use crate::repo::{decode_center_code, ensure_schema_ready, invalid_column};
use chrono::{NaiveDate, NaiveDateTime};
use log::info;
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};

const CENTER_SELECT_SQL: &str = "SELECT
    p.place_id AS place_id,
    p.street AS street,
    p.city AS city,
    p.state AS state,
    p.zipcode AS zipcode,
    p.x_milli AS x_milli,
    p.y_milli AS y_milli,
    c.code AS code
FROM voting_centers c
INNER JOIN places p ON p.place_id = c.place_id";

const PERIOD_SELECT_SQL: &str = "SELECT
    period_id,
    center_id,
    starts_at,
    ends_at
FROM operating_periods";

/// Repository interface for places and center schedules.
pub trait PlaceRepository {
    fn create_residence(&self, address: &Address, coordinate: Coordinate) -> RepoResult<PlaceId>;
    fn create_voting_center(
        &self,
        code: &CenterCode,
        address: &Address,
        coordinate: Coordinate,
    ) -> RepoResult<VotingCenter>;
    fn get_place(&self, place_id: PlaceId) -> RepoResult<Option<Place>>;
    fn get_center(&self, center_id: PlaceId) -> RepoResult<Option<VotingCenter>>;
    fn get_center_by_code(&self, code: &CenterCode) -> RepoResult<Option<VotingCenter>>;
    fn list_centers(&self) -> RepoResult<Vec<VotingCenter>>;
    fn add_operating_period(
        &self,
        center_id: PlaceId,
        starts_at: NaiveDateTime,
        ends_at: NaiveDateTime,
    ) -> RepoResult<OperatingPeriod>;
    fn get_operating_period(&self, period_id: PeriodId) -> RepoResult<Option<OperatingPeriod>>;
    fn list_operating_periods(&self, center_id: PlaceId) -> RepoResult<Vec<OperatingPeriod>>;
    /// Periods of any center whose date range includes `date`.
    fn list_periods_covering(&self, date: NaiveDate) -> RepoResult<Vec<OperatingPeriod>>;
    /// Replaces the bounds of one period unless registrations depend on it.
    fn update_operating_period(
        &self,
        period_id: PeriodId,
        starts_at: NaiveDateTime,
        ends_at: NaiveDateTime,
    ) -> RepoResult<OperatingPeriod>;
    /// Removes one period unless registrations depend on it.
    fn delete_operating_period(&self, period_id: PeriodId) -> RepoResult<()>;
}

/// SQLite-backed place repository.
pub struct SqlitePlaceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePlaceRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }

    fn insert_place(
        conn: &Connection,
        address: &Address,
        coordinate: Coordinate,
        kind: &'static str,
    ) -> RepoResult<PlaceId> {
        address.validate()?;
        conn.execute(
            "INSERT INTO places (street, city, state, zipcode, x_milli, y_milli, kind)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                address.street.trim(),
                address.city.trim(),
                address.state.trim(),
                address.zipcode.trim(),
                coordinate.x_milli(),
                coordinate.y_milli(),
                kind,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }
}

impl PlaceRepository for SqlitePlaceRepository<'_> {
    fn create_residence(&self, address: &Address, coordinate: Coordinate) -> RepoResult<PlaceId> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let place_id = Self::insert_place(&tx, address, coordinate, "residence")?;
        tx.execute(
            "INSERT INTO residences (place_id) VALUES (?1);",
            [place_id],
        )?;
        tx.commit()?;
        Ok(place_id)
    }

    fn create_voting_center(
        &self,
        code: &CenterCode,
        address: &Address,
        coordinate: Coordinate,
    ) -> RepoResult<VotingCenter> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let place_id = Self::insert_place(&tx, address, coordinate, "voting_center")?;
        tx.execute(
            "INSERT INTO voting_centers (place_id, code) VALUES (?1, ?2);",
            params![place_id, code.as_str()],
        )?;
        tx.commit()?;

        info!(
            "event=center_create module=place status=ok center_id={} code={}",
            place_id, code
        );
        Ok(VotingCenter {
            place_id,
            code: code.clone(),
            address: address.clone(),
            coordinate,
        })
    }

    fn get_place(&self, place_id: PlaceId) -> RepoResult<Option<Place>> {
        if let Some(center) = self.get_center(place_id)? {
            return Ok(Some(center.into()));
        }

        let mut stmt = self.conn.prepare(
            "SELECT place_id, street, city, state, zipcode, x_milli, y_milli, kind
             FROM places
             WHERE place_id = ?1;",
        )?;
        let mut rows = stmt.query([place_id])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        let kind: String = row.get("kind")?;
        if kind != "residence" {
            return Err(RepoError::InvalidData(format!(
                "place {place_id} has kind `{kind}` without a matching specialization row"
            )));
        }
        Ok(Some(Place {
            place_id: row.get("place_id")?,
            address: parse_address(row)?,
            coordinate: parse_coordinate(row)?,
            kind: PlaceKind::Residence,
        }))
    }

    fn get_center(&self, center_id: PlaceId) -> RepoResult<Option<VotingCenter>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CENTER_SELECT_SQL} WHERE c.place_id = ?1;"))?;
        let mut rows = stmt.query([center_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_center_row(row)?));
        }
        Ok(None)
    }

    fn get_center_by_code(&self, code: &CenterCode) -> RepoResult<Option<VotingCenter>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CENTER_SELECT_SQL} WHERE c.code = ?1;"))?;
        let mut rows = stmt.query([code.as_str()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_center_row(row)?));
        }
        Ok(None)
    }

    fn list_centers(&self) -> RepoResult<Vec<VotingCenter>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CENTER_SELECT_SQL} ORDER BY c.code ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut centers = Vec::new();
        while let Some(row) = rows.next()? {
            centers.push(parse_center_row(row)?);
        }
        Ok(centers)
    }

    fn add_operating_period(
        &self,
        center_id: PlaceId,
        starts_at: NaiveDateTime,
        ends_at: NaiveDateTime,
    ) -> RepoResult<OperatingPeriod> {
        validate_period_bounds(starts_at, ends_at)?;
        self.conn.execute(
            "INSERT INTO operating_periods (center_id, starts_at, ends_at)
             VALUES (?1, ?2, ?3);",
            params![center_id, starts_at, ends_at],
        )?;
        Ok(OperatingPeriod {
            period_id: self.conn.last_insert_rowid(),
            center_id,
            starts_at,
            ends_at,
        })
    }

    fn get_operating_period(&self, period_id: PeriodId) -> RepoResult<Option<OperatingPeriod>> {
        load_period(self.conn, period_id)
    }

    fn list_operating_periods(&self, center_id: PlaceId) -> RepoResult<Vec<OperatingPeriod>> {
        load_center_periods(self.conn, center_id)
    }

    fn list_periods_covering(&self, date: NaiveDate) -> RepoResult<Vec<OperatingPeriod>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PERIOD_SELECT_SQL}
             WHERE date(starts_at) <= ?1
               AND date(ends_at) >= ?1
             ORDER BY center_id ASC, starts_at ASC, period_id ASC;"
        ))?;
        let mut rows = stmt.query([date])?;
        let mut periods = Vec::new();
        while let Some(row) = rows.next()? {
            periods.push(parse_period_row(row)?);
        }
        Ok(periods)
    }

    fn update_operating_period(
        &self,
        period_id: PeriodId,
        starts_at: NaiveDateTime,
        ends_at: NaiveDateTime,
    ) -> RepoResult<OperatingPeriod> {
        validate_period_bounds(starts_at, ends_at)?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let current = load_period(&tx, period_id)?
            .ok_or_else(|| RepoError::not_found("operating period", period_id))?;
        ensure_period_mutable(&tx, &current)?;

        tx.execute(
            "UPDATE operating_periods
             SET starts_at = ?2,
                 ends_at = ?3
             WHERE period_id = ?1;",
            params![period_id, starts_at, ends_at],
        )?;
        tx.commit()?;

        info!(
            "event=period_update module=place status=ok period_id={} center_id={}",
            period_id, current.center_id
        );
        Ok(OperatingPeriod {
            starts_at,
            ends_at,
            ..current
        })
    }

    fn delete_operating_period(&self, period_id: PeriodId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let current = load_period(&tx, period_id)?
            .ok_or_else(|| RepoError::not_found("operating period", period_id))?;
        ensure_period_mutable(&tx, &current)?;

        tx.execute(
            "DELETE FROM operating_periods WHERE period_id = ?1;",
            [period_id],
        )?;
        tx.commit()?;

        info!(
            "event=period_delete module=place status=ok period_id={} center_id={}",
            period_id, current.center_id
        );
        Ok(())
    }
}

/// Periods of one center ordered by start; shared with the ballot port.
pub(crate) fn load_center_periods(
    conn: &Connection,
    center_id: PlaceId,
) -> RepoResult<Vec<OperatingPeriod>> {
    let mut stmt = conn.prepare(&format!(
        "{PERIOD_SELECT_SQL}
         WHERE center_id = ?1
         ORDER BY starts_at ASC, period_id ASC;"
    ))?;
    let mut rows = stmt.query([center_id])?;
    let mut periods = Vec::new();
    while let Some(row) = rows.next()? {
        periods.push(parse_period_row(row)?);
    }
    Ok(periods)
}

fn load_period(conn: &Connection, period_id: PeriodId) -> RepoResult<Option<OperatingPeriod>> {
    let mut stmt = conn.prepare(&format!("{PERIOD_SELECT_SQL} WHERE period_id = ?1;"))?;
    let mut rows = stmt.query([period_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(parse_period_row(row)?)),
        None => Ok(None),
    }
}

fn parse_period_row(row: &Row<'_>) -> RepoResult<OperatingPeriod> {
    let period = OperatingPeriod {
        period_id: row.get("period_id")?,
        center_id: row.get("center_id")?,
        starts_at: row.get("starts_at")?,
        ends_at: row.get("ends_at")?,
    };
    period
        .validate()
        .map_err(|err| invalid_column("operating_periods", err))?;
    Ok(period)
}

fn parse_center_row(row: &Row<'_>) -> RepoResult<VotingCenter> {
    let code: String = row.get("code")?;
    Ok(VotingCenter {
        place_id: row.get("place_id")?,
        code: decode_center_code(&code, "voting_centers.code")?,
        address: parse_address(row)?,
        coordinate: parse_coordinate(row)?,
    })
}

fn parse_address(row: &Row<'_>) -> RepoResult<Address> {
    Ok(Address {
        street: row.get("street")?,
        city: row.get("city")?,
        state: row.get("state")?,
        zipcode: row.get("zipcode")?,
    })
}

fn parse_coordinate(row: &Row<'_>) -> RepoResult<Coordinate> {
    Coordinate::from_milli(row.get("x_milli")?, row.get("y_milli")?)
        .map_err(|err| invalid_column("places.x_milli/y_milli", err))
}
