//! Folk, staff and staff schedule persistence.
//!
//! # Invariants
//! - A folk row always references an existing residence.
//! - Staff is an optional one-to-one specialization of folk.

use crate::model::folk::{Folk, Staff, StaffRole, StaffSchedule};
use crate::model::ids::{FolkId, PlaceId};
use crate::model::place::Coordinate;
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::{decode_folk_id, ensure_schema_ready, invalid_column};
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Repository interface for people records.
pub trait FolkRepository {
    fn create_folk(&self, folk: &Folk) -> RepoResult<()>;
    fn get_folk(&self, folk_id: &FolkId) -> RepoResult<Option<Folk>>;
    /// Coordinate of the folk's residence, if the folk exists.
    fn residence_coordinate(&self, folk_id: &FolkId) -> RepoResult<Option<Coordinate>>;
    /// Creates or replaces the staff role of an existing folk.
    fn assign_staff_role(&self, folk_id: &FolkId, role: StaffRole) -> RepoResult<Staff>;
    fn get_staff(&self, folk_id: &FolkId) -> RepoResult<Option<Staff>>;
    fn add_schedule(&self, schedule: &StaffSchedule) -> RepoResult<()>;
    /// Shifts at one center ordered by shift start.
    fn list_center_schedules(&self, center_id: PlaceId) -> RepoResult<Vec<StaffSchedule>>;
}

/// SQLite-backed folk repository.
pub struct SqliteFolkRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFolkRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

impl FolkRepository for SqliteFolkRepository<'_> {
    fn create_folk(&self, folk: &Folk) -> RepoResult<()> {
        folk.validate()?;
        self.conn.execute(
            "INSERT INTO folk (folk_id, first_name, last_name, residence_id)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                folk.folk_id.as_str(),
                folk.first_name.trim(),
                folk.last_name.trim(),
                folk.residence_id,
            ],
        )?;
        Ok(())
    }

    fn get_folk(&self, folk_id: &FolkId) -> RepoResult<Option<Folk>> {
        let mut stmt = self.conn.prepare(
            "SELECT folk_id, first_name, last_name, residence_id
             FROM folk
             WHERE folk_id = ?1;",
        )?;
        let mut rows = stmt.query([folk_id.as_str()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_folk_row(row)?));
        }
        Ok(None)
    }

    fn residence_coordinate(&self, folk_id: &FolkId) -> RepoResult<Option<Coordinate>> {
        let milli: Option<(i64, i64)> = self
            .conn
            .query_row(
                "SELECT p.x_milli, p.y_milli
                 FROM folk f
                 INNER JOIN places p ON p.place_id = f.residence_id
                 WHERE f.folk_id = ?1;",
                [folk_id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        milli
            .map(|(x, y)| {
                Coordinate::from_milli(x, y)
                    .map_err(|err| invalid_column("places.x_milli/y_milli", err))
            })
            .transpose()
    }

    fn assign_staff_role(&self, folk_id: &FolkId, role: StaffRole) -> RepoResult<Staff> {
        self.conn.execute(
            "INSERT INTO staff (folk_id, role) VALUES (?1, ?2)
             ON CONFLICT (folk_id) DO UPDATE SET role = excluded.role;",
            params![folk_id.as_str(), role.as_str()],
        )?;
        Ok(Staff {
            folk_id: folk_id.clone(),
            role,
        })
    }

    fn get_staff(&self, folk_id: &FolkId) -> RepoResult<Option<Staff>> {
        let role: Option<String> = self
            .conn
            .query_row(
                "SELECT role FROM staff WHERE folk_id = ?1;",
                [folk_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        match role {
            None => Ok(None),
            Some(text) => {
                let role = text
                    .parse::<StaffRole>()
                    .map_err(|err| invalid_column("staff.role", err))?;
                Ok(Some(Staff {
                    folk_id: folk_id.clone(),
                    role,
                }))
            }
        }
    }

    fn add_schedule(&self, schedule: &StaffSchedule) -> RepoResult<()> {
        if self.get_staff(&schedule.staff_id)?.is_none() {
            return Err(RepoError::not_found("staff", &schedule.staff_id));
        }
        self.conn.execute(
            "INSERT INTO staff_schedules (staff_id, center_id, shift_start)
             VALUES (?1, ?2, ?3);",
            params![
                schedule.staff_id.as_str(),
                schedule.center_id,
                schedule.shift_start,
            ],
        )?;
        Ok(())
    }

    fn list_center_schedules(&self, center_id: PlaceId) -> RepoResult<Vec<StaffSchedule>> {
        let mut stmt = self.conn.prepare(
            "SELECT staff_id, center_id, shift_start
             FROM staff_schedules
             WHERE center_id = ?1
             ORDER BY shift_start ASC, staff_id ASC;",
        )?;
        let mut rows = stmt.query([center_id])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            let staff_id: String = row.get("staff_id")?;
            items.push(StaffSchedule {
                staff_id: decode_folk_id(&staff_id, "staff_schedules.staff_id")?,
                center_id: row.get("center_id")?,
                shift_start: row.get("shift_start")?,
            });
        }
        Ok(items)
    }
}

fn parse_folk_row(row: &Row<'_>) -> RepoResult<Folk> {
    let folk_id: String = row.get("folk_id")?;
    Ok(Folk {
        folk_id: decode_folk_id(&folk_id, "folk.folk_id")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        residence_id: row.get("residence_id")?,
    })
}
