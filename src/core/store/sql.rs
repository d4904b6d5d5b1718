//! SQLite-backed record store
//!
//! Numbers come from `rnc_counters`: one upsert-with-return per creation,
//! executed in the same IMMEDIATE transaction as the record insert, so each
//! `(year, seq)` goes to exactly one writer even when several processes
//! submit at once.

use std::collections::HashMap;
use std::fs;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};

use super::{numbering_year, schema, RncStore, StoreError};
use crate::core::config::Backend;
use crate::core::dburl::DatabaseUrl;
use crate::core::numbering::RncNumber;
use crate::entities::rnc::{NewRnc, PhotoRef, Rnc, RncEvent, RncPatch, RncStatus};

/// How long a writer waits for another writer's lock before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

const RNC_COLUMNS: &str =
    "id, number, created, report_date, reporter, area, pep, title, description, status";

/// The record store backed by SQLite
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (creating if needed) the database and its tables
    pub fn open(url: &DatabaseUrl) -> Result<Self, StoreError> {
        let conn = match url {
            DatabaseUrl::File(path) => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                Connection::open(path)?
            }
            DatabaseUrl::Memory => Connection::open_in_memory()?,
        };

        conn.busy_timeout(BUSY_TIMEOUT)?;
        // WAL lets readers proceed while a submission holds the write lock
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        schema::init_schema(&conn)?;

        Ok(Self { conn })
    }

    fn row_id(&self, number: RncNumber) -> Result<(i64, RncStatus), StoreError> {
        let row: Option<(i64, String)> = self
            .conn
            .query_row(
                "SELECT id, status FROM rncs WHERE number = ?1",
                params![number.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let (id, status) = row.ok_or(StoreError::NotFound(number))?;
        Ok((id, parse_field(&status)?))
    }

    fn load_events(&self, rnc_id: Option<i64>) -> Result<HashMap<i64, Vec<RncEvent>>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT rnc_id, action, from_status, to_status, note, actor, at FROM rnc_events
             WHERE ?1 IS NULL OR rnc_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![rnc_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut events: HashMap<i64, Vec<RncEvent>> = HashMap::new();
        for (id, action, from, to, note, actor, at) in rows {
            events.entry(id).or_default().push(RncEvent {
                action: parse_field(&action)?,
                from: parse_field(&from)?,
                to: parse_field(&to)?,
                note,
                actor,
                at: parse_timestamp(&at)?,
            });
        }
        Ok(events)
    }

    fn load_photos(&self, rnc_id: Option<i64>) -> Result<HashMap<i64, Vec<PhotoRef>>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT rnc_id, key, url, category, filename, uploaded FROM rnc_photos
             WHERE ?1 IS NULL OR rnc_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![rnc_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut photos: HashMap<i64, Vec<PhotoRef>> = HashMap::new();
        for (id, key, url, category, filename, uploaded) in rows {
            photos.entry(id).or_default().push(PhotoRef {
                key,
                url,
                category: parse_field(&category)?,
                filename,
                uploaded: parse_timestamp(&uploaded)?,
            });
        }
        Ok(photos)
    }
}

impl RncStore for SqliteStore {
    fn backend(&self) -> Backend {
        Backend::Sql
    }

    fn create(&mut self, new: NewRnc, now: DateTime<Utc>) -> Result<Rnc, StoreError> {
        let year = numbering_year(now);
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        // A missing counter row is seeded past any sequence already stored for the year
        let seq: i64 = tx.query_row(
            "INSERT INTO rnc_counters (year, last_seq)
             VALUES (?1, (SELECT COALESCE(MAX(seq), 0) + 1 FROM rncs WHERE year = ?1))
             ON CONFLICT(year) DO UPDATE
                 SET last_seq = MAX(rnc_counters.last_seq + 1, excluded.last_seq)
             RETURNING last_seq",
            params![year],
            |row| row.get(0),
        )?;
        let seq = u32::try_from(seq)
            .map_err(|_| StoreError::Corrupt(format!("counter for {} out of range: {}", year, seq)))?;
        let number = RncNumber::new(year, seq)?;
        let rnc = Rnc::from_new(number, new, now);

        tx.execute(
            "INSERT INTO rncs (number, year, seq, created, report_date, reporter, area, pep, title, description, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                rnc.number.to_string(),
                year,
                seq,
                rnc.created.to_rfc3339(),
                rnc.report_date.format("%Y-%m-%d").to_string(),
                rnc.reporter,
                rnc.area,
                rnc.pep,
                rnc.title,
                rnc.description,
                rnc.status.to_string(),
            ],
        )?;
        tx.commit()?;

        tracing::info!(number = %rnc.number, "RNC created");
        Ok(rnc)
    }

    fn list(&self) -> Result<Vec<Rnc>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM rncs ORDER BY year DESC, seq DESC",
            RNC_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], RncRow::read)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut events = self.load_events(None)?;
        let mut photos = self.load_photos(None)?;

        rows.into_iter()
            .map(|row| {
                let id = row.id;
                row.into_rnc(
                    events.remove(&id).unwrap_or_default(),
                    photos.remove(&id).unwrap_or_default(),
                )
            })
            .collect()
    }

    fn get(&self, number: RncNumber) -> Result<Option<Rnc>, StoreError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM rncs WHERE number = ?1", RNC_COLUMNS),
                params![number.to_string()],
                RncRow::read,
            )
            .optional()?;

        let Some(row) = row else {
            return Ok(None);
        };
        let id = row.id;
        let events = self.load_events(Some(id))?.remove(&id).unwrap_or_default();
        let photos = self.load_photos(Some(id))?.remove(&id).unwrap_or_default();
        row.into_rnc(events, photos).map(Some)
    }

    fn update(&mut self, number: RncNumber, patch: &RncPatch) -> Result<Rnc, StoreError> {
        let mut rnc = self.require(number)?;
        patch.apply_to(&mut rnc);

        self.conn.execute(
            "UPDATE rncs SET reporter = ?1, report_date = ?2, area = ?3, pep = ?4, title = ?5, description = ?6
             WHERE number = ?7",
            params![
                rnc.reporter,
                rnc.report_date.format("%Y-%m-%d").to_string(),
                rnc.area,
                rnc.pep,
                rnc.title,
                rnc.description,
                number.to_string(),
            ],
        )?;

        tracing::info!(%number, "RNC updated");
        Ok(rnc)
    }

    fn record_event(&mut self, number: RncNumber, event: RncEvent) -> Result<Rnc, StoreError> {
        let (id, _) = self.row_id(number)?;
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let changed = tx.execute(
            "UPDATE rncs SET status = ?1 WHERE id = ?2 AND status = ?3",
            params![event.to.to_string(), id, event.from.to_string()],
        )?;
        if changed == 0 {
            let actual: String =
                tx.query_row("SELECT status FROM rncs WHERE id = ?1", params![id], |row| {
                    row.get(0)
                })?;
            return Err(StoreError::StatusConflict {
                number,
                expected: event.from,
                actual: parse_field(&actual)?,
            });
        }

        tx.execute(
            "INSERT INTO rnc_events (rnc_id, action, from_status, to_status, note, actor, at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id,
                event.action.to_string(),
                event.from.to_string(),
                event.to.to_string(),
                event.note,
                event.actor,
                event.at.to_rfc3339(),
            ],
        )?;
        tx.commit()?;

        tracing::info!(%number, action = %event.action, to = %event.to, "RNC status changed");
        self.require(number)
    }

    fn add_photo(&mut self, number: RncNumber, photo: PhotoRef) -> Result<Rnc, StoreError> {
        let (id, _) = self.row_id(number)?;
        let result = self.conn.execute(
            "INSERT INTO rnc_photos (rnc_id, key, url, category, filename, uploaded)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id,
                photo.key,
                photo.url,
                photo.category.to_string(),
                photo.filename,
                photo.uploaded.to_rfc3339(),
            ],
        );
        match result {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                return Err(StoreError::DuplicatePhoto {
                    number,
                    key: photo.key,
                });
            }
            Err(e) => return Err(e.into()),
        }
        self.require(number)
    }

    fn remove_photo(
        &mut self,
        number: RncNumber,
        key: &str,
    ) -> Result<Option<PhotoRef>, StoreError> {
        let (id, _) = self.row_id(number)?;
        let mut photos = self.load_photos(Some(id))?.remove(&id).unwrap_or_default();
        let Some(pos) = photos.iter().position(|p| p.key == key) else {
            return Ok(None);
        };

        self.conn.execute(
            "DELETE FROM rnc_photos WHERE rnc_id = ?1 AND key = ?2",
            params![id, key],
        )?;
        Ok(Some(photos.swap_remove(pos)))
    }

    fn delete(&mut self, number: RncNumber) -> Result<Rnc, StoreError> {
        let rnc = self.require(number)?;
        // Events and photo rows go with it (ON DELETE CASCADE); the counter stays
        self.conn.execute(
            "DELETE FROM rncs WHERE number = ?1",
            params![number.to_string()],
        )?;
        tracing::info!(%number, "RNC deleted");
        Ok(rnc)
    }
}

/// Raw `rncs` row before field parsing
struct RncRow {
    id: i64,
    number: String,
    created: String,
    report_date: String,
    reporter: String,
    area: String,
    pep: String,
    title: String,
    description: String,
    status: String,
}

impl RncRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            number: row.get(1)?,
            created: row.get(2)?,
            report_date: row.get(3)?,
            reporter: row.get(4)?,
            area: row.get(5)?,
            pep: row.get(6)?,
            title: row.get(7)?,
            description: row.get(8)?,
            status: row.get(9)?,
        })
    }

    fn into_rnc(self, events: Vec<RncEvent>, photos: Vec<PhotoRef>) -> Result<Rnc, StoreError> {
        Ok(Rnc {
            number: self.number.parse()?,
            created: parse_timestamp(&self.created)?,
            report_date: NaiveDate::parse_from_str(&self.report_date, "%Y-%m-%d").map_err(|e| {
                StoreError::Corrupt(format!("bad report date '{}': {}", self.report_date, e))
            })?,
            reporter: self.reporter,
            area: self.area,
            pep: self.pep,
            title: self.title,
            description: self.description,
            status: parse_field(&self.status)?,
            events,
            photos,
        })
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp '{}': {}", s, e)))
}

fn parse_field<T: FromStr<Err = String>>(s: &str) -> Result<T, StoreError> {
    s.parse().map_err(StoreError::Corrupt)
}
