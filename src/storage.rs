//! SQLite persistence for stations, measurements and alerts.
//!
//! Timestamps are stored as RFC 3339 text in UTC with second precision and a
//! `Z` suffix, so string comparison in SQL matches chronological order.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::error::Result;
use crate::models::{Alert, Location, Measurement, NewAlert, ParameterStats};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS locations (
    location_id INTEGER PRIMARY KEY,
    city TEXT NOT NULL,
    country TEXT NOT NULL DEFAULT 'BR',
    latitude REAL,
    longitude REAL,
    station_name TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    parameters TEXT NOT NULL DEFAULT '[]',
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_locations_city ON locations(city);
CREATE INDEX IF NOT EXISTS idx_locations_active ON locations(is_active);

CREATE TABLE IF NOT EXISTS air_measurements (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    location_id INTEGER NOT NULL,
    city TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    parameter TEXT NOT NULL,
    value REAL NOT NULL,
    unit TEXT NOT NULL,
    latitude REAL,
    longitude REAL,
    source TEXT NOT NULL DEFAULT 'OpenAQ',
    collected_at TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_measurements_unique
    ON air_measurements(location_id, parameter, timestamp);
CREATE INDEX IF NOT EXISTS idx_measurements_city_time
    ON air_measurements(city, timestamp DESC);
CREATE INDEX IF NOT EXISTS idx_measurements_timestamp
    ON air_measurements(timestamp DESC);

CREATE TABLE IF NOT EXISTS alerts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    city TEXT NOT NULL,
    level TEXT NOT NULL,
    parameter TEXT NOT NULL,
    value REAL NOT NULL,
    threshold REAL NOT NULL,
    message TEXT NOT NULL,
    created_at TEXT NOT NULL,
    resolved_at TEXT,
    is_active INTEGER NOT NULL DEFAULT 1
);
CREATE INDEX IF NOT EXISTS idx_alerts_city ON alerts(city);
CREATE INDEX IF NOT EXISTS idx_alerts_active ON alerts(is_active);
"#;

const MEASUREMENT_COLUMNS: &str = "location_id, city, timestamp, parameter, value, unit, \
                                   latitude, longitude, source, collected_at";

const ALERT_COLUMNS: &str = "id, city, level, parameter, value, threshold, message, \
                             created_at, resolved_at, is_active";

fn to_text(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn measurement_from_row(row: &Row<'_>) -> rusqlite::Result<Measurement> {
    Ok(Measurement {
        location_id: row.get(0)?,
        city: row.get(1)?,
        timestamp: timestamp_at(row, 2)?,
        parameter: row.get(3)?,
        value: row.get(4)?,
        unit: row.get(5)?,
        latitude: row.get(6)?,
        longitude: row.get(7)?,
        source: row.get(8)?,
        collected_at: timestamp_at(row, 9)?,
    })
}

fn alert_from_row(row: &Row<'_>) -> rusqlite::Result<Alert> {
    let resolved_at = match row.get::<_, Option<String>>(8)? {
        Some(_) => Some(timestamp_at(row, 8)?),
        None => None,
    };
    Ok(Alert {
        id: row.get(0)?,
        city: row.get(1)?,
        level: row.get(2)?,
        parameter: row.get(3)?,
        value: row.get(4)?,
        threshold: row.get(5)?,
        message: row.get(6)?,
        created_at: timestamp_at(row, 7)?,
        resolved_at,
        is_active: row.get(9)?,
    })
}

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (creating if needed) the database file and its parent directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        let db = Self::with_connection(conn)?;
        info!(path = %path.display(), "database ready");
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    pub fn upsert_location(&self, location: &Location) -> Result<()> {
        let parameters = serde_json::to_string(&location.parameters)?;
        self.conn.execute(
            "INSERT INTO locations
                 (location_id, city, country, latitude, longitude, station_name,
                  is_active, parameters, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(location_id) DO UPDATE SET
                 city = excluded.city,
                 country = excluded.country,
                 latitude = excluded.latitude,
                 longitude = excluded.longitude,
                 station_name = excluded.station_name,
                 is_active = excluded.is_active,
                 parameters = excluded.parameters,
                 updated_at = excluded.updated_at",
            params![
                location.location_id,
                location.city,
                location.country,
                location.latitude,
                location.longitude,
                location.station_name,
                location.is_active,
                parameters,
                to_text(Utc::now()),
            ],
        )?;
        debug!(location_id = location.location_id, "location upserted");
        Ok(())
    }

    /// Stations ordered by city then name.
    pub fn locations(&self, active_only: bool) -> Result<Vec<Location>> {
        let mut stmt = self.conn.prepare(
            "SELECT location_id, city, country, latitude, longitude, station_name,
                    is_active, parameters
             FROM locations
             WHERE (?1 = 0 OR is_active = 1)
             ORDER BY city, station_name",
        )?;
        let rows = stmt.query_map(params![active_only], |row| {
            Ok((
                Location {
                    location_id: row.get(0)?,
                    city: row.get(1)?,
                    country: row.get(2)?,
                    latitude: row.get(3)?,
                    longitude: row.get(4)?,
                    station_name: row.get(5)?,
                    is_active: row.get(6)?,
                    parameters: Vec::new(),
                },
                row.get::<_, String>(7)?,
            ))
        })?;

        let mut locations = Vec::new();
        for row in rows {
            let (mut location, parameters) = row?;
            location.parameters = serde_json::from_str(&parameters)?;
            locations.push(location);
        }
        Ok(locations)
    }

    /// Inserts measurements in one transaction. Rows that repeat an existing
    /// (location, parameter, timestamp) are skipped; returns how many were new.
    pub fn insert_measurements(&mut self, measurements: &[Measurement]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR IGNORE INTO air_measurements ({MEASUREMENT_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
            ))?;
            for m in measurements {
                inserted += stmt.execute(params![
                    m.location_id,
                    m.city,
                    to_text(m.timestamp),
                    m.parameter,
                    m.value,
                    m.unit,
                    m.latitude,
                    m.longitude,
                    m.source,
                    to_text(m.collected_at),
                ])?;
            }
        }
        tx.commit()?;
        info!(
            inserted,
            skipped = measurements.len() - inserted,
            "measurements stored"
        );
        Ok(inserted)
    }

    /// Most recent measurements for a city, newest first.
    pub fn latest_measurements(&self, city: &str, limit: u32) -> Result<Vec<Measurement>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MEASUREMENT_COLUMNS} FROM air_measurements
             WHERE city = ?1
             ORDER BY timestamp DESC, id DESC
             LIMIT ?2"
        ))?;
        let rows = stmt.query_map(params![city, limit], measurement_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Measurements for a city from the last `hours`, newest first, optionally
    /// restricted to one parameter.
    pub fn measurements_since(
        &self,
        city: &str,
        hours: u32,
        parameter: Option<&str>,
    ) -> Result<Vec<Measurement>> {
        let cutoff = to_text(Utc::now() - Duration::hours(i64::from(hours)));
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MEASUREMENT_COLUMNS} FROM air_measurements
             WHERE city = ?1 AND timestamp >= ?2 AND (?3 IS NULL OR parameter = ?3)
             ORDER BY timestamp DESC, id DESC"
        ))?;
        let rows = stmt.query_map(params![city, cutoff, parameter], measurement_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Per-parameter count, mean, min and max for a city over the last `hours`.
    pub fn statistics(&self, city: &str, hours: u32) -> Result<Vec<ParameterStats>> {
        let cutoff = to_text(Utc::now() - Duration::hours(i64::from(hours)));
        let mut stmt = self.conn.prepare(
            "SELECT parameter, COUNT(*), AVG(value), MIN(value), MAX(value)
             FROM air_measurements
             WHERE city = ?1 AND timestamp >= ?2
             GROUP BY parameter
             ORDER BY parameter",
        )?;
        let rows = stmt.query_map(params![city, cutoff], |row| {
            Ok(ParameterStats {
                parameter: row.get(0)?,
                count: row.get(1)?,
                avg: row.get(2)?,
                min: row.get(3)?,
                max: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn create_alert(&self, alert: &NewAlert) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO alerts (city, level, parameter, value, threshold, message, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                alert.city,
                alert.level,
                alert.parameter,
                alert.value,
                alert.threshold,
                alert.message,
                to_text(Utc::now()),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        info!(id, city = %alert.city, level = %alert.level, "alert created");
        Ok(id)
    }

    /// Active alerts, newest first, for one city or all of them.
    pub fn active_alerts(&self, city: Option<&str>) -> Result<Vec<Alert>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ALERT_COLUMNS} FROM alerts
             WHERE is_active = 1 AND (?1 IS NULL OR city = ?1)
             ORDER BY created_at DESC, id DESC"
        ))?;
        let rows = stmt.query_map(params![city], alert_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn alert(&self, id: i64) -> Result<Option<Alert>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE id = ?1"),
                params![id],
                alert_from_row,
            )
            .optional()?)
    }

    /// Marks an active alert resolved. Returns false when no active alert has
    /// that id.
    pub fn resolve_alert(&self, id: i64) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE alerts SET is_active = 0, resolved_at = ?2
             WHERE id = ?1 AND is_active = 1",
            params![id, to_text(Utc::now())],
        )?;
        if updated > 0 {
            info!(id, "alert resolved");
        }
        Ok(updated > 0)
    }

    /// Deletes measurements older than `days`. Returns the number removed.
    pub fn cleanup_old_data(&self, days: u32) -> Result<usize> {
        let cutoff = to_text(Utc::now() - Duration::days(i64::from(days)));
        let deleted = self.conn.execute(
            "DELETE FROM air_measurements WHERE timestamp < ?1",
            params![cutoff],
        )?;
        info!(deleted, days, "old measurements removed");
        Ok(deleted)
    }

    pub fn vacuum(&self) -> Result<()> {
        self.conn.execute_batch("VACUUM")?;
        info!("database vacuumed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamps_sort_as_text() {
        let early = Utc::now() - Duration::hours(3);
        let late = early + Duration::milliseconds(1500);
        assert!(to_text(early) < to_text(late));
        assert!(to_text(early).ends_with('Z'));
    }

    #[test]
    fn test_schema_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.conn.execute_batch(SCHEMA).unwrap();
        assert!(db.locations(false).unwrap().is_empty());
    }

    #[test]
    fn test_upsert_location_replaces() {
        let db = Database::open_in_memory().unwrap();
        let mut location = Location {
            location_id: 7,
            city: "Curitiba".to_string(),
            country: "BR".to_string(),
            latitude: Some(-25.4),
            longitude: Some(-49.2),
            station_name: "Boqueirão".to_string(),
            is_active: true,
            parameters: vec!["pm25".to_string(), "o3".to_string()],
        };
        db.upsert_location(&location).unwrap();

        location.is_active = false;
        location.parameters.push("no2".to_string());
        db.upsert_location(&location).unwrap();

        assert!(db.locations(true).unwrap().is_empty());
        let all = db.locations(false).unwrap();
        assert_eq!(all, vec![location]);
    }

    #[test]
    fn test_missing_alert() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.alert(42).unwrap().is_none());
        assert!(!db.resolve_alert(42).unwrap());
    }
}
