#![allow(dead_code)]

use babytrack::db::Database;
use babytrack::models::dose::{DosageUnit, DoseInterval, DoseRecord};
use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

/// Create a temporary database for testing.
pub fn setup_db() -> (TempDir, Database) {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("test.db");
    let db = Database::open(&db_path).unwrap();
    (dir, db)
}

/// 2024-01-01 at the given hour and minute, UTC.
pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, 0).unwrap()
}

/// A 5 ml dose for child "ada" given at `given_at`.
pub fn make_dose(name: &str, given_at: DateTime<Utc>, interval_minutes: Option<i64>) -> DoseRecord {
    let mut d = DoseRecord::new("ada", name, 5.0, DosageUnit::Ml);
    d.given_at = given_at;
    d.created_at = given_at;
    d.interval = interval_minutes.and_then(DoseInterval::from_minutes);
    d
}
