use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use rusqlite::params;
use std::collections::BTreeSet;
use tracing::warn;

use crate::models::dose::{DosageUnit, DoseInterval, DoseRecord};

use super::{Database, from_db_time, to_db_time};

struct DoseRow {
    id: String,
    subject_id: String,
    name: String,
    dosage: f64,
    dosage_unit: String,
    given_at: String,
    interval_minutes: Option<i64>,
    is_recurring: bool,
    active: bool,
    notes: Option<String>,
    tags: Option<String>,
    created_at: String,
}

fn row_to_dose(r: DoseRow) -> Result<DoseRecord> {
    let dosage_unit: DosageUnit = r.dosage_unit.parse()?;
    let interval = match r.interval_minutes {
        Some(m) => Some(
            DoseInterval::from_minutes(m)
                .ok_or_else(|| anyhow::anyhow!("interval out of range: {m} minutes"))?,
        ),
        None => None,
    };
    let tags: BTreeSet<String> = match r.tags {
        Some(ref t) => serde_json::from_str(t).unwrap_or_default(),
        None => BTreeSet::new(),
    };

    Ok(DoseRecord {
        id: r.id,
        subject_id: r.subject_id,
        name: r.name,
        dosage: r.dosage,
        dosage_unit,
        given_at: from_db_time(&r.given_at)?,
        interval,
        is_recurring: r.is_recurring,
        active: r.active,
        notes: r.notes,
        tags,
        created_at: from_db_time(&r.created_at)?,
    })
}

const SELECT_COLS: &str = "id, subject_id, name, dosage, dosage_unit, given_at, interval_minutes, is_recurring, active, notes, tags, created_at";

macro_rules! map_row {
    ($row:expr) => {
        Ok(DoseRow {
            id: $row.get(0)?,
            subject_id: $row.get(1)?,
            name: $row.get(2)?,
            dosage: $row.get(3)?,
            dosage_unit: $row.get(4)?,
            given_at: $row.get(5)?,
            interval_minutes: $row.get(6)?,
            is_recurring: $row.get(7)?,
            active: $row.get(8)?,
            notes: $row.get(9)?,
            tags: $row.get(10)?,
            created_at: $row.get(11)?,
        })
    };
}

/// Rows that fail to convert are logged and left out so one bad row cannot
/// hide the rest.
fn collect_doses(rows: impl Iterator<Item = rusqlite::Result<DoseRow>>) -> Result<Vec<DoseRecord>> {
    let mut doses = Vec::new();
    for row in rows {
        let row = row?;
        let id = row.id.clone();
        match row_to_dose(row) {
            Ok(d) => doses.push(d),
            Err(e) => warn!(id = %id, error = %e, "skipping unreadable dose row"),
        }
    }
    Ok(doses)
}

fn tags_json(tags: &BTreeSet<String>) -> Result<Option<String>> {
    if tags.is_empty() {
        Ok(None)
    } else {
        Ok(Some(serde_json::to_string(tags)?))
    }
}

/// Criteria for [`Database::list_doses`]. Empty filter lists everything.
#[derive(Debug, Default, Clone)]
pub struct DoseFilter {
    pub subject_id: Option<String>,
    /// Case-insensitive medicine name.
    pub name: Option<String>,
    pub active_only: bool,
    /// Inclusive lower bound on `given_at`.
    pub since: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `given_at`.
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

impl Database {
    pub fn insert_dose(&self, dose: &DoseRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO doses (id, subject_id, name, dosage, dosage_unit, given_at, interval_minutes, is_recurring, active, notes, tags, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                dose.id,
                dose.subject_id,
                dose.name,
                dose.dosage,
                dose.dosage_unit.to_string(),
                to_db_time(dose.given_at),
                dose.interval.map(|i| i.minutes()),
                dose.is_recurring as i32,
                dose.active as i32,
                dose.notes,
                tags_json(&dose.tags)?,
                to_db_time(dose.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_dose(&self, id: &str) -> Result<Option<DoseRecord>> {
        let sql = format!("SELECT {SELECT_COLS} FROM doses WHERE id = ?1");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query_map(params![id], |row| map_row!(row))?;
        match rows.next() {
            Some(row) => Ok(Some(row_to_dose(row?)?)),
            None => Ok(None),
        }
    }

    pub fn list_doses(&self, filter: &DoseFilter) -> Result<Vec<DoseRecord>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<String> = Vec::new();

        if let Some(ref s) = filter.subject_id {
            values.push(s.clone());
            clauses.push("subject_id = ?");
        }
        if let Some(ref n) = filter.name {
            values.push(n.trim().to_string());
            clauses.push("lower(name) = lower(?)");
        }
        if filter.active_only {
            clauses.push("active = 1");
        }
        if let Some(since) = filter.since {
            values.push(to_db_time(since));
            clauses.push("given_at >= ?");
        }
        if let Some(until) = filter.until {
            values.push(to_db_time(until));
            clauses.push("given_at < ?");
        }

        let mut sql = format!("SELECT {SELECT_COLS} FROM doses");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY given_at DESC, created_at DESC");
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(values.iter()), |row| {
            map_row!(row)
        })?;
        collect_doses(rows)
    }

    /// Doses for one child given at or after `since`, newest first.
    pub fn list_recent(&self, subject_id: &str, since: DateTime<Utc>) -> Result<Vec<DoseRecord>> {
        self.list_doses(&DoseFilter {
            subject_id: Some(subject_id.to_string()),
            since: Some(since),
            ..DoseFilter::default()
        })
    }

    pub fn get_most_recent_by_name(
        &self,
        subject_id: &str,
        name: &str,
    ) -> Result<Option<DoseRecord>> {
        let mut doses = self.list_doses(&DoseFilter {
            subject_id: Some(subject_id.to_string()),
            name: Some(name.to_string()),
            limit: Some(1),
            ..DoseFilter::default()
        })?;
        Ok(doses.pop())
    }

    /// A dose matching child, medicine, amount and unit within `window` of `at`.
    pub fn find_similar_dose(
        &self,
        candidate: &DoseRecord,
        at: DateTime<Utc>,
        window: Duration,
        exclude_id: Option<&str>,
    ) -> Result<Option<DoseRecord>> {
        let sql = format!(
            "SELECT {SELECT_COLS} FROM doses
             WHERE subject_id = ?1 AND lower(name) = lower(?2) AND dosage = ?3 AND dosage_unit = ?4
               AND given_at >= ?5 AND given_at <= ?6 AND id != ?7
             ORDER BY given_at DESC LIMIT 1"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query_map(
            params![
                candidate.subject_id,
                candidate.name,
                candidate.dosage,
                candidate.dosage_unit.to_string(),
                to_db_time(at - window),
                to_db_time(at + window),
                exclude_id.unwrap_or(""),
            ],
            |row| map_row!(row),
        )?;
        match rows.next() {
            Some(row) => Ok(Some(row_to_dose(row?)?)),
            None => Ok(None),
        }
    }

    pub fn update_dose(&self, dose: &DoseRecord) -> Result<bool> {
        let count = self.conn.execute(
            "UPDATE doses SET subject_id = ?1, name = ?2, dosage = ?3, dosage_unit = ?4, given_at = ?5,
                 interval_minutes = ?6, is_recurring = ?7, active = ?8, notes = ?9, tags = ?10
             WHERE id = ?11",
            params![
                dose.subject_id,
                dose.name,
                dose.dosage,
                dose.dosage_unit.to_string(),
                to_db_time(dose.given_at),
                dose.interval.map(|i| i.minutes()),
                dose.is_recurring as i32,
                dose.active as i32,
                dose.notes,
                tags_json(&dose.tags)?,
                dose.id,
            ],
        )?;
        Ok(count > 0)
    }

    pub fn set_dose_active(&self, id: &str, active: bool) -> Result<bool> {
        let count = self.conn.execute(
            "UPDATE doses SET active = ?1 WHERE id = ?2",
            params![active as i32, id],
        )?;
        Ok(count > 0)
    }

    pub fn delete_dose(&self, id: &str) -> Result<bool> {
        let count = self
            .conn
            .execute("DELETE FROM doses WHERE id = ?1", params![id])?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn unreadable_rows_are_skipped() {
        let dir = TempDir::new().unwrap();
        let db = Database::open(&dir.path().join("t.db")).unwrap();

        let good = DoseRecord::new("ada", "Tylenol", 5.0, DosageUnit::Ml);
        db.insert_dose(&good).unwrap();
        db.conn
            .execute(
                "INSERT INTO doses (id, subject_id, name, dosage, dosage_unit, given_at, is_recurring, active, created_at)
                 VALUES ('bad', 'ada', 'Motrin', 5.0, 'ml', 'yesterday', 0, 1, 'yesterday')",
                [],
            )
            .unwrap();

        let all = db.list_doses(&DoseFilter::default()).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, good.id);
        assert!(db.get_dose("bad").is_err());
    }

    #[test]
    fn out_of_range_interval_rows_are_skipped() {
        let dir = TempDir::new().unwrap();
        let db = Database::open(&dir.path().join("t.db")).unwrap();

        let good = DoseRecord::new("ada", "Motrin", 100.0, DosageUnit::Mg);
        db.insert_dose(&good).unwrap();
        db.conn
            .execute(
                "INSERT INTO doses (id, subject_id, name, dosage, dosage_unit, given_at, interval_minutes, is_recurring, active, created_at)
                 VALUES ('huge', 'ada', 'Tylenol', 5.0, 'ml', '2024-01-01T08:00:00Z', 200000000000000, 0, 1, '2024-01-01T08:00:00Z')",
                [],
            )
            .unwrap();

        let all = db.list_doses(&DoseFilter::default()).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, good.id);
    }
}
