use anyhow::Result;
use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::scheduler::{self, DoseStatus};
use crate::core::validate;
use crate::db::{Database, DoseFilter};
use crate::error::DoseError;
use crate::models::config::Config;
use crate::models::dose::{DosageUnit, DoseInterval, DoseRecord, IntervalInput, parse_dosage, parse_tags};

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// How the interval of a new or edited dose is chosen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IntervalChoice<'a> {
    /// Use `defaults.interval` from the config.
    Default,
    /// No interval: the medicine is never restricted.
    Unrestricted,
    /// Free text such as `"4h"` or `"0:6:0"`.
    Text(&'a str),
    /// The three bounded entry fields, clamped on input.
    Fields(IntervalInput),
}

/// Parameters for logging a new dose.
pub struct LogDoseParams<'a> {
    pub subject: &'a str,
    pub name: &'a str,
    pub dosage: &'a str,
    pub unit: Option<&'a str>,
    pub interval: IntervalChoice<'a>,
    pub is_recurring: bool,
    pub notes: Option<&'a str>,
    pub tags: Option<&'a str>,
    pub given_at: Option<DateTime<Utc>>,
}

/// Fields to change on an existing dose. `None` leaves a field as it is.
#[derive(Default)]
pub struct EditDoseParams<'a> {
    pub name: Option<&'a str>,
    pub dosage: Option<&'a str>,
    pub unit: Option<&'a str>,
    pub interval: Option<IntervalChoice<'a>>,
    pub is_recurring: Option<bool>,
    pub notes: Option<&'a str>,
    pub tags: Option<&'a str>,
    pub given_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct RepeatOutcome {
    pub record: DoseRecord,
    /// `false` when an identical repeat was already logged moments ago.
    pub created: bool,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn resolve_interval(
    config: &Config,
    choice: IntervalChoice<'_>,
) -> Result<Option<DoseInterval>, DoseError> {
    match choice {
        IntervalChoice::Unrestricted => Ok(None),
        IntervalChoice::Fields(input) => Ok(Some(input.compose())),
        IntervalChoice::Text(text) => text
            .parse::<DoseInterval>()
            .map(Some)
            .map_err(|e| DoseError::validation("interval", e.to_string())),
        IntervalChoice::Default => config
            .default_interval()
            .map(Some)
            .map_err(|e| DoseError::validation("interval", format!("defaults.interval: {e}"))),
    }
}

/// Amount and unit from the dosage text plus an optional explicit unit.
fn resolve_dosage(dosage: &str, unit: Option<&str>) -> Result<(f64, DosageUnit), DoseError> {
    let parsed = parse_dosage(dosage)?;
    let unit = match unit.map(str::trim).filter(|u| !u.is_empty()) {
        Some(u) => {
            let Ok(unit) = u.parse::<DosageUnit>();
            unit
        }
        None => parsed
            .unit
            .ok_or_else(|| DoseError::validation("dosage_unit", "a dosage unit is required"))?,
    };
    Ok((parsed.amount, unit))
}

fn require(db: &Database, id: &str) -> Result<DoseRecord> {
    match db.get_dose(id)? {
        Some(d) => Ok(d),
        None => Err(DoseError::NotFound(id.to_string()).into()),
    }
}

// ---------------------------------------------------------------------------
// log_dose
// ---------------------------------------------------------------------------

/// Validate and store a newly administered dose.
pub fn log_dose(
    db: &Database,
    config: &Config,
    params: LogDoseParams<'_>,
    now: DateTime<Utc>,
) -> Result<DoseRecord> {
    let name = config.resolve_alias(params.name.trim());
    let (amount, unit) = resolve_dosage(params.dosage, params.unit)?;
    let interval = resolve_interval(config, params.interval)?;

    let mut dose = DoseRecord::new(params.subject.trim(), name, amount, unit);
    dose.given_at = params.given_at.unwrap_or(now).trunc_subsecs(0);
    dose.created_at = now.trunc_subsecs(0);
    dose.interval = interval;
    dose.is_recurring = params.is_recurring;
    dose.notes = params.notes.map(String::from);
    if let Some(t) = params.tags {
        dose.tags = parse_tags(t);
    }

    validate::check_new_record(&dose, now)?;

    if let Some(existing) =
        db.find_similar_dose(&dose, dose.given_at, validate::duplicate_window(), None)?
    {
        debug!(existing = %existing.id, "duplicate dose rejected");
        return Err(DoseError::validation(
            "given_at",
            format!(
                "A similar entry for {} already exists within {} minutes of this time. \
                 Please check for duplicate entries.",
                dose.name,
                validate::DUPLICATE_WINDOW_MINUTES
            ),
        )
        .into());
    }

    db.insert_dose(&dose)?;
    info!(id = %dose.id, name = %dose.name, subject = %dose.subject_id, "dose logged");
    Ok(dose)
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

pub fn get_dose(db: &Database, id: &str) -> Result<DoseRecord> {
    require(db, id)
}

pub fn list_doses(db: &Database, filter: &DoseFilter) -> Result<Vec<DoseRecord>> {
    db.list_doses(filter)
}

/// The list view: every matching dose with its next-dose column.
pub fn list_view(db: &Database, filter: &DoseFilter, now: DateTime<Utc>) -> Result<Vec<DoseStatus>> {
    Ok(db
        .list_doses(filter)?
        .iter()
        .map(|d| scheduler::evaluate(d, now))
        .collect())
}

pub fn latest_dose(db: &Database, subject: &str, name: &str) -> Result<Option<DoseRecord>> {
    db.get_most_recent_by_name(subject, name)
}

// ---------------------------------------------------------------------------
// edit_dose / delete_dose
// ---------------------------------------------------------------------------

pub fn edit_dose(
    db: &Database,
    config: &Config,
    id: &str,
    params: EditDoseParams<'_>,
    now: DateTime<Utc>,
) -> Result<DoseRecord> {
    let mut dose = require(db, id)?;

    if let Some(n) = params.name {
        dose.name = config.resolve_alias(n.trim());
    }
    match (params.dosage, params.unit) {
        (Some(d), u) => {
            let (amount, unit) = match u {
                Some(_) => resolve_dosage(d, u)?,
                None => {
                    let parsed = parse_dosage(d)?;
                    (parsed.amount, parsed.unit.unwrap_or(dose.dosage_unit.clone()))
                }
            };
            dose.dosage = amount;
            dose.dosage_unit = unit;
        }
        (None, Some(u)) => {
            let Ok(unit) = u.parse::<DosageUnit>();
            dose.dosage_unit = unit;
        }
        (None, None) => {}
    }
    if let Some(choice) = params.interval {
        dose.interval = resolve_interval(config, choice)?;
    }
    if let Some(r) = params.is_recurring {
        dose.is_recurring = r;
    }
    if let Some(n) = params.notes {
        dose.notes = if n.is_empty() { None } else { Some(n.to_string()) };
    }
    if let Some(t) = params.tags {
        dose.tags = parse_tags(t);
    }
    if let Some(g) = params.given_at {
        dose.given_at = g.trunc_subsecs(0);
    }

    validate::check_new_record(&dose, now)?;
    db.update_dose(&dose)?;
    info!(id = %dose.id, "dose edited");
    Ok(dose)
}

/// Permanently remove a dose. Returns the removed record.
pub fn delete_dose(db: &Database, id: &str) -> Result<DoseRecord> {
    let dose = require(db, id)?;
    db.delete_dose(id)?;
    info!(id = %id, name = %dose.name, "dose deleted");
    Ok(dose)
}

// ---------------------------------------------------------------------------
// Dashboard actions
// ---------------------------------------------------------------------------

/// Give the same medicine again now.
///
/// The source record is not modified. Calling this again inside the
/// duplicate window returns the repeat already created instead of adding
/// another.
pub fn record_repeat_dose(db: &Database, source_id: &str, now: DateTime<Utc>) -> Result<RepeatOutcome> {
    let source = require(db, source_id)?;
    let now = now.trunc_subsecs(0);

    let repeat = DoseRecord {
        id: Uuid::new_v4().to_string(),
        subject_id: source.subject_id.clone(),
        name: source.name.clone(),
        dosage: source.dosage,
        dosage_unit: source.dosage_unit.clone(),
        given_at: now,
        interval: source.interval,
        is_recurring: source.is_recurring,
        active: true,
        notes: Some(format!("Repeated dose of {}", source.name)),
        tags: source.tags.clone(),
        created_at: now,
    };

    if let Some(existing) =
        db.find_similar_dose(&repeat, now, validate::duplicate_window(), Some(&source.id))?
    {
        debug!(existing = %existing.id, source = %source.id, "repeat already recorded");
        return Ok(RepeatOutcome {
            record: existing,
            created: false,
        });
    }

    validate::check_record(&repeat)?;
    db.insert_dose(&repeat)?;
    info!(id = %repeat.id, source = %source.id, name = %repeat.name, "dose repeated");
    Ok(RepeatOutcome {
        record: repeat,
        created: true,
    })
}

/// Drop a dose from the active status view. History is kept.
pub fn deactivate(db: &Database, id: &str) -> Result<DoseRecord> {
    let mut dose = require(db, id)?;
    if dose.active {
        db.set_dose_active(id, false)?;
        dose.active = false;
        info!(id = %id, name = %dose.name, "dose removed from active list");
    }
    Ok(dose)
}
