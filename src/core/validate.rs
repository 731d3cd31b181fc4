use chrono::{DateTime, Duration, Utc};

use crate::error::DoseError;
use crate::models::dose::{DosageUnit, DoseInterval, DoseRecord};

/// Two matching doses this close together are treated as the same entry.
pub const DUPLICATE_WINDOW_MINUTES: i64 = 5;

pub fn duplicate_window() -> Duration {
    Duration::minutes(DUPLICATE_WINDOW_MINUTES)
}

fn max_interval() -> String {
    DoseInterval::from_minutes(DoseInterval::MAX_MINUTES)
        .map(|i| i.to_string())
        .unwrap_or_default()
}

/// Inclusive plausibility range for a unit, if it has one.
pub fn dosage_limits(unit: &DosageUnit) -> Option<(f64, f64)> {
    match unit {
        DosageUnit::Mg => Some((0.1, 10000.0)),
        DosageUnit::Ml => Some((0.1, 500.0)),
        DosageUnit::Tablet => Some((0.5, 50.0)),
        DosageUnit::Drop => Some((1.0, 100.0)),
        DosageUnit::Tsp => Some((0.1, 20.0)),
        DosageUnit::Tbsp => Some((0.1, 10.0)),
        DosageUnit::Other(_) => None,
    }
}

pub fn check_dosage(amount: f64) -> Result<(), DoseError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(DoseError::validation("dosage", "Dosage must be positive"));
    }
    Ok(())
}

pub fn check_dosage_limits(amount: f64, unit: &DosageUnit) -> Result<(), DoseError> {
    check_dosage(amount)?;

    if *unit == DosageUnit::Tablet && amount.fract() != 0.0 {
        return Err(DoseError::validation(
            "dosage",
            "Tablet dosage must be a whole number",
        ));
    }

    if let Some((min, max)) = dosage_limits(unit)
        && !(min..=max).contains(&amount)
    {
        return Err(DoseError::validation(
            "dosage",
            format!("Dosage for {unit} must be between {min} and {max}"),
        ));
    }
    Ok(())
}

pub fn check_not_future(given_at: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), DoseError> {
    if given_at > now {
        return Err(DoseError::validation(
            "given_at",
            "Date/time can not be in the future.",
        ));
    }
    Ok(())
}

/// Structural invariants every stored record must satisfy.
pub fn check_record(record: &DoseRecord) -> Result<(), DoseError> {
    if record.subject_id.trim().is_empty() {
        return Err(DoseError::validation("subject_id", "a child is required"));
    }
    if record.name.trim().is_empty() {
        return Err(DoseError::validation("name", "a medicine name is required"));
    }
    check_dosage(record.dosage)?;
    if let Some(interval) = record.interval
        && !(0..=DoseInterval::MAX_MINUTES).contains(&interval.minutes())
    {
        return Err(DoseError::validation(
            "interval",
            format!("Next dose interval must be between 0m and {}", max_interval()),
        ));
    }
    Ok(())
}

/// Full checks applied before a record is created or edited.
pub fn check_new_record(record: &DoseRecord, now: DateTime<Utc>) -> Result<(), DoseError> {
    check_record(record)?;
    check_dosage_limits(record.dosage, &record.dosage_unit)?;
    check_not_future(record.given_at, now)
}
