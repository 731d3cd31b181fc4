//! Dose timing rules.
//!
//! Every readiness decision in the crate goes through [`evaluate`]: the list
//! view, the three dashboard cards and the JSON output all read the same
//! [`DoseStatus`], so they cannot disagree about a record at a given instant.

use chrono::{DateTime, Duration, Utc};
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::{debug, warn};

use crate::core::validate;
use crate::models::dose::{DoseInterval, DoseRecord, IntervalInput};

pub const DOSE_INTERVAL_LABEL: &str = "Dose Interval";
pub const SAFETY_WINDOW_LABEL: &str = "Safety Window";

/// When the next dose is permitted. `None` means no interval is configured.
///
/// A configured interval always yields a time; if the sum overflows it
/// saturates at the latest representable instant, so the dose stays waiting.
pub fn next_dose_time(record: &DoseRecord) -> Option<DateTime<Utc>> {
    let interval = record.interval.filter(|i| !i.is_zero())?;
    Some(
        record
            .given_at
            .checked_add_signed(interval.as_duration())
            .unwrap_or(DateTime::<Utc>::MAX_UTC),
    )
}

pub fn is_ready(record: &DoseRecord, now: DateTime<Utc>) -> bool {
    match next_dose_time(record) {
        None => true,
        Some(next) => now >= next,
    }
}

/// Remaining wait, never negative.
pub fn time_until_ready(record: &DoseRecord, now: DateTime<Utc>) -> Duration {
    next_dose_time(record)
        .map(|next| (next - now).max(Duration::zero()))
        .unwrap_or_else(Duration::zero)
}

/// How long ago the next dose became permitted, if it already has.
pub fn overdue_by(record: &DoseRecord, now: DateTime<Utc>) -> Option<Duration> {
    next_dose_time(record)
        .filter(|next| now >= *next)
        .map(|next| now - next)
}

/// Display name for the interval field. The arithmetic does not change.
pub fn classify_label(is_recurring: bool) -> &'static str {
    if is_recurring {
        DOSE_INTERVAL_LABEL
    } else {
        SAFETY_WINDOW_LABEL
    }
}

/// `"Safe to give"`, `"Wait 1h 5m"` or `"Wait 5m"`.
pub fn status_text(record: &DoseRecord, now: DateTime<Utc>) -> String {
    if is_ready(record, now) {
        return "Safe to give".to_string();
    }
    let secs = time_until_ready(record, now).num_seconds();
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    if hours > 0 {
        format!("Wait {hours}h {minutes}m")
    } else {
        format!("Wait {minutes}m")
    }
}

/// Interval composed from the three entry fields plus its label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalEntry {
    pub interval: DoseInterval,
    pub label: &'static str,
}

pub fn interval_entry(input: IntervalInput, is_recurring: bool) -> IntervalEntry {
    IntervalEntry {
        interval: input.compose(),
        label: classify_label(is_recurring),
    }
}

// ---------------------------------------------------------------------------
// DoseStatus
// ---------------------------------------------------------------------------

fn as_seconds<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_i64(d.num_seconds())
}

fn as_opt_seconds<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
    match d {
        Some(d) => s.serialize_some(&d.num_seconds()),
        None => s.serialize_none(),
    }
}

/// A record together with everything derived from it at one instant.
#[derive(Debug, Clone, Serialize)]
pub struct DoseStatus {
    pub record: DoseRecord,
    pub is_ready: bool,
    pub next_dose_time: Option<DateTime<Utc>>,
    #[serde(rename = "time_until_ready_secs", serialize_with = "as_seconds")]
    pub time_until_ready: Duration,
    #[serde(rename = "overdue_secs", serialize_with = "as_opt_seconds")]
    pub overdue_by: Option<Duration>,
    pub label: &'static str,
    pub status_text: String,
}

pub fn evaluate(record: &DoseRecord, now: DateTime<Utc>) -> DoseStatus {
    DoseStatus {
        record: record.clone(),
        is_ready: is_ready(record, now),
        next_dose_time: next_dose_time(record),
        time_until_ready: time_until_ready(record, now),
        overdue_by: overdue_by(record, now),
        label: classify_label(record.is_recurring),
        status_text: status_text(record, now),
    }
}

/// Reduce doses given within `lookback` of `now` to the latest per medicine.
///
/// Medicines are matched by case-insensitive name. Malformed records are
/// logged and skipped. The result is ordered most recent first.
pub fn aggregate_status(
    records: &[DoseRecord],
    now: DateTime<Utc>,
    lookback: Duration,
) -> Vec<DoseStatus> {
    let since = now - lookback;
    let mut latest: HashMap<String, &DoseRecord> = HashMap::new();

    for record in records {
        if let Err(e) = validate::check_record(record) {
            warn!(id = %record.id, error = %e, "skipping malformed dose record");
            continue;
        }
        if record.given_at < since {
            continue;
        }
        match latest.entry(record.medicine_key()) {
            Entry::Occupied(mut slot) => {
                if record.given_at > slot.get().given_at {
                    slot.insert(record);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
        }
    }

    let mut statuses: Vec<DoseStatus> = latest.into_values().map(|r| evaluate(r, now)).collect();
    statuses.sort_by(|a, b| {
        b.record
            .given_at
            .cmp(&a.record.given_at)
            .then_with(|| a.record.name.cmp(&b.record.name))
    });
    debug!(
        input = records.len(),
        medicines = statuses.len(),
        "aggregated dose status"
    );
    statuses
}

/// Ready entries that have a schedule, soonest next dose first.
pub fn due_now(statuses: Vec<DoseStatus>) -> Vec<DoseStatus> {
    let mut due: Vec<DoseStatus> = statuses
        .into_iter()
        .filter(|s| s.is_ready && s.next_dose_time.is_some())
        .collect();
    due.sort_by_key(|s| s.next_dose_time);
    due
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dose::DosageUnit;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, m, 0).unwrap()
    }

    fn dose(name: &str, given_at: DateTime<Utc>, interval_minutes: Option<i64>) -> DoseRecord {
        let mut r = DoseRecord::new("ada", name, 5.0, DosageUnit::Ml);
        r.given_at = given_at;
        r.interval = interval_minutes.and_then(DoseInterval::from_minutes);
        r
    }

    #[test]
    fn four_hour_window_scenario() {
        let r = dose("Tylenol", at(8, 0), Some(240));
        assert_eq!(next_dose_time(&r), Some(at(12, 0)));
        assert!(!is_ready(&r, at(11, 0)));
        assert_eq!(time_until_ready(&r, at(11, 0)), Duration::hours(1));
        assert!(is_ready(&r, at(12, 0)));
        assert_eq!(time_until_ready(&r, at(12, 0)), Duration::zero());
    }

    #[test]
    fn longest_interval_waits_inside_window() {
        let mut r = dose("Amoxicillin", at(8, 0), None);
        r.interval = DoseInterval::from_minutes(DoseInterval::MAX_MINUTES);
        let next = next_dose_time(&r).unwrap();
        assert_eq!(next - at(8, 0), Duration::minutes(DoseInterval::MAX_MINUTES));
        assert!(!is_ready(&r, at(9, 0)));
        assert!(!is_ready(&r, at(8, 0) + Duration::days(365)));
        assert!(is_ready(&r, next));
    }

    #[test]
    fn overflowing_sum_never_reads_as_ready() {
        let mut r = dose("Tylenol", DateTime::<Utc>::MAX_UTC - Duration::hours(1), Some(240));
        r.created_at = r.given_at;
        assert_eq!(next_dose_time(&r), Some(DateTime::<Utc>::MAX_UTC));
        assert!(!is_ready(&r, r.given_at));
        assert_eq!(status_text(&r, r.given_at), "Wait 1h 0m");
    }

    #[test]
    fn missing_or_zero_interval_is_unrestricted() {
        let none = dose("Tylenol", at(8, 0), None);
        let zero = dose("Tylenol", at(8, 0), Some(0));
        for r in [&none, &zero] {
            assert_eq!(next_dose_time(r), None);
            assert!(is_ready(r, at(8, 0)));
            assert_eq!(time_until_ready(r, at(8, 0)), Duration::zero());
            assert_eq!(overdue_by(r, at(9, 0)), None);
        }
    }

    #[test]
    fn overdue_counts_from_next_dose_time() {
        let r = dose("Tylenol", at(8, 0), Some(60));
        assert_eq!(overdue_by(&r, at(8, 30)), None);
        assert_eq!(overdue_by(&r, at(9, 0)), Some(Duration::zero()));
        assert_eq!(overdue_by(&r, at(10, 15)), Some(Duration::minutes(75)));
    }

    #[test]
    fn labels_do_not_touch_arithmetic() {
        let mut r = dose("Amoxicillin", at(8, 0), Some(480));
        let as_needed = next_dose_time(&r);
        r.is_recurring = true;
        assert_eq!(next_dose_time(&r), as_needed);
        assert_eq!(classify_label(true), "Dose Interval");
        assert_eq!(classify_label(false), "Safety Window");
    }

    #[test]
    fn status_text_formats() {
        let r = dose("Tylenol", at(8, 0), Some(240));
        assert_eq!(status_text(&r, at(10, 55)), "Wait 1h 5m");
        assert_eq!(status_text(&r, at(11, 55)), "Wait 5m");
        assert_eq!(status_text(&r, at(12, 0)), "Safe to give");
    }

    #[test]
    fn evaluate_is_consistent_with_parts() {
        let r = dose("Tylenol", at(8, 0), Some(240));
        let s = evaluate(&r, at(11, 0));
        assert_eq!(s.is_ready, is_ready(&r, at(11, 0)));
        assert_eq!(s.next_dose_time, next_dose_time(&r));
        assert_eq!(s.label, SAFETY_WINDOW_LABEL);
        assert_eq!(s.status_text, "Wait 1h 0m");
    }

    #[test]
    fn status_serializes_durations_as_seconds() {
        let r = dose("Tylenol", at(8, 0), Some(240));
        let v = serde_json::to_value(evaluate(&r, at(11, 0))).unwrap();
        assert_eq!(v["time_until_ready_secs"], 3600);
        assert!(v["overdue_secs"].is_null());
        assert_eq!(v["is_ready"], false);
    }

    #[test]
    fn interval_entry_clamps_and_labels() {
        let entry = interval_entry(
            IntervalInput {
                days: 400,
                hours: 30,
                minutes: 90,
            },
            true,
        );
        assert_eq!(entry.interval.parts(), (365, 23, 59));
        assert_eq!(entry.label, DOSE_INTERVAL_LABEL);
    }

    #[test]
    fn aggregate_keeps_latest_per_medicine() {
        let records = vec![
            dose("Tylenol", at(8, 0), Some(240)),
            dose("tylenol", at(14, 0), Some(240)),
            dose("Motrin", at(9, 0), Some(360)),
        ];
        let out = aggregate_status(&records, at(15, 0), Duration::hours(48));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].record.given_at, at(14, 0));
        assert!(!out[0].is_ready);
        assert_eq!(out[1].record.name, "Motrin");
        assert!(out[1].is_ready);
    }

    #[test]
    fn aggregate_skips_malformed_and_old() {
        let mut bad = dose("Tylenol", at(14, 0), Some(240));
        bad.dosage = -1.0;
        let old = dose("Motrin", at(8, 0) - Duration::days(3), Some(240));
        let good = dose("Tylenol", at(8, 0), Some(240));
        let out = aggregate_status(&[bad, old, good], at(15, 0), Duration::hours(48));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].record.given_at, at(8, 0));
    }

    #[test]
    fn due_now_orders_by_next_dose() {
        let records = vec![
            dose("Tylenol", at(9, 0), Some(120)),
            dose("Motrin", at(8, 0), Some(60)),
            dose("Vitamin D", at(10, 0), None),
            dose("Amoxicillin", at(14, 0), Some(480)),
        ];
        let due = due_now(aggregate_status(&records, at(15, 0), Duration::hours(48)));
        let names: Vec<&str> = due.iter().map(|s| s.record.name.as_str()).collect();
        assert_eq!(names, vec!["Motrin", "Tylenol"]);
    }
}
