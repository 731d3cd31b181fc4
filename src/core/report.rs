use anyhow::Result;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::db::{Database, DoseFilter};
use crate::models::dose::DoseRecord;

#[derive(Debug, Serialize, PartialEq)]
pub struct DayCount {
    pub date: NaiveDate,
    pub count: u32,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct IntervalPoint {
    /// When the later dose of the pair was given.
    pub at: DateTime<Utc>,
    pub hours: f64,
    pub label: String,
}

/// Which doses a report covers. Dates are inclusive, in UTC.
#[derive(Debug, Default)]
pub struct ReportScope<'a> {
    pub subject: Option<&'a str>,
    pub name: Option<&'a str>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

fn start_of(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0).map(|dt| Utc.from_utc_datetime(&dt))
}

/// Doses in scope, oldest first.
pub fn load(db: &Database, scope: &ReportScope<'_>) -> Result<Vec<DoseRecord>> {
    let filter = DoseFilter {
        subject_id: scope.subject.map(String::from),
        name: scope.name.map(String::from),
        since: scope.from.and_then(start_of),
        until: scope
            .to
            .and_then(|d| d.succ_opt())
            .and_then(start_of),
        ..DoseFilter::default()
    };
    let mut doses = db.list_doses(&filter)?;
    doses.reverse();
    Ok(doses)
}

/// Number of doses per day.
pub fn frequency(records: &[DoseRecord]) -> Vec<DayCount> {
    let mut days: BTreeMap<NaiveDate, u32> = BTreeMap::new();
    for r in records {
        *days.entry(r.given_at.date_naive()).or_default() += 1;
    }
    days.into_iter()
        .map(|(date, count)| DayCount { date, count })
        .collect()
}

/// Gaps between consecutive doses. Zero or negative gaps are dropped.
pub fn intervals(records: &[DoseRecord]) -> Vec<IntervalPoint> {
    let mut sorted: Vec<&DoseRecord> = records.iter().collect();
    sorted.sort_by_key(|r| r.given_at);

    sorted
        .windows(2)
        .filter_map(|pair| {
            let gap = pair[1].given_at - pair[0].given_at;
            (gap > Duration::zero()).then(|| IntervalPoint {
                at: pair[1].given_at,
                hours: gap.num_seconds() as f64 / 3600.0,
                label: hms_label(gap),
            })
        })
        .collect()
}

/// Compact `XhYmZs` label.
pub fn hms_label(d: Duration) -> String {
    let secs = d.num_seconds();
    format!("{}h{}m{}s", secs / 3600, (secs % 3600) / 60, secs % 60)
}
