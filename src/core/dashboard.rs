use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::core::scheduler::{self, DoseStatus};
use crate::db::Database;
use crate::models::config::Config;
use crate::models::dose::DoseRecord;

/// Card limits and windows, usually taken from `[dashboard]` in the config.
#[derive(Debug, Clone)]
pub struct DashboardSettings {
    pub lookback: Duration,
    pub status_limit: usize,
    pub due_limit: usize,
    pub hide_last_after: Option<Duration>,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            lookback: Duration::hours(48),
            status_limit: 5,
            due_limit: 3,
            hide_last_after: None,
        }
    }
}

impl From<&Config> for DashboardSettings {
    fn from(config: &Config) -> Self {
        Self {
            lookback: config.dashboard.lookback(),
            status_limit: config.dashboard.status_limit,
            due_limit: config.dashboard.due_limit,
            hide_last_after: config.dashboard.hide_last_after(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LastMedicineCard {
    pub status: Option<DoseStatus>,
    /// The dose is older than the configured hide threshold.
    pub hidden: bool,
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub subject: String,
    pub generated_at: DateTime<Utc>,
    pub last_medicine: LastMedicineCard,
    pub medicine_due: Vec<DoseStatus>,
    pub medicine_status: Vec<DoseStatus>,
}

/// Most recent medicine given, whatever it was.
pub fn last_medicine(
    records: &[DoseRecord],
    now: DateTime<Utc>,
    settings: &DashboardSettings,
) -> LastMedicineCard {
    let status = scheduler::aggregate_status(records, now, settings.lookback)
        .into_iter()
        .next();
    let hidden = match (&status, settings.hide_last_after) {
        (Some(s), Some(threshold)) => now - s.record.given_at > threshold,
        _ => false,
    };
    LastMedicineCard { status, hidden }
}

/// Medicines whose next dose is due or overdue, soonest first.
pub fn medicine_due(
    records: &[DoseRecord],
    now: DateTime<Utc>,
    settings: &DashboardSettings,
) -> Vec<DoseStatus> {
    let mut due = scheduler::due_now(scheduler::aggregate_status(records, now, settings.lookback));
    due.truncate(settings.due_limit);
    due
}

/// Safe/wait status of recently given medicines still on the active list.
pub fn medicine_status(
    records: &[DoseRecord],
    now: DateTime<Utc>,
    settings: &DashboardSettings,
) -> Vec<DoseStatus> {
    let active: Vec<DoseRecord> = records.iter().filter(|r| r.active).cloned().collect();
    let mut statuses = scheduler::aggregate_status(&active, now, settings.lookback);
    statuses.truncate(settings.status_limit);
    statuses
}

/// All three cards for one child from a single read of recent doses.
pub fn compute(
    db: &Database,
    subject: &str,
    settings: &DashboardSettings,
    now: DateTime<Utc>,
) -> Result<Dashboard> {
    let records = db.list_recent(subject, now - settings.lookback)?;
    tracing::debug!(subject = %subject, records = records.len(), "building dashboard");

    Ok(Dashboard {
        subject: subject.to_string(),
        generated_at: now,
        last_medicine: last_medicine(&records, now, settings),
        medicine_due: medicine_due(&records, now, settings),
        medicine_status: medicine_status(&records, now, settings),
    })
}
