use chrono::Duration;
use colored::Colorize;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};

use crate::core::dashboard::Dashboard;
use crate::core::report::{DayCount, IntervalPoint};
use crate::core::scheduler::DoseStatus;
use crate::models::dose::{DosageUnit, DoseRecord};

/// Compact duration: `"1d 2h"`, `"1h 5m"`, `"5m"`.
pub fn format_duration(d: Duration) -> String {
    let secs = d.num_seconds().max(0);
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3600;
    let minutes = (secs % 3600) / 60;
    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

pub fn format_amount(dosage: f64, unit: &DosageUnit) -> String {
    format!("{dosage} {unit}")
}

/// The list view's next-dose column.
pub fn format_next_dose(s: &DoseStatus) -> String {
    match (s.next_dose_time, s.overdue_by) {
        (None, _) => "No restriction".to_string(),
        (Some(_), Some(overdue)) if overdue < Duration::minutes(1) => "Due now".to_string(),
        (Some(_), Some(overdue)) => format!("Due {} ago", format_duration(overdue)),
        (Some(_), None) => format!("Next dose in {}", format_duration(s.time_until_ready)),
    }
}

pub fn format_interval(s: &DoseStatus) -> String {
    match s.record.interval {
        Some(i) if !i.is_zero() => match i.preset_label() {
            Some(preset) => format!("{}: {} ({})", s.label, i, preset),
            None => format!("{}: {}", s.label, i),
        },
        _ => format!("{}: none", s.label),
    }
}

fn badge_text(is_ready: bool) -> &'static str {
    if is_ready { "Ready" } else { "Wait" }
}

/// One-line summary of a stored dose.
pub fn format_dose_line(r: &DoseRecord) -> String {
    let ts = r.given_at.format("%Y-%m-%d %H:%M");
    let mut line = format!(
        "{} | {} {}",
        ts,
        r.name,
        format_amount(r.dosage, &r.dosage_unit)
    );
    if let Some(ref notes) = r.notes {
        line.push_str(&format!("  # {}", notes));
    }
    if !r.tags.is_empty() {
        let tags: Vec<&str> = r.tags.iter().map(String::as_str).collect();
        line.push_str(&format!("  [{}]", tags.join(", ")));
    }
    line
}

/// The medicine list: one row per dose with its Ready/Wait badge.
pub fn format_dose_list(statuses: &[DoseStatus]) -> String {
    if statuses.is_empty() {
        return "No doses recorded.".to_string();
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_BORDERS_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "Given", "Child", "Medicine", "Dosage", "Next dose", "Status", "Id",
        ]);

    for s in statuses {
        let r = &s.record;
        let badge = Cell::new(badge_text(s.is_ready)).fg(if s.is_ready {
            Color::Green
        } else {
            Color::Yellow
        });
        let mut name = r.name.clone();
        if !r.active {
            name.push_str(" (inactive)");
        }
        table.add_row(vec![
            Cell::new(r.given_at.format("%Y-%m-%d %H:%M")),
            Cell::new(&r.subject_id),
            Cell::new(name),
            Cell::new(format_amount(r.dosage, &r.dosage_unit)),
            Cell::new(format_next_dose(s)),
            badge,
            Cell::new(&r.id[..8.min(r.id.len())]),
        ]);
    }
    table.to_string()
}

/// Everything known about one dose.
pub fn format_dose_detail(s: &DoseStatus) -> String {
    let r = &s.record;
    let mut out = format_dose_line(r);
    out.push_str(&format!("\n  id:       {}", r.id));
    out.push_str(&format!("\n  child:    {}", r.subject_id));
    out.push_str(&format!("\n  {}", format_interval(s)));
    out.push_str(&format!(
        "\n  schedule: {}",
        if r.is_recurring { "recurring" } else { "as needed" }
    ));
    out.push_str(&format!("\n  next:     {}", format_next_dose(s)));
    out.push_str(&format!("\n  status:   {}", status_colored(s)));
    if !r.active {
        out.push_str("\n  (removed from active list)");
    }
    out
}

fn status_colored(s: &DoseStatus) -> String {
    if s.is_ready {
        s.status_text.green().to_string()
    } else {
        s.status_text.yellow().to_string()
    }
}

fn format_status_row(s: &DoseStatus) -> String {
    let r = &s.record;
    format!(
        "  {} {} — given {} — {}",
        r.name.bold(),
        format_amount(r.dosage, &r.dosage_unit),
        r.given_at.format("%H:%M %b %d"),
        status_colored(s),
    )
}

/// The three dashboard cards as text.
pub fn format_dashboard(d: &Dashboard) -> String {
    let mut out = format!("=== Medicine — {} ===\n", d.subject);

    out.push_str("\nLast medicine:\n");
    match (&d.last_medicine.status, d.last_medicine.hidden) {
        (Some(s), false) => {
            out.push_str(&format_status_row(s));
            out.push_str(&format!("\n  {}", format_next_dose(s)));
        }
        _ => out.push_str("  none recently"),
    }

    out.push_str("\n\nDue now:\n");
    if d.medicine_due.is_empty() {
        out.push_str("  nothing due");
    } else {
        let rows: Vec<String> = d
            .medicine_due
            .iter()
            .map(|s| format!("  {} — {}", s.record.name.bold(), format_next_dose(s)))
            .collect();
        out.push_str(&rows.join("\n"));
    }

    out.push_str("\n\nActive medicines:\n");
    if d.medicine_status.is_empty() {
        out.push_str("  none");
    } else {
        let rows: Vec<String> = d
            .medicine_status
            .iter()
            .map(|s| format!("{}  [{}]", format_status_row(s), s.label))
            .collect();
        out.push_str(&rows.join("\n"));
    }
    out
}

pub fn format_frequency(days: &[DayCount]) -> String {
    if days.is_empty() {
        return "No doses in this period.".to_string();
    }
    days.iter()
        .map(|d| format!("{}  {:>3}  {}", d.date, d.count, "#".repeat(d.count as usize)))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_intervals(points: &[IntervalPoint]) -> String {
    if points.is_empty() {
        return "Not enough doses to compute intervals.".to_string();
    }
    points
        .iter()
        .map(|p| format!("{}  {:>7.2}h  ({})", p.at.format("%Y-%m-%d %H:%M"), p.hours, p.label))
        .collect::<Vec<_>>()
        .join("\n")
}
