mod common;

use babytrack::core::scheduler;
use babytrack::error::DoseError;
use babytrack::output::human::{
    format_dose_detail, format_dose_list, format_dose_line, format_duration, format_next_dose,
};
use babytrack::output::{error, from_error, success};
use chrono::Duration;
use common::{at, make_dose};
use serde_json::json;

// ─── envelopes ────────────────────────────────────────────────────────────────

#[test]
fn test_success_envelope_structure() {
    let data = json!({"value": 42});
    let result = success("dose_add", data.clone());

    assert_eq!(result["status"], "ok");
    assert_eq!(result["command"], "dose_add");
    assert_eq!(result["data"], data);
    assert!(result["error"].is_null());
}

#[test]
fn test_error_envelope_structure() {
    let result = error("dose_show", "general_error", "boom");
    assert_eq!(result["status"], "error");
    assert!(result["data"].is_null());
    assert_eq!(result["error"]["code"], "general_error");
    assert_eq!(result["error"]["message"], "boom");
}

#[test]
fn test_from_error_validation_carries_field() {
    let err: anyhow::Error = DoseError::validation("dosage", "Dosage must be positive").into();
    let result = from_error("dose_add", &err);
    assert_eq!(result["error"]["code"], "validation_error");
    assert_eq!(result["error"]["field"], "dosage");
    assert_eq!(result["error"]["message"], "dosage: Dosage must be positive");
}

#[test]
fn test_from_error_not_found() {
    let err: anyhow::Error = DoseError::NotFound("abc".into()).into();
    let result = from_error("dose_repeat", &err);
    assert_eq!(result["error"]["code"], "not_found");
    assert!(result["error"].get("field").is_none());
}

#[test]
fn test_from_error_other_is_general() {
    let err = anyhow::anyhow!("disk full");
    let result = from_error("dose_add", &err);
    assert_eq!(result["error"]["code"], "general_error");
    assert_eq!(result["error"]["message"], "disk full");
}

// ─── human formatting ────────────────────────────────────────────────────────

#[test]
fn test_format_duration_compact() {
    assert_eq!(format_duration(Duration::minutes(5)), "5m");
    assert_eq!(format_duration(Duration::minutes(65)), "1h 5m");
    assert_eq!(format_duration(Duration::hours(26)), "1d 2h");
    assert_eq!(format_duration(Duration::seconds(-30)), "0m");
}

#[test]
fn test_format_next_dose_directions() {
    let r = make_dose("Tylenol", at(8, 0), Some(240));
    let pending = scheduler::evaluate(&r, at(11, 0));
    assert_eq!(format_next_dose(&pending), "Next dose in 1h 0m");

    let now = scheduler::evaluate(&r, at(12, 0));
    assert_eq!(format_next_dose(&now), "Due now");

    let overdue = scheduler::evaluate(&r, at(13, 30));
    assert_eq!(format_next_dose(&overdue), "Due 1h 30m ago");

    let free = scheduler::evaluate(&make_dose("Vitamin D", at(8, 0), None), at(9, 0));
    assert_eq!(format_next_dose(&free), "No restriction");
}

#[test]
fn test_format_dose_line_includes_note_and_tags() {
    let mut r = make_dose("Tylenol", at(8, 0), Some(240));
    r.dosage = 2.5;
    r.notes = Some("fever 38.5".into());
    r.tags = ["fever".to_string()].into();
    let line = format_dose_line(&r);
    assert_eq!(line, "2024-01-01 08:00 | Tylenol 2.5 ml  # fever 38.5  [fever]");
}

#[test]
fn test_format_dose_list_badges() {
    let ready = scheduler::evaluate(&make_dose("Motrin", at(6, 0), Some(60)), at(9, 0));
    let waiting = scheduler::evaluate(&make_dose("Tylenol", at(8, 0), Some(240)), at(9, 0));
    let table = format_dose_list(&[waiting, ready]);
    assert!(table.contains("Ready"));
    assert!(table.contains("Wait"));
    assert!(table.contains("Tylenol"));
    assert!(table.contains("Next dose in 3h 0m"));

    assert_eq!(format_dose_list(&[]), "No doses recorded.");
}

#[test]
fn test_format_dose_detail_shows_label() {
    let mut r = make_dose("Amoxicillin", at(8, 0), Some(480));
    r.is_recurring = true;
    let detail = format_dose_detail(&scheduler::evaluate(&r, at(9, 0)));
    assert!(detail.contains("Dose Interval: 8h (Every 8 hours)"));
    assert!(detail.contains("recurring"));
}
