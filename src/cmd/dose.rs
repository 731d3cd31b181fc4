use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::json;

use babytrack::core::dose::{self, EditDoseParams, IntervalChoice, LogDoseParams};
use babytrack::core::scheduler;
use babytrack::db::{Database, DoseFilter};
use babytrack::models::config::Config;
use babytrack::models::dose::{COMMON_INTERVALS, IntervalInput};
use babytrack::output;
use babytrack::output::human;

use crate::cli::{DoseAction, IntervalArgs};

/// `None` when no interval option was given.
fn interval_choice(args: &IntervalArgs) -> Option<IntervalChoice<'_>> {
    if args.no_interval {
        Some(IntervalChoice::Unrestricted)
    } else if let Some(ref text) = args.interval {
        Some(IntervalChoice::Text(text))
    } else if args.has_fields() {
        Some(IntervalChoice::Fields(IntervalInput {
            days: args.days.unwrap_or(0),
            hours: args.hours.unwrap_or(0),
            minutes: args.minutes.unwrap_or(0),
        }))
    } else {
        None
    }
}

fn print_status(command: &str, status: &scheduler::DoseStatus, human_flag: bool) -> Result<()> {
    if human_flag {
        println!("{}", human::format_dose_detail(status));
    } else {
        let out = output::success(command, serde_json::to_value(status)?);
        println!("{}", serde_json::to_string(&out)?);
    }
    Ok(())
}

pub fn run(action: DoseAction, now: DateTime<Utc>, human_flag: bool) -> Result<()> {
    let config = Config::load()?;
    let db = Database::open(&Config::db_path())?;

    match action {
        DoseAction::Add {
            name,
            dosage,
            unit,
            child,
            interval,
            recurring,
            note,
            tags,
            at,
        } => {
            let subject = config.resolve_child(child.as_deref())?;
            let record = dose::log_dose(
                &db,
                &config,
                LogDoseParams {
                    subject: &subject,
                    name: &name,
                    dosage: &dosage,
                    unit: unit.as_deref(),
                    interval: interval_choice(&interval).unwrap_or(IntervalChoice::Default),
                    is_recurring: recurring,
                    notes: note.as_deref(),
                    tags: tags.as_deref(),
                    given_at: at,
                },
                now,
            )?;
            let status = scheduler::evaluate(&record, now);
            if human_flag {
                println!("Logged {}", human::format_dose_line(&record));
                println!("  {}", human::format_interval(&status));
                println!("  {}", human::format_next_dose(&status));
            } else {
                print_status("dose_add", &status, false)?;
            }
        }

        DoseAction::List {
            child,
            name,
            last,
            active,
        } => {
            let filter = DoseFilter {
                subject_id: child.or_else(|| config.defaults.child.clone()),
                name: name.map(|n| config.resolve_alias(&n)),
                active_only: active,
                limit: last,
                ..DoseFilter::default()
            };
            let statuses = dose::list_view(&db, &filter, now)?;
            if human_flag {
                println!("{}", human::format_dose_list(&statuses));
            } else {
                let out = output::success(
                    "dose_list",
                    json!({ "count": statuses.len(), "doses": statuses }),
                );
                println!("{}", serde_json::to_string(&out)?);
            }
        }

        DoseAction::Show { id } => {
            let record = dose::get_dose(&db, &id)?;
            print_status("dose_show", &scheduler::evaluate(&record, now), human_flag)?;
        }

        DoseAction::Edit {
            id,
            name,
            dosage,
            unit,
            interval,
            recurring,
            note,
            tags,
            at,
        } => {
            let params = EditDoseParams {
                name: name.as_deref(),
                dosage: dosage.as_deref(),
                unit: unit.as_deref(),
                interval: interval_choice(&interval),
                is_recurring: recurring,
                notes: note.as_deref(),
                tags: tags.as_deref(),
                given_at: at,
            };
            let record = dose::edit_dose(&db, &config, &id, params, now)?;
            if human_flag {
                println!("Updated {}", human::format_dose_line(&record));
            } else {
                print_status("dose_edit", &scheduler::evaluate(&record, now), false)?;
            }
        }

        DoseAction::Delete { id } => {
            let record = dose::delete_dose(&db, &id)?;
            if human_flag {
                println!("Deleted {}", human::format_dose_line(&record));
            } else {
                let out = output::success(
                    "dose_delete",
                    json!({ "deleted": true, "id": record.id, "name": record.name }),
                );
                println!("{}", serde_json::to_string(&out)?);
            }
        }

        DoseAction::Repeat { id } => {
            let outcome = dose::record_repeat_dose(&db, &id, now)?;
            let status = scheduler::evaluate(&outcome.record, now);
            if human_flag {
                let verb = if outcome.created {
                    "Repeated"
                } else {
                    "Already repeated"
                };
                println!("{} {}", verb, human::format_dose_line(&outcome.record));
                println!("  {}", human::format_next_dose(&status));
            } else {
                let out = output::success(
                    "dose_repeat",
                    json!({ "created": outcome.created, "dose": status }),
                );
                println!("{}", serde_json::to_string(&out)?);
            }
        }

        DoseAction::Deactivate { id } => {
            let record = dose::deactivate(&db, &id)?;
            if human_flag {
                println!("Removed {} from the active list", record.name);
            } else {
                let out = output::success(
                    "dose_deactivate",
                    json!({ "id": record.id, "name": record.name, "active": record.active }),
                );
                println!("{}", serde_json::to_string(&out)?);
            }
        }

        DoseAction::Presets => {
            if human_flag {
                for (value, label) in COMMON_INTERVALS {
                    println!("{:<8} {}", value, label);
                }
            } else {
                let presets: Vec<_> = COMMON_INTERVALS
                    .iter()
                    .map(|(value, label)| json!({ "value": value, "label": label }))
                    .collect();
                let out = output::success("dose_presets", json!({ "presets": presets }));
                println!("{}", serde_json::to_string(&out)?);
            }
        }
    }
    Ok(())
}
