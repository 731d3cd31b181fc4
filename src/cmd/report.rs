use anyhow::Result;
use serde_json::json;

use babytrack::core::report::{self, ReportScope};
use babytrack::db::Database;
use babytrack::models::config::Config;
use babytrack::output;
use babytrack::output::human;

use crate::cli::{ReportArgs, ReportKind};

pub fn run(kind: ReportKind, human_flag: bool) -> Result<()> {
    let config = Config::load()?;
    let db = Database::open(&Config::db_path())?;

    let (args, is_frequency) = match &kind {
        ReportKind::Frequency(a) => (a, true),
        ReportKind::Intervals(a) => (a, false),
    };
    let ReportArgs {
        child,
        name,
        from,
        to,
    } = args;
    if let (Some(f), Some(t)) = (from, to)
        && f > t
    {
        anyhow::bail!("--from ({f}) is after --to ({t})");
    }

    let subject = child.clone().or_else(|| config.defaults.child.clone());
    let name = name.as_deref().map(|n| config.resolve_alias(n));
    let scope = ReportScope {
        subject: subject.as_deref(),
        name: name.as_deref(),
        from: *from,
        to: *to,
    };
    let records = report::load(&db, &scope)?;

    if is_frequency {
        let days = report::frequency(&records);
        if human_flag {
            println!("{}", human::format_frequency(&days));
        } else {
            let out = output::success(
                "report_frequency",
                json!({ "total": records.len(), "days": days }),
            );
            println!("{}", serde_json::to_string(&out)?);
        }
    } else {
        let points = report::intervals(&records);
        if human_flag {
            println!("{}", human::format_intervals(&points));
        } else {
            let out = output::success("report_intervals", json!({ "intervals": points }));
            println!("{}", serde_json::to_string(&out)?);
        }
    }
    Ok(())
}
