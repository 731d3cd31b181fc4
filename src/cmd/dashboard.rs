use anyhow::Result;
use chrono::{DateTime, Utc};

use babytrack::core::dashboard::{self, DashboardSettings};
use babytrack::db::Database;
use babytrack::models::config::Config;
use babytrack::output;
use babytrack::output::human;

pub fn run(child: Option<&str>, now: DateTime<Utc>, human_flag: bool) -> Result<()> {
    let config = Config::load()?;
    let subject = config.resolve_child(child)?;
    let db = Database::open(&Config::db_path())?;

    let settings = DashboardSettings::from(&config);
    let board = dashboard::compute(&db, &subject, &settings, now)?;

    if human_flag {
        println!("{}", human::format_dashboard(&board));
    } else {
        let out = output::success("dashboard", serde_json::to_value(&board)?);
        println!("{}", serde_json::to_string(&out)?);
    }
    Ok(())
}
