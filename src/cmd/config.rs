use anyhow::Result;
use serde_json::json;

use babytrack::models::config::Config;
use babytrack::models::dose::DoseInterval;
use babytrack::output;

pub fn run_show(human: bool) -> Result<()> {
    let config = Config::load()?;
    if human {
        let toml_str = toml::to_string_pretty(&config)?;
        println!("{}", toml_str);
    } else {
        let out = output::success("config", json!({ "config": config }));
        println!("{}", serde_json::to_string(&out)?);
    }
    Ok(())
}

fn parse_optional_hours(value: &str) -> Result<Option<u32>> {
    match value.trim() {
        "" | "none" | "off" => Ok(None),
        v => Ok(Some(v.parse()?)),
    }
}

pub fn run_set(key: &str, value: &str) -> Result<()> {
    let mut config = Config::load()?;

    match key {
        "defaults.child" => {
            config.defaults.child = Some(value.trim().to_string()).filter(|c| !c.is_empty());
        }
        "defaults.interval" => {
            value.parse::<DoseInterval>()?;
            config.defaults.interval = value.trim().to_string();
        }
        "dashboard.lookback_hours" => config.dashboard.lookback_hours = value.parse()?,
        "dashboard.status_limit" => config.dashboard.status_limit = value.parse()?,
        "dashboard.due_limit" => config.dashboard.due_limit = value.parse()?,
        "dashboard.hide_last_after_hours" => {
            config.dashboard.hide_last_after_hours = parse_optional_hours(value)?;
        }
        "logging.filter" => config.logging.filter = value.to_string(),
        k if k.starts_with("alias.") => {
            let alias = &k["alias.".len()..];
            if alias.is_empty() {
                anyhow::bail!("alias name is empty");
            }
            config.aliases.insert(alias.to_string(), value.to_string());
        }
        _ => anyhow::bail!("unknown config key: {}", key),
    }

    config.save()?;
    let out = output::success("config", json!({ "key": key, "value": value }));
    println!("{}", serde_json::to_string(&out)?);
    Ok(())
}
