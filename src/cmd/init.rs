use anyhow::Result;
use std::io::{self, Write};

use babytrack::db::Database;
use babytrack::models::config::Config;
use babytrack::models::dose::DoseInterval;

pub fn run(skip: bool) -> Result<()> {
    let mut config = Config::load().unwrap_or_default();

    if !skip {
        println!("babytrack — Initial Setup\n");

        let child = prompt_string("Child name (used when --child is not given)")?;
        if !child.is_empty() {
            config.defaults.child = Some(child);
        }
        config.defaults.interval = prompt_interval("Default interval", &config.defaults.interval)?;
    }

    config.save()?;
    Database::open(&Config::db_path())?;

    if skip {
        println!("Config initialized with defaults at {:?}", Config::path());
    } else {
        println!("\nSetup complete. Data stored in {:?}", Config::data_dir());
    }
    Ok(())
}

fn prompt_string(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;
    let mut buf = String::new();
    io::stdin().read_line(&mut buf)?;
    Ok(buf.trim().to_string())
}

fn prompt_interval(label: &str, current: &str) -> Result<String> {
    loop {
        let s = prompt_string(&format!("{label} [{current}]"))?;
        if s.is_empty() {
            return Ok(current.to_string());
        }
        match s.parse::<DoseInterval>() {
            Ok(_) => return Ok(s),
            Err(e) => println!("{e}"),
        }
    }
}
