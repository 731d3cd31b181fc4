use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::models::dose::DoseInterval;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub dashboard: Dashboard,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Defaults {
    /// Child used when a command is not given `--child`.
    pub child: Option<String>,
    /// Interval applied to new doses that do not specify one.
    #[serde(default = "default_interval")]
    pub interval: String,
}

fn default_interval() -> String {
    "12h".to_string()
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            child: None,
            interval: default_interval(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Dashboard {
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: u32,
    #[serde(default = "default_status_limit")]
    pub status_limit: usize,
    #[serde(default = "default_due_limit")]
    pub due_limit: usize,
    /// Hide the "last medicine" card once its dose is older than this.
    pub hide_last_after_hours: Option<u32>,
}

fn default_lookback_hours() -> u32 {
    48
}
fn default_status_limit() -> usize {
    5
}
fn default_due_limit() -> usize {
    3
}

impl Default for Dashboard {
    fn default() -> Self {
        Self {
            lookback_hours: default_lookback_hours(),
            status_limit: default_status_limit(),
            due_limit: default_due_limit(),
            hide_last_after_hours: None,
        }
    }
}

impl Dashboard {
    pub fn lookback(&self) -> Duration {
        Duration::hours(i64::from(self.lookback_hours))
    }

    pub fn hide_last_after(&self) -> Option<Duration> {
        self.hide_last_after_hours
            .map(|h| Duration::hours(i64::from(h)))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Logging {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl Config {
    /// Load config from the standard path, or return defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::path();
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(toml::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to the standard path.
    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700))?;
            }
        }
        let contents = toml::to_string_pretty(self)?;

        #[cfg(unix)]
        {
            use std::fs::{self, OpenOptions};
            use std::io::Write;
            use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&path)?;
            file.write_all(contents.as_bytes())?;

            let mut perms = file.metadata()?.permissions();
            if perms.mode() & 0o777 != 0o600 {
                perms.set_mode(0o600);
                fs::set_permissions(&path, perms)?;
            }
        }
        #[cfg(not(unix))]
        {
            std::fs::write(&path, contents)?;
        }

        Ok(())
    }

    /// Resolve a medicine alias, or return the input unchanged.
    pub fn resolve_alias(&self, input: &str) -> String {
        self.aliases
            .get(input)
            .cloned()
            .unwrap_or_else(|| input.to_string())
    }

    /// The child a command applies to: the explicit one, else the configured default.
    pub fn resolve_child(&self, explicit: Option<&str>) -> anyhow::Result<String> {
        match explicit.or(self.defaults.child.as_deref()) {
            Some(c) if !c.trim().is_empty() => Ok(c.trim().to_string()),
            _ => anyhow::bail!("no child given; pass --child or set defaults.child"),
        }
    }

    pub fn default_interval(&self) -> anyhow::Result<DoseInterval> {
        self.defaults.interval.parse()
    }

    pub fn data_dir() -> PathBuf {
        if let Ok(home) = std::env::var("BABYTRACK_HOME") {
            return PathBuf::from(home);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".babytrack")
    }

    pub fn path() -> PathBuf {
        Self::data_dir().join("config.toml")
    }

    pub fn db_path() -> PathBuf {
        Self::data_dir().join("data.db")
    }
}
