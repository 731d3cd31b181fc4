use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "babytrack", version, about = "Medicine dose tracker for children")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as human-readable text instead of JSON
    #[arg(long = "human", short = 'H', global = true)]
    pub human: bool,

    /// Override the current time (RFC 3339, e.g. 2024-01-01T15:00:00Z)
    #[arg(long, global = true)]
    pub now: Option<DateTime<Utc>>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize config and data directory
    Init {
        /// Skip interactive setup, use defaults
        #[arg(long)]
        skip: bool,
    },

    /// Record and manage doses
    Dose {
        #[command(subcommand)]
        action: DoseAction,
    },

    /// Last medicine, medicine due and active medicine status for a child
    Dashboard {
        /// Child id (default: defaults.child)
        #[arg(long)]
        child: Option<String>,
    },

    /// Dose history reports
    Report {
        #[command(subcommand)]
        kind: ReportKind,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Print shell completions
    Completions {
        shell: Shell,
    },
}

impl Commands {
    /// Name reported in the JSON envelope.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::Dose { action } => match action {
                DoseAction::Add { .. } => "dose_add",
                DoseAction::List { .. } => "dose_list",
                DoseAction::Show { .. } => "dose_show",
                DoseAction::Edit { .. } => "dose_edit",
                DoseAction::Delete { .. } => "dose_delete",
                DoseAction::Repeat { .. } => "dose_repeat",
                DoseAction::Deactivate { .. } => "dose_deactivate",
                DoseAction::Presets => "dose_presets",
            },
            Self::Dashboard { .. } => "dashboard",
            Self::Report { kind } => match kind {
                ReportKind::Frequency(_) => "report_frequency",
                ReportKind::Intervals(_) => "report_intervals",
            },
            Self::Config { .. } => "config",
            Self::Completions { .. } => "completions",
        }
    }
}

/// Interval options shared by `dose add` and `dose edit`.
#[derive(Args, Debug, Default)]
pub struct IntervalArgs {
    /// Interval between doses, e.g. 4h, "1d 6h", 30m or 0:6:0
    #[arg(long, conflicts_with_all = ["days", "hours", "minutes", "no_interval"])]
    pub interval: Option<String>,

    /// Interval days (0-365, clamped)
    #[arg(long, allow_negative_numbers = true)]
    pub days: Option<i64>,

    /// Interval hours (0-23, clamped)
    #[arg(long, allow_negative_numbers = true)]
    pub hours: Option<i64>,

    /// Interval minutes (0-59, clamped)
    #[arg(long, allow_negative_numbers = true)]
    pub minutes: Option<i64>,

    /// No interval: the medicine can be given at any time
    #[arg(long, conflicts_with_all = ["days", "hours", "minutes"])]
    pub no_interval: bool,
}

impl IntervalArgs {
    pub fn has_fields(&self) -> bool {
        self.days.is_some() || self.hours.is_some() || self.minutes.is_some()
    }
}

#[derive(Subcommand)]
pub enum DoseAction {
    /// Record a dose that was just given (or at --at)
    Add {
        /// Medicine name or alias
        name: String,

        /// Amount, optionally with unit: 5, 2.5ml, "1/2 tablet"
        dosage: String,

        /// Dosage unit (mg, ml, tablet, drop, tsp, tbsp, ...)
        #[arg(long)]
        unit: Option<String>,

        /// Child id (default: defaults.child)
        #[arg(long)]
        child: Option<String>,

        #[command(flatten)]
        interval: IntervalArgs,

        /// Scheduled medicine (label "Dose Interval" instead of "Safety Window")
        #[arg(long)]
        recurring: bool,

        /// Free-text note
        #[arg(long)]
        note: Option<String>,

        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,

        /// When the dose was given (RFC 3339, default: now)
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// List doses, newest first, with next-dose status
    List {
        /// Only this child
        #[arg(long)]
        child: Option<String>,

        /// Only this medicine (case-insensitive)
        #[arg(long)]
        name: Option<String>,

        /// Number of recent entries to show
        #[arg(long)]
        last: Option<u32>,

        /// Only doses still on the active list
        #[arg(long)]
        active: bool,
    },

    /// Show one dose
    Show {
        id: String,
    },

    /// Edit a recorded dose
    Edit {
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        dosage: Option<String>,

        #[arg(long)]
        unit: Option<String>,

        #[command(flatten)]
        interval: IntervalArgs,

        /// Mark as scheduled (true) or as-needed (false)
        #[arg(long)]
        recurring: Option<bool>,

        /// New note; an empty string clears it
        #[arg(long)]
        note: Option<String>,

        #[arg(long)]
        tags: Option<String>,

        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// Permanently delete a dose
    Delete {
        id: String,
    },

    /// Give the same medicine again now
    Repeat {
        id: String,
    },

    /// Remove a dose from the active status list (history is kept)
    Deactivate {
        id: String,
    },

    /// List the common interval presets
    Presets,
}

/// Scope shared by the report kinds.
#[derive(Args, Debug)]
pub struct ReportArgs {
    #[arg(long)]
    pub child: Option<String>,

    /// Only this medicine (case-insensitive)
    #[arg(long)]
    pub name: Option<String>,

    /// First day included (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last day included (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<NaiveDate>,
}

#[derive(Subcommand)]
pub enum ReportKind {
    /// Doses per day
    Frequency(ReportArgs),
    /// Time between consecutive doses
    Intervals(ReportArgs),
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set a config value
    Set {
        /// Config key (e.g. defaults.child, defaults.interval, alias.tyl)
        key: String,
        /// Config value
        value: String,
    },
}
