mod cli;
mod cmd;

use chrono::Utc;
use clap::{CommandFactory, Parser};
use cli::{Cli, Commands, ConfigAction};
use std::process;

use babytrack::logging;
use babytrack::models::config::Config;
use babytrack::output;

fn main() {
    let cli = Cli::parse();

    let filter = Config::load()
        .map(|c| c.logging.filter)
        .unwrap_or_else(|_| "warn".to_string());
    logging::init(&filter);

    let now = cli.now.unwrap_or_else(Utc::now);
    let command = cli.command.name();

    let result = match cli.command {
        Commands::Init { skip } => cmd::init::run(skip),
        Commands::Dose { action } => cmd::dose::run(action, now, cli.human),
        Commands::Dashboard { child } => cmd::dashboard::run(child.as_deref(), now, cli.human),
        Commands::Report { kind } => cmd::report::run(kind, cli.human),
        Commands::Config { action } => match action {
            ConfigAction::Show => cmd::config::run_show(cli.human),
            ConfigAction::Set { key, value } => cmd::config::run_set(&key, &value),
        },
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "babytrack", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        tracing::debug!(error = ?e, "command failed");
        let err = output::from_error(command, &e);
        eprintln!("{}", err);
        process::exit(1);
    }
}
