mod agents;
mod cli;
mod config;
mod error;
mod schema;
mod utils;
mod workflow;

use agents::SystemCommandRunner;
use clap::Parser;
use cli::Cli;
use colored::Colorize;
use config::Settings;
use env_logger::{Builder, Env};
use std::process;
use workflow::UpdateWorkflow;

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    Builder::from_env(Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .format_target(false)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> error::Result<()> {
    let settings = Settings::from_cli(cli)?;
    let runner = SystemCommandRunner::new();
    UpdateWorkflow::new(&settings, &runner, std::io::stdout()).execute()?;
    Ok(())
}
