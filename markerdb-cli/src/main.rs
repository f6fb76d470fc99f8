use clap::Parser;
use colored::*;
use std::process;
use tracing_subscriber::EnvFilter;

mod cli;

use crate::cli::{Cli, Commands};
use markerdb_core::{resolve_config, MarkerDbError};

fn main() {
    let cli = Cli::parse();

    // -v beats MARKERDB_LOG, which beats the default
    let filter = match cli.verbose {
        0 => EnvFilter::try_from_env("MARKERDB_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);

        let exit_code = e
            .downcast_ref::<MarkerDbError>()
            .map(MarkerDbError::exit_code)
            .unwrap_or(1);
        process::exit(exit_code);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Makedb(args) => crate::cli::commands::makedb::run(args, config),
        Commands::Dump(args) => crate::cli::commands::dump::run(args, config),
        Commands::Info(args) => crate::cli::commands::info::run(args),
        Commands::Query(args) => crate::cli::commands::query::run(args),
    }
}
