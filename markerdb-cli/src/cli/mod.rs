pub mod commands;
pub mod output;
pub mod progress;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "markerdb",
    version,
    about = "Build and read marker-gene OTU databases",
    long_about = "markerdb turns OTU tables of marker-gene observations into a versioned database \
                  directory: a SQLite store of every observation plus one smafa similarity index \
                  per marker, clustered at a chosen divergence."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file (TOML); defaults to $MARKERDB_CONFIG if set
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a database from OTU tables
    Makedb(commands::makedb::MakedbArgs),

    /// Print every stored observation as a tab-separated table
    Dump(commands::dump::DumpArgs),

    /// Show a database's parameters and per-marker indices
    Info(commands::info::InfoArgs),

    /// Look up observations by sequence or sample
    Query(commands::query::QueryArgs),
}
