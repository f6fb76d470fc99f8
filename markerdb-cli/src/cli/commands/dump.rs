use clap::Args;
use markerdb_core::Config;
use markerdb_database::SequenceDatabase;
use std::io::{self, BufWriter};
use std::path::PathBuf;

#[derive(Args)]
pub struct DumpArgs {
    /// Database directory
    #[arg(long, value_name = "DIR")]
    pub db: PathBuf,
}

pub fn run(args: DumpArgs, config: Config) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let rows = SequenceDatabase::dump_with_chunk_size(
        &args.db,
        BufWriter::new(stdout.lock()),
        config.database.dump_chunk_size,
    )?;
    tracing::debug!("Dumped {} observations from {}", rows, args.db.display());
    Ok(())
}
