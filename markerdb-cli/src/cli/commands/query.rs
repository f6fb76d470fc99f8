use clap::{ArgGroup, Args};
use colored::*;
use markerdb_bio::OtuTableWriter;
use markerdb_database::SequenceDatabase;
use std::io;
use std::path::PathBuf;

#[derive(Args)]
#[command(group(ArgGroup::new("key").required(true).args(["sequence", "sample"])))]
pub struct QueryArgs {
    /// Database directory
    #[arg(long, value_name = "DIR")]
    pub db: PathBuf,

    /// Exact sequence to look up
    #[arg(long, value_name = "SEQ")]
    pub sequence: Option<String>,

    /// Sample name to look up
    #[arg(long, value_name = "NAME")]
    pub sample: Option<String>,
}

pub fn run(args: QueryArgs) -> anyhow::Result<()> {
    let db = SequenceDatabase::acquire(&args.db)?;
    let store = db.open_store()?;

    let rows = match (&args.sequence, &args.sample) {
        (Some(sequence), _) => store.observations_by_sequence(sequence)?,
        (None, Some(sample)) => store.observations_by_sample(sample)?,
        (None, None) => anyhow::bail!("one of --sequence or --sample is required"),
    };

    let stdout = io::stdout();
    let mut writer = OtuTableWriter::new(stdout.lock());
    writer.write_header()?;
    for row in &rows {
        writer.write_entry(row)?;
    }
    writer.flush()?;

    if let Some(sequence) = &args.sequence {
        match store.representative_of(sequence)? {
            Some(representative) => {
                eprintln!("{} {}", "Cluster representative:".bold(), representative)
            }
            None => eprintln!("{}", "Sequence is not in any cluster".dimmed()),
        }
    }
    tracing::debug!("{} matching observations", rows.len());
    Ok(())
}
