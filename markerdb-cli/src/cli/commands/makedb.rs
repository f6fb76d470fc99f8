use crate::cli::output::success;
use crate::cli::progress::create_spinner;
use anyhow::Context;
use clap::Args;
use markerdb_bio::OtuTableReader;
use markerdb_core::{Config, MarkerDbResult};
use markerdb_database::DatabaseCreator;
use std::path::PathBuf;

#[derive(Args)]
pub struct MakedbArgs {
    /// OTU tables to load (tab-separated with a header row)
    #[arg(long = "otu-table", value_name = "FILE", required = true, num_args = 1..)]
    pub otu_tables: Vec<PathBuf>,

    /// Database directory to create; must not already exist
    #[arg(long, value_name = "DIR")]
    pub db: PathBuf,

    /// Clustering divergence passed to smafa [config: database.clustering_divergence]
    #[arg(long, value_name = "N")]
    pub clustering_divergence: Option<u32>,

    /// smafa executable [config: tools.smafa_path]
    #[arg(long, value_name = "BIN")]
    pub smafa: Option<PathBuf>,

    /// Seconds each smafa run may take, 0 for no limit [config: tools.cluster_timeout_secs]
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Observations per insert transaction [config: database.batch_size]
    #[arg(long, value_name = "N")]
    pub batch_size: Option<usize>,
}

impl MakedbArgs {
    fn apply_to(&self, config: &mut Config) {
        if let Some(divergence) = self.clustering_divergence {
            config.database.clustering_divergence = divergence;
        }
        if let Some(batch_size) = self.batch_size {
            config.database.batch_size = batch_size;
        }
        if let Some(smafa) = &self.smafa {
            config.tools.smafa_path = Some(smafa.clone());
        }
        if let Some(secs) = self.timeout_secs {
            config.tools.cluster_timeout_secs = secs;
        }
    }
}

pub fn run(args: MakedbArgs, mut config: Config) -> anyhow::Result<()> {
    args.apply_to(&mut config);
    config.validate()?;

    let creator = DatabaseCreator::from_config(&config)?;
    let readers = args
        .otu_tables
        .iter()
        .map(OtuTableReader::from_path)
        .collect::<MarkerDbResult<Vec<_>>>()?;
    tracing::info!(
        "Creating database at {} from {} OTU table(s), clustering divergence {}",
        args.db.display(),
        readers.len(),
        config.database.clustering_divergence
    );

    let spinner = create_spinner("Loading observations");
    let entries = readers.into_iter().flatten().inspect(|_| spinner.inc(1));
    let created = creator.create(&args.db, entries);
    spinner.finish_and_clear();
    let db = created
        .with_context(|| format!("Failed to create database at {}", args.db.display()))?;

    success(&format!(
        "Created {} with {} marker index(es)",
        db.path().display(),
        db.smafa_dbs().count()
    ));
    Ok(())
}
