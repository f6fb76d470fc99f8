use crate::cli::output::{create_table, section_header, tree_item};
use clap::Args;
use comfy_table::Cell;
use humansize::{format_size, BINARY};
use itertools::Itertools;
use markerdb_database::SequenceDatabase;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct InfoArgs {
    /// Database directory
    #[arg(long, value_name = "DIR")]
    pub db: PathBuf,

    /// Also count observations and cluster rows in the store
    #[arg(long)]
    pub stats: bool,
}

fn size_of(path: &Path) -> String {
    fs::metadata(path)
        .map(|m| format_size(m.len(), BINARY))
        .unwrap_or_else(|_| "-".to_string())
}

pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    let db = SequenceDatabase::acquire(&args.db)?;
    tracing::debug!("Markers: {}", db.markers().join(", "));

    section_header("Database Information");
    tree_item(false, "Path", &db.path().display().to_string());
    tree_item(false, "Version", &db.version().to_string());
    tree_item(false, "Clustering divergence", &db.clustering_divergence().to_string());
    tree_item(
        !args.stats,
        "Store",
        &format!("{} ({})", db.sqlite_path().display(), size_of(&db.sqlite_path())),
    );
    if args.stats {
        let store = db.open_store()?;
        tree_item(false, "Observations", &store.count_observations()?.to_string());
        tree_item(true, "Cluster rows", &store.count_cluster_pairs()?.to_string());
    }

    section_header("Marker Indices");
    let mut table = create_table(&["Marker", "Index", "Size"]);
    for (marker, index) in db.smafa_dbs() {
        table.add_row(vec![
            Cell::new(marker),
            Cell::new(index.display()),
            Cell::new(size_of(index)),
        ]);
    }
    println!("{}", table);
    Ok(())
}
