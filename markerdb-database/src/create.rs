//! Building a new database directory
//!
//! Everything is written into a hidden sibling of the target directory and
//! renamed into place only once every stage has succeeded, so a failed run
//! leaves nothing at the target path.

use crate::bundle::{SequenceDatabase, SMAFA_DB_EXTENSION};
use crate::pipeline::{ClusterPipeline, StagedMarker};
use markerdb_bio::OtuEntry;
use markerdb_core::{
    Config, MarkerDbError, MarkerDbResult, DEFAULT_BATCH_SIZE, DEFAULT_CLUSTERING_DIVERGENCE,
};
use markerdb_storage::{ContentsDescriptor, OtuStore, SQLITE_DB_NAME};
use markerdb_tools::{Clusterer, Deduplicator, IndexBuilder, SmafaTool, SortedDeduplicator};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// The three external stages of cluster index construction
pub struct ClusterTools {
    pub deduplicator: Box<dyn Deduplicator>,
    pub clusterer: Box<dyn Clusterer>,
    pub index_builder: Box<dyn IndexBuilder>,
}

impl ClusterTools {
    pub fn new(
        deduplicator: Box<dyn Deduplicator>,
        clusterer: Box<dyn Clusterer>,
        index_builder: Box<dyn IndexBuilder>,
    ) -> Self {
        Self {
            deduplicator,
            clusterer,
            index_builder,
        }
    }

    /// In-process deduplication followed by smafa for clustering and indexing
    pub fn smafa(smafa: SmafaTool) -> Self {
        Self::new(
            Box::new(SortedDeduplicator),
            Box::new(smafa.clone()),
            Box::new(smafa),
        )
    }
}

pub struct DatabaseCreator {
    tools: ClusterTools,
    clustering_divergence: u32,
    batch_size: usize,
}

impl DatabaseCreator {
    pub fn new(tools: ClusterTools) -> Self {
        Self {
            tools,
            clustering_divergence: DEFAULT_CLUSTERING_DIVERGENCE,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Creator using smafa and the settings of `config`
    pub fn from_config(config: &Config) -> MarkerDbResult<Self> {
        let smafa = SmafaTool::from_config(&config.tools)?;
        Ok(Self::new(ClusterTools::smafa(smafa))
            .with_clustering_divergence(config.database.clustering_divergence)
            .with_batch_size(config.database.batch_size))
    }

    pub fn with_clustering_divergence(mut self, divergence: u32) -> Self {
        self.clustering_divergence = divergence;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Build a database at `path` from `observations`. Fails with
    /// `AlreadyExists`, touching nothing, when `path` exists.
    pub fn create<P, I>(&self, path: P, observations: I) -> MarkerDbResult<SequenceDatabase>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = MarkerDbResult<OtuEntry>>,
    {
        let path = path.as_ref();
        if fs::symlink_metadata(path).is_ok() {
            return Err(MarkerDbError::AlreadyExists(path.to_path_buf()));
        }
        let name = path.file_name().ok_or_else(|| {
            MarkerDbError::InvalidInput(format!("{} does not name a directory", path.display()))
        })?;
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let prefix = format!(".{}.", name.to_string_lossy());
        let staging = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".partial")
            .tempdir_in(parent)?;
        let scratch = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".scratch")
            .tempdir_in(parent)?;
        tracing::debug!("Staging database in {}", staging.path().display());

        let smafa_dbs = self.build(staging.path(), scratch.path(), observations)?;
        scratch.close()?;

        // rename(2) would replace an empty directory created during the build
        if fs::symlink_metadata(path).is_ok() {
            return Err(MarkerDbError::AlreadyExists(path.to_path_buf()));
        }
        let built = staging.keep();
        if let Err(e) = fs::rename(&built, path) {
            let _ = fs::remove_dir_all(&built);
            return Err(e.into());
        }

        let smafa_dbs = smafa_dbs
            .into_iter()
            .map(|(marker, file_name)| (marker, path.join(file_name)))
            .collect();
        tracing::info!("Finished creating database at {}", path.display());
        Ok(SequenceDatabase::from_parts(
            path.to_path_buf(),
            ContentsDescriptor::new(self.clustering_divergence),
            smafa_dbs,
        ))
    }

    /// Run every stage inside `db_dir`, returning marker -> index file name.
    fn build<I>(
        &self,
        db_dir: &Path,
        scratch: &Path,
        observations: I,
    ) -> MarkerDbResult<BTreeMap<String, String>>
    where
        I: IntoIterator<Item = MarkerDbResult<OtuEntry>>,
    {
        tracing::info!("Writing contents file");
        ContentsDescriptor::new(self.clustering_divergence).write(db_dir)?;

        tracing::info!("Loading observations into {}", SQLITE_DB_NAME);
        let mut store =
            OtuStore::create(db_dir.join(SQLITE_DB_NAME))?.with_batch_size(self.batch_size);
        let mut staging = MarkerStaging::new(scratch);
        let loaded = store.bulk_load_with(observations, |entry| {
            entry.validate()?;
            staging.add(entry)
        })?;
        let markers = staging.finish()?;
        if loaded == 0 {
            return Err(MarkerDbError::InvalidInput(
                "no observations to build a database from".to_string(),
            ));
        }
        tracing::info!("Loaded {} observations across {} markers", loaded, markers.len());

        tracing::info!("Running {} on each marker", self.tools.clusterer.name());
        let pipeline = ClusterPipeline::new(
            self.tools.deduplicator.as_ref(),
            self.tools.clusterer.as_ref(),
            self.tools.index_builder.as_ref(),
            self.clustering_divergence,
        );
        let mut smafa_dbs = BTreeMap::new();
        for staged in &markers {
            let file_name = format!("{}.{}", staged.marker, SMAFA_DB_EXTENSION);
            let summary = pipeline.run_marker(&mut store, staged, &db_dir.join(&file_name))?;
            tracing::debug!(
                "{}: {} cluster pairs, {} representatives",
                summary.marker,
                summary.cluster_pairs,
                summary.representatives
            );
            smafa_dbs.insert(staged.marker.clone(), file_name);
        }

        tracing::info!("Building store indices");
        store.build_indices()?;
        store.close()?;
        Ok(smafa_dbs)
    }
}

/// Splits incoming sequences into one scratch file per marker
struct MarkerStaging {
    root: PathBuf,
    markers: BTreeMap<String, (StagedMarker, BufWriter<File>)>,
}

impl MarkerStaging {
    fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            markers: BTreeMap::new(),
        }
    }

    fn add(&mut self, entry: &OtuEntry) -> MarkerDbResult<()> {
        if !self.markers.contains_key(&entry.marker) {
            let work_dir = self.root.join(self.markers.len().to_string());
            fs::create_dir(&work_dir)?;
            let sequences = work_dir.join("sequences");
            let file = BufWriter::new(File::create(&sequences)?);
            let staged = StagedMarker {
                marker: entry.marker.clone(),
                sequences,
                work_dir,
            };
            self.markers.insert(entry.marker.clone(), (staged, file));
        }
        if let Some((_, file)) = self.markers.get_mut(&entry.marker) {
            writeln!(file, "{}", entry.sequence)?;
        }
        Ok(())
    }

    /// Flush every staging file, returning the markers in name order.
    fn finish(self) -> MarkerDbResult<Vec<StagedMarker>> {
        let mut staged = Vec::with_capacity(self.markers.len());
        for (_, (marker, mut file)) in self.markers {
            file.flush()?;
            staged.push(marker);
        }
        Ok(staged)
    }
}
