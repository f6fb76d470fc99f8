//! Per-marker cluster index construction
//!
//! For each marker: deduplicate its staged sequences, stream the clustering
//! tool's membership pairs into the store, then index exactly the set of
//! representatives that appeared in those pairs.

use markerdb_bio::write_pseudo_fasta;
use markerdb_core::MarkerDbResult;
use markerdb_storage::OtuStore;
use markerdb_tools::{Clusterer, Deduplicator, IndexBuilder};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Sequences of one marker, written one per line to `sequences`, with a
/// private directory for the intermediate files of its pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedMarker {
    pub marker: String,
    pub sequences: PathBuf,
    pub work_dir: PathBuf,
}

/// Outcome of one marker's pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerClusters {
    pub marker: String,
    pub distinct_sequences: usize,
    pub cluster_pairs: u64,
    pub representatives: usize,
    pub index_path: PathBuf,
}

pub struct ClusterPipeline<'a> {
    deduplicator: &'a dyn Deduplicator,
    clusterer: &'a dyn Clusterer,
    index_builder: &'a dyn IndexBuilder,
    divergence: u32,
}

impl<'a> ClusterPipeline<'a> {
    pub fn new(
        deduplicator: &'a dyn Deduplicator,
        clusterer: &'a dyn Clusterer,
        index_builder: &'a dyn IndexBuilder,
        divergence: u32,
    ) -> Self {
        Self {
            deduplicator,
            clusterer,
            index_builder,
            divergence,
        }
    }

    /// Cluster one marker, committing its membership rows to `store` and
    /// writing its index to `index_path`. On error none of the marker's
    /// rows are committed.
    pub fn run_marker(
        &self,
        store: &mut OtuStore,
        staged: &StagedMarker,
        index_path: &Path,
    ) -> MarkerDbResult<MarkerClusters> {
        let dedup_path = staged.work_dir.join("dedup.fa");
        let distinct_sequences = self.deduplicator.deduplicate(&staged.sequences, &dedup_path)?;
        tracing::debug!(
            "{}: {} distinct sequences, clustering with {} at divergence {}",
            staged.marker,
            distinct_sequences,
            self.clusterer.name(),
            self.divergence
        );

        // bounded by the distinct sequences of this marker, like the dedup set
        let mut representatives = BTreeSet::new();
        let mut writer = store.cluster_writer()?;
        let cluster_pairs = self.clusterer.cluster(&dedup_path, self.divergence, &mut |pair| {
            writer.insert(&pair.member, &pair.representative)?;
            representatives.insert(pair.representative);
            Ok(())
        })?;
        writer.commit()?;

        if representatives.is_empty() {
            tracing::warn!("{}: clustering produced no representatives", staged.marker);
        }

        let representatives_path = staged.work_dir.join("representatives.fa");
        let mut out = BufWriter::new(File::create(&representatives_path)?);
        write_pseudo_fasta(&mut out, &representatives)?;
        out.flush()?;
        drop(out);

        tracing::debug!(
            "{}: building {} index from {} representatives",
            staged.marker,
            self.index_builder.name(),
            representatives.len()
        );
        self.index_builder.build_index(&representatives_path, index_path)?;

        Ok(MarkerClusters {
            marker: staged.marker.clone(),
            distinct_sequences,
            cluster_pairs,
            representatives: representatives.len(),
            index_path: index_path.to_path_buf(),
        })
    }
}
