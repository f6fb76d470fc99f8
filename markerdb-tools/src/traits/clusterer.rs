/// Traits for the external stages of cluster index construction
use markerdb_core::MarkerDbResult;
use std::path::Path;

/// One line of clustering output: `member` was assigned to the cluster
/// whose representative is `representative`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClusterPair {
    pub member: String,
    pub representative: String,
}

impl ClusterPair {
    pub fn new(member: impl Into<String>, representative: impl Into<String>) -> Self {
        Self {
            member: member.into(),
            representative: representative.into(),
        }
    }
}

/// Receives membership pairs as they are produced
pub type ClusterSink<'a> = dyn FnMut(ClusterPair) -> MarkerDbResult<()> + 'a;

/// Reduces a marker's staged sequences to a distinct set
pub trait Deduplicator: Send + Sync {
    /// Read newline-separated sequences from `staged` and write each
    /// distinct one to `output` as pseudo-FASTA. Returns the number of
    /// distinct sequences.
    fn deduplicate(&self, staged: &Path, output: &Path) -> MarkerDbResult<usize>;
}

/// Groups sequences into clusters within a divergence threshold
pub trait Clusterer: Send + Sync {
    /// Tool name for logging
    fn name(&self) -> &str;

    /// Cluster the pseudo-FASTA at `input`, passing every membership pair
    /// to `sink` as soon as it is read. Returns the number of pairs.
    fn cluster(
        &self,
        input: &Path,
        divergence: u32,
        sink: &mut ClusterSink<'_>,
    ) -> MarkerDbResult<u64>;
}

/// Builds the similarity index artifact for one marker
pub trait IndexBuilder: Send + Sync {
    fn name(&self) -> &str;

    /// Build an index of the pseudo-FASTA at `representatives` into `output`.
    fn build_index(&self, representatives: &Path, output: &Path) -> MarkerDbResult<()>;
}
