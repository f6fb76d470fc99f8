pub mod clusterer;

pub use clusterer::{ClusterPair, ClusterSink, Clusterer, Deduplicator, IndexBuilder};
