//! External tools used to build marker cluster indices
//!
//! Cluster index construction runs in three stages, each behind a trait so
//! that tests can swap in-process fakes for the real executables:
//! [`Deduplicator`] reduces a marker's sequences to a distinct set,
//! [`Clusterer`] streams membership pairs, and [`IndexBuilder`] writes the
//! per-marker similarity index.

pub mod clusterers;
pub mod dedup;
pub mod process;
pub mod testing;
pub mod traits;
pub mod types;

pub use clusterers::SmafaTool;
pub use dedup::SortedDeduplicator;
pub use process::{run_tool, ToolProcess};
pub use testing::{MockClusterer, MockIndexBuilder};
pub use traits::{ClusterPair, ClusterSink, Clusterer, Deduplicator, IndexBuilder};
pub use types::Tool;
