//! Marker sequence databases
//!
//! A database is a directory holding `CONTENTS.json`, the SQLite store
//! `otus.sqlite3` with observations and cluster membership, and one
//! `<marker>.smafadb` similarity index per marker.

pub mod bundle;
pub mod create;
pub mod pipeline;

pub use bundle::{SequenceDatabase, SMAFA_DB_EXTENSION};
pub use create::{ClusterTools, DatabaseCreator};
pub use pipeline::{ClusterPipeline, MarkerClusters, StagedMarker};
