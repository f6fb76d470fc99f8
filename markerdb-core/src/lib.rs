//! Core utilities and types shared across all markerdb crates

pub mod config;
pub mod error;

// Re-export commonly used types
pub use config::{load_config, resolve_config, save_config, Config, DatabaseConfig, ToolsConfig};
pub use error::{MarkerDbError, MarkerDbResult};

/// Version information for the markerdb project
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Clustering divergence used when the caller does not choose one.
pub const DEFAULT_CLUSTERING_DIVERGENCE: u32 = 3;

/// Rows per insert transaction during bulk load.
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Rows fetched per page when streaming the observation table.
pub const DEFAULT_DUMP_CHUNK_SIZE: usize = 1_000;
