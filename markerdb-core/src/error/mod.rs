//! Core error types for markerdb

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for markerdb operations
#[derive(Error, Debug)]
pub enum MarkerDbError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Parsing error: {0}")]
    Parse(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Cowardly refusing to overwrite already-existing database '{}'", .0.display())]
    AlreadyExists(PathBuf),

    #[error(
        "No contents file found at '{}': the database is not at that location, is corrupt, \
         or predates versioned contents files",
        .0.display()
    )]
    MissingDescriptor(PathBuf),

    #[error("Unexpected database version found: {0}")]
    UnsupportedVersion(i64),

    #[error("Required key '{key}' missing from database contents file '{}'", .path.display())]
    MissingRequiredKey { key: String, path: PathBuf },

    #[error("No cluster indices (*.smafadb) found in database '{}'", .0.display())]
    NoClusterIndices(PathBuf),

    #[error(
        "SQLite store not found at '{}': perhaps the database is the wrong version?",
        .0.display()
    )]
    MissingStore(PathBuf),

    #[error("Unexpected cluster output line: {0:?}")]
    MalformedClusterOutput(String),

    #[error("Cluster tool failed: {0}")]
    ClusterToolFailed(String),

    #[error("Malformed sequence record: {0:?}")]
    MalformedRecord(String),

    #[error("Duplicate identifier: {0}")]
    DuplicateIdentity(String),
}

/// Result type alias for markerdb operations
pub type MarkerDbResult<T> = Result<T, MarkerDbError>;

impl From<serde_json::Error> for MarkerDbError {
    fn from(err: serde_json::Error) -> Self {
        MarkerDbError::Serialization(err.to_string())
    }
}

impl MarkerDbError {
    /// Process exit code the binary reports for this error kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            MarkerDbError::Configuration(_) => 2,
            MarkerDbError::Io(_) => 3,
            MarkerDbError::Parse(_)
            | MarkerDbError::InvalidInput(_)
            | MarkerDbError::MalformedRecord(_)
            | MarkerDbError::DuplicateIdentity(_)
            | MarkerDbError::Serialization(_) => 4,
            MarkerDbError::Database(_)
            | MarkerDbError::AlreadyExists(_)
            | MarkerDbError::MissingDescriptor(_)
            | MarkerDbError::UnsupportedVersion(_)
            | MarkerDbError::MissingRequiredKey { .. }
            | MarkerDbError::NoClusterIndices(_)
            | MarkerDbError::MissingStore(_) => 5,
            MarkerDbError::MalformedClusterOutput(_) | MarkerDbError::ClusterToolFailed(_) => 6,
        }
    }
}
