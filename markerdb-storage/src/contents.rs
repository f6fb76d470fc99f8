//! `CONTENTS.json`: the file that marks a directory as a marker database and
//! records the parameters it was built with

use markerdb_core::{MarkerDbError, MarkerDbResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const CONTENTS_FILE_NAME: &str = "CONTENTS.json";
pub const VERSION_KEY: &str = "singlem_database_version";
pub const CLUSTERING_DIVERGENCE_KEY: &str = "smafa_clustering_divergence";

/// Version written by this release
pub const CURRENT_VERSION: i64 = 3;

/// Keys that must be present for each supported version
fn required_keys(version: i64) -> Option<&'static [&'static str]> {
    match version {
        3 => Some(&[VERSION_KEY, CLUSTERING_DIVERGENCE_KEY]),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentsDescriptor {
    #[serde(rename = "singlem_database_version")]
    pub version: i64,
    #[serde(rename = "smafa_clustering_divergence")]
    pub clustering_divergence: u32,
}

impl ContentsDescriptor {
    pub fn new(clustering_divergence: u32) -> Self {
        Self {
            version: CURRENT_VERSION,
            clustering_divergence,
        }
    }

    pub fn path_in(db_dir: &Path) -> PathBuf {
        db_dir.join(CONTENTS_FILE_NAME)
    }

    /// Write the descriptor into `db_dir`, replacing nothing: the directory
    /// is expected to be freshly created.
    pub fn write(&self, db_dir: &Path) -> MarkerDbResult<PathBuf> {
        let path = Self::path_in(db_dir);
        let file = File::options().write(true).create_new(true).open(&path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        tracing::debug!("Wrote contents file {}", path.display());
        Ok(path)
    }

    /// Read and validate the descriptor of the database at `db_dir`.
    pub fn read(db_dir: &Path) -> MarkerDbResult<Self> {
        let path = Self::path_in(db_dir);
        if !path.is_file() {
            return Err(MarkerDbError::MissingDescriptor(path));
        }

        let raw = fs::read_to_string(&path)?;
        let hash: Map<String, Value> = match serde_json::from_str(&raw)? {
            Value::Object(map) => map,
            other => {
                return Err(MarkerDbError::Serialization(format!(
                    "{}: expected a JSON object, found {}",
                    path.display(),
                    other
                )))
            }
        };

        let version = match hash.get(VERSION_KEY) {
            None => {
                return Err(MarkerDbError::MissingRequiredKey {
                    key: VERSION_KEY.to_string(),
                    path,
                })
            }
            Some(value) => value.as_i64().ok_or_else(|| {
                MarkerDbError::Serialization(format!(
                    "{}: {} is not an integer: {}",
                    path.display(),
                    VERSION_KEY,
                    value
                ))
            })?,
        };
        tracing::debug!("Loading version {} database: {}", version, db_dir.display());

        let required = required_keys(version).ok_or(MarkerDbError::UnsupportedVersion(version))?;
        for key in required {
            if !hash.contains_key(*key) {
                return Err(MarkerDbError::MissingRequiredKey {
                    key: key.to_string(),
                    path,
                });
            }
        }

        let divergence = &hash[CLUSTERING_DIVERGENCE_KEY];
        let clustering_divergence = divergence
            .as_u64()
            .and_then(|d| u32::try_from(d).ok())
            .ok_or_else(|| {
                MarkerDbError::Serialization(format!(
                    "{}: {} is not a non-negative integer: {}",
                    path.display(),
                    CLUSTERING_DIVERGENCE_KEY,
                    divergence
                ))
            })?;

        Ok(Self {
            version,
            clustering_divergence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_raw(dir: &Path, json: &str) {
        fs::write(dir.join(CONTENTS_FILE_NAME), json).unwrap();
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let written = ContentsDescriptor::new(5);
        written.write(dir.path()).unwrap();

        let read = ContentsDescriptor::read(dir.path()).unwrap();
        assert_eq!(read, written);
        assert_eq!(read.version, 3);
    }

    #[test]
    fn test_on_disk_keys() {
        let dir = TempDir::new().unwrap();
        ContentsDescriptor::new(3).write(dir.path()).unwrap();

        let raw = fs::read_to_string(dir.path().join(CONTENTS_FILE_NAME)).unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value[VERSION_KEY], 3);
        assert_eq!(value[CLUSTERING_DIVERGENCE_KEY], 3);
    }

    #[test]
    fn test_write_refuses_existing_file() {
        let dir = TempDir::new().unwrap();
        write_raw(dir.path(), "{}");
        assert!(matches!(
            ContentsDescriptor::new(3).write(dir.path()),
            Err(MarkerDbError::Io(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            ContentsDescriptor::read(dir.path()),
            Err(MarkerDbError::MissingDescriptor(_))
        ));
    }

    #[test]
    fn test_unsupported_version() {
        let dir = TempDir::new().unwrap();
        write_raw(
            dir.path(),
            r#"{"singlem_database_version": 2, "smafa_clustering_divergence": 3}"#,
        );
        assert!(matches!(
            ContentsDescriptor::read(dir.path()),
            Err(MarkerDbError::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn test_missing_required_key() {
        let dir = TempDir::new().unwrap();
        write_raw(dir.path(), r#"{"singlem_database_version": 3}"#);
        match ContentsDescriptor::read(dir.path()) {
            Err(MarkerDbError::MissingRequiredKey { key, .. }) => {
                assert_eq!(key, CLUSTERING_DIVERGENCE_KEY)
            }
            other => panic!("Expected MissingRequiredKey, got {:?}", other),
        }

        write_raw(dir.path(), r#"{"smafa_clustering_divergence": 3}"#);
        match ContentsDescriptor::read(dir.path()) {
            Err(MarkerDbError::MissingRequiredKey { key, .. }) => assert_eq!(key, VERSION_KEY),
            other => panic!("Expected MissingRequiredKey, got {:?}", other),
        }
    }

    #[test]
    fn test_extra_keys_are_ignored() {
        let dir = TempDir::new().unwrap();
        write_raw(
            dir.path(),
            r#"{"singlem_database_version": 3, "smafa_clustering_divergence": 4, "note": "x"}"#,
        );
        assert_eq!(ContentsDescriptor::read(dir.path()).unwrap().clustering_divergence, 4);
    }
}
