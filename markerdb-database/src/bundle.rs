//! Opening and reading an existing database directory

use crate::create::{ClusterTools, DatabaseCreator};
use markerdb_bio::{OtuEntry, OtuTableWriter};
use markerdb_core::{MarkerDbError, MarkerDbResult, DEFAULT_DUMP_CHUNK_SIZE};
use markerdb_storage::{ContentsDescriptor, OtuStore, SQLITE_DB_NAME};
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Extension of the per-marker similarity index files
pub const SMAFA_DB_EXTENSION: &str = "smafadb";

/// A validated database directory
#[derive(Debug, Clone)]
pub struct SequenceDatabase {
    path: PathBuf,
    contents: ContentsDescriptor,
    smafa_dbs: BTreeMap<String, PathBuf>,
}

impl SequenceDatabase {
    pub(crate) fn from_parts(
        path: PathBuf,
        contents: ContentsDescriptor,
        smafa_dbs: BTreeMap<String, PathBuf>,
    ) -> Self {
        Self {
            path,
            contents,
            smafa_dbs,
        }
    }

    /// Build a new database at `path` with the given tools.
    pub fn create<P, I>(
        path: P,
        observations: I,
        clustering_divergence: u32,
        tools: ClusterTools,
    ) -> MarkerDbResult<Self>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = MarkerDbResult<OtuEntry>>,
    {
        DatabaseCreator::new(tools)
            .with_clustering_divergence(clustering_divergence)
            .create(path, observations)
    }

    /// Open the database at `path`, validating its contents file and
    /// collecting its per-marker index files.
    pub fn acquire<P: AsRef<Path>>(path: P) -> MarkerDbResult<Self> {
        let path = path.as_ref();
        let contents = ContentsDescriptor::read(path)?;

        let mut smafa_dbs = BTreeMap::new();
        for entry in fs::read_dir(path)? {
            let file = entry?.path();
            if file.extension().and_then(OsStr::to_str) != Some(SMAFA_DB_EXTENSION) {
                continue;
            }
            match file.file_stem().and_then(OsStr::to_str) {
                Some(marker) if !marker.is_empty() => {
                    smafa_dbs.insert(marker.to_string(), file);
                }
                _ => tracing::warn!("Ignoring index with unusable name: {}", file.display()),
            }
        }

        if smafa_dbs.is_empty() {
            return Err(MarkerDbError::NoClusterIndices(path.to_path_buf()));
        }
        tracing::debug!(
            "Found smafadbs: {}",
            smafa_dbs.keys().cloned().collect::<Vec<_>>().join(", ")
        );

        Ok(Self {
            path: path.to_path_buf(),
            contents,
            smafa_dbs,
        })
    }

    /// Write the header and every stored observation of the database at
    /// `path` as tab-separated text. Returns the number of rows written.
    pub fn dump<P: AsRef<Path>, W: Write>(path: P, output: W) -> MarkerDbResult<u64> {
        Self::dump_with_chunk_size(path, output, DEFAULT_DUMP_CHUNK_SIZE)
    }

    pub fn dump_with_chunk_size<P: AsRef<Path>, W: Write>(
        path: P,
        output: W,
        chunk_size: usize,
    ) -> MarkerDbResult<u64> {
        let store = OtuStore::open(path.as_ref().join(SQLITE_DB_NAME))?;
        let mut writer = OtuTableWriter::new(output);
        writer.write_header()?;

        let mut rows = 0u64;
        for entry in store.stream_observations(chunk_size) {
            writer.write_entry(&entry?)?;
            rows += 1;
        }
        writer.flush()?;
        tracing::debug!("Dumped {} observations", rows);
        Ok(rows)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn version(&self) -> i64 {
        self.contents.version
    }

    pub fn clustering_divergence(&self) -> u32 {
        self.contents.clustering_divergence
    }

    /// Index file of `marker`, if the database has one
    pub fn get_smafa_db(&self, marker: &str) -> Option<&Path> {
        let found = self.smafa_dbs.get(marker).map(PathBuf::as_path);
        if found.is_none() {
            tracing::debug!("No smafa DB found for {}", marker);
        }
        found
    }

    /// Every (marker, index file) pair, ordered by marker
    pub fn smafa_dbs(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.smafa_dbs
            .iter()
            .map(|(marker, path)| (marker.as_str(), path.as_path()))
    }

    pub fn markers(&self) -> impl Iterator<Item = &str> {
        self.smafa_dbs.keys().map(String::as_str)
    }

    pub fn sqlite_path(&self) -> PathBuf {
        self.path.join(SQLITE_DB_NAME)
    }

    /// Open the relational store read-only.
    pub fn open_store(&self) -> MarkerDbResult<OtuStore> {
        OtuStore::open(self.sqlite_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn descriptor_only(dir: &Path) {
        ContentsDescriptor::new(3).write(dir).unwrap();
    }

    #[test]
    fn test_acquire_requires_contents() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("S3.1.smafadb"), b"").unwrap();
        assert!(matches!(
            SequenceDatabase::acquire(dir.path()),
            Err(MarkerDbError::MissingDescriptor(_))
        ));
    }

    #[test]
    fn test_acquire_requires_an_index() {
        let dir = TempDir::new().unwrap();
        descriptor_only(dir.path());
        fs::write(dir.path().join("notes.txt"), b"").unwrap();
        assert!(matches!(
            SequenceDatabase::acquire(dir.path()),
            Err(MarkerDbError::NoClusterIndices(_))
        ));
    }

    #[test]
    fn test_acquire_maps_markers_to_indices() {
        let dir = TempDir::new().unwrap();
        descriptor_only(dir.path());
        for name in ["S3.1.smafadb", "S3.2.smafadb", "otus.sqlite3"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }

        let db = SequenceDatabase::acquire(dir.path()).unwrap();
        assert_eq!(db.markers().collect::<Vec<_>>(), vec!["S3.1", "S3.2"]);
        assert_eq!(db.get_smafa_db("S3.2"), Some(dir.path().join("S3.2.smafadb").as_path()));
        assert_eq!(db.get_smafa_db("S3.9"), None);
        assert_eq!(db.clustering_divergence(), 3);
        assert_eq!(db.version(), 3);
    }

    #[test]
    fn test_instances_do_not_share_index_maps() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        for (dir, marker) in [(&first, "A"), (&second, "B")] {
            descriptor_only(dir.path());
            fs::write(dir.path().join(format!("{}.smafadb", marker)), b"").unwrap();
        }

        let a = SequenceDatabase::acquire(first.path()).unwrap();
        let b = SequenceDatabase::acquire(second.path()).unwrap();
        assert_eq!(a.markers().collect::<Vec<_>>(), vec!["A"]);
        assert_eq!(b.markers().collect::<Vec<_>>(), vec!["B"]);
    }

    #[test]
    fn test_dump_without_store() {
        let dir = TempDir::new().unwrap();
        let result = SequenceDatabase::dump(dir.path(), Vec::new());
        assert!(matches!(result, Err(MarkerDbError::MissingStore(_))));
    }
}
