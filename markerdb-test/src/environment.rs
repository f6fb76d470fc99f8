//! Isolated scratch directory for tests

use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct TestEnvironment {
    temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            temp_dir: TempDir::new()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Path for a database directory that does not exist yet
    pub fn db_path(&self, name: &str) -> PathBuf {
        self.path().join("dbs").join(name)
    }
}
