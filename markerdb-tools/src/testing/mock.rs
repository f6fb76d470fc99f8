//! Mock clusterer and index builder for tests that should not spawn smafa

use crate::clusterers::smafa::parse_cluster_line;
use crate::traits::{ClusterPair, ClusterSink, Clusterer, IndexBuilder};
use markerdb_core::{MarkerDbError, MarkerDbResult};
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Places every input sequence in its own cluster, or replays canned
/// output lines when built with [`MockClusterer::with_output`]
#[derive(Debug, Default)]
pub struct MockClusterer {
    canned: Option<Vec<String>>,
    divergences: Mutex<Vec<u32>>,
}

impl MockClusterer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replay `lines` as the tool's raw output for every marker.
    pub fn with_output<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            canned: Some(lines.into_iter().map(Into::into).collect()),
            divergences: Mutex::default(),
        }
    }

    /// Divergence thresholds passed to each call, in call order
    pub fn divergences(&self) -> Vec<u32> {
        self.divergences.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

impl Clusterer for MockClusterer {
    fn name(&self) -> &str {
        "mock"
    }

    fn cluster(
        &self,
        input: &Path,
        divergence: u32,
        sink: &mut ClusterSink<'_>,
    ) -> MarkerDbResult<u64> {
        if let Ok(mut calls) = self.divergences.lock() {
            calls.push(divergence);
        }

        let mut pairs = 0;
        if let Some(lines) = &self.canned {
            for line in lines {
                sink(parse_cluster_line(line)?)?;
                pairs += 1;
            }
            return Ok(pairs);
        }

        for line in BufReader::new(File::open(input)?).lines() {
            let line = line?;
            if line.starts_with('>') || line.is_empty() {
                continue;
            }
            sink(ClusterPair::new(line.as_str(), line.as_str()))?;
            pairs += 1;
        }
        Ok(pairs)
    }
}

/// Copies the representative FASTA to the artifact path and records calls
#[derive(Debug, Default)]
pub struct MockIndexBuilder {
    fail: bool,
    built: Mutex<Vec<PathBuf>>,
}

impl MockIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            built: Mutex::default(),
        }
    }

    pub fn built(&self) -> Vec<PathBuf> {
        self.built.lock().map(|b| b.clone()).unwrap_or_default()
    }
}

impl IndexBuilder for MockIndexBuilder {
    fn name(&self) -> &str {
        "mock"
    }

    fn build_index(&self, representatives: &Path, output: &Path) -> MarkerDbResult<()> {
        if self.fail {
            return Err(MarkerDbError::ClusterToolFailed("mock index build failed".into()));
        }
        fs::copy(representatives, output)?;
        if let Ok(mut built) = self.built.lock() {
            built.push(output.to_path_buf());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_identity_clustering() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.fa");
        fs::write(&input, ">1\nAAAA\n>1\nCCCC\n").unwrap();

        let clusterer = MockClusterer::new();
        let mut pairs = Vec::new();
        clusterer
            .cluster(&input, 4, &mut |pair| {
                pairs.push(pair);
                Ok(())
            })
            .unwrap();

        assert_eq!(pairs, vec![ClusterPair::new("AAAA", "AAAA"), ClusterPair::new("CCCC", "CCCC")]);
        assert_eq!(clusterer.divergences(), vec![4]);
    }

    #[test]
    fn test_canned_malformed_output() {
        let dir = TempDir::new().unwrap();
        let clusterer = MockClusterer::with_output(["AAAA\tAAAA", "garbage"]);
        let mut accepted = 0;
        let result = clusterer.cluster(&dir.path().join("unused"), 3, &mut |_| {
            accepted += 1;
            Ok(())
        });

        assert!(matches!(result, Err(MarkerDbError::MalformedClusterOutput(_))));
        assert_eq!(accepted, 1);
    }
}
