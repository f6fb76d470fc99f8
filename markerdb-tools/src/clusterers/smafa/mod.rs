pub mod parser;

pub use parser::parse_cluster_line;

use crate::process::{run_tool, ToolProcess};
use crate::traits::{ClusterSink, Clusterer, IndexBuilder};
use crate::types::Tool;
use markerdb_core::{MarkerDbError, MarkerDbResult, ToolsConfig};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

/// Wrapper around the `smafa` executable
#[derive(Debug, Clone)]
pub struct SmafaTool {
    binary_path: PathBuf,
    timeout: Option<Duration>,
}

impl SmafaTool {
    pub fn new(binary_path: impl Into<PathBuf>) -> Self {
        Self {
            binary_path: binary_path.into(),
            timeout: None,
        }
    }

    /// Locate smafa according to the tools configuration.
    pub fn from_config(config: &ToolsConfig) -> MarkerDbResult<Self> {
        let binary_path = Tool::Smafa.locate(config.smafa_path.as_deref())?;
        Ok(Self::new(binary_path).with_timeout(config.cluster_timeout()))
    }

    /// Limit each smafa invocation to `timeout`; `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }
}

impl Clusterer for SmafaTool {
    fn name(&self) -> &str {
        Tool::Smafa.name()
    }

    fn cluster(
        &self,
        input: &Path,
        divergence: u32,
        sink: &mut ClusterSink<'_>,
    ) -> MarkerDbResult<u64> {
        let mut cmd = Command::new(&self.binary_path);
        cmd.arg("cluster")
            .arg("--fragment-method")
            .arg("/dev/stdin")
            .arg("--divergence")
            .arg(divergence.to_string())
            .stdin(Stdio::from(File::open(input)?));

        let mut process = ToolProcess::spawn(cmd, self.timeout)?;
        let mut pairs = 0u64;
        while let Some(line) = process.next_line()? {
            sink(parse_cluster_line(&line)?)?;
            pairs += 1;
        }
        process.finish()?;
        Ok(pairs)
    }
}

impl IndexBuilder for SmafaTool {
    fn name(&self) -> &str {
        Tool::Smafa.name()
    }

    fn build_index(&self, representatives: &Path, output: &Path) -> MarkerDbResult<()> {
        let mut cmd = Command::new(&self.binary_path);
        cmd.arg("makedb").arg(representatives).arg(output);
        run_tool(cmd, self.timeout)?;

        if !output.exists() {
            return Err(MarkerDbError::ClusterToolFailed(format!(
                "smafa makedb exited cleanly but did not create {}",
                output.display()
            )));
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::traits::ClusterPair;
    use markerdb_test::fake_smafa::{write_fake_smafa, FakeSmafaMode};
    use std::fs;
    use tempfile::TempDir;

    fn dedup_input(dir: &Path) -> PathBuf {
        let path = dir.join("in.fa");
        fs::write(&path, ">1\nAAAA\n>1\nCCCC\n").unwrap();
        path
    }

    #[test]
    fn test_identity_cluster_through_subprocess() {
        let dir = TempDir::new().unwrap();
        let smafa = SmafaTool::new(write_fake_smafa(dir.path(), FakeSmafaMode::Identity));
        let mut seen = Vec::new();

        let n = smafa
            .cluster(&dedup_input(dir.path()), 3, &mut |pair| {
                seen.push(pair);
                Ok(())
            })
            .unwrap();

        assert_eq!(n, 2);
        assert_eq!(
            seen,
            vec![ClusterPair::new("AAAA", "AAAA"), ClusterPair::new("CCCC", "CCCC")]
        );
    }

    #[test]
    fn test_malformed_output_is_fatal() {
        let dir = TempDir::new().unwrap();
        let smafa = SmafaTool::new(write_fake_smafa(dir.path(), FakeSmafaMode::Malformed));
        let result = smafa.cluster(&dedup_input(dir.path()), 3, &mut |_| Ok(()));
        assert!(matches!(result, Err(MarkerDbError::MalformedClusterOutput(_))));
    }

    #[test]
    fn test_failing_tool() {
        let dir = TempDir::new().unwrap();
        let smafa = SmafaTool::new(write_fake_smafa(dir.path(), FakeSmafaMode::Fail));
        let result = smafa.cluster(&dedup_input(dir.path()), 3, &mut |_| Ok(()));
        assert!(matches!(result, Err(MarkerDbError::ClusterToolFailed(_))));
    }

    #[test]
    fn test_hung_tool_times_out() {
        let dir = TempDir::new().unwrap();
        let smafa = SmafaTool::new(write_fake_smafa(dir.path(), FakeSmafaMode::Hang))
            .with_timeout(Some(Duration::from_millis(300)));
        let result = smafa.cluster(&dedup_input(dir.path()), 3, &mut |_| Ok(()));
        assert!(matches!(result, Err(MarkerDbError::ClusterToolFailed(_))));
    }

    #[test]
    fn test_makedb_writes_artifact() {
        let dir = TempDir::new().unwrap();
        let smafa = SmafaTool::new(write_fake_smafa(dir.path(), FakeSmafaMode::Identity));
        let output = dir.path().join("S3.1.smafadb");

        smafa.build_index(&dedup_input(dir.path()), &output).unwrap();
        assert!(output.is_file());
    }
}
