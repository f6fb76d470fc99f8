//! External tools markerdb drives

use markerdb_core::{MarkerDbError, MarkerDbResult};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Smafa,
}

impl Tool {
    pub fn name(&self) -> &'static str {
        match self {
            Tool::Smafa => "smafa",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Tool::Smafa => "Smafa",
        }
    }

    pub fn github_repo(&self) -> &'static str {
        match self {
            Tool::Smafa => "wwood/smafa",
        }
    }

    pub fn binary_name(&self) -> &'static str {
        match self {
            Tool::Smafa => "smafa",
        }
    }

    /// Resolve the executable: `configured` when given (a path or a name on
    /// `PATH`), otherwise the default binary name on `PATH`.
    pub fn locate(&self, configured: Option<&Path>) -> MarkerDbResult<PathBuf> {
        let wanted = configured.unwrap_or_else(|| Path::new(self.binary_name()));
        let found = which::which(wanted).map_err(|e| {
            MarkerDbError::ClusterToolFailed(format!(
                "could not find {} ({}): {}; install it from https://github.com/{} \
                 or set tools.smafa_path",
                self.display_name(),
                wanted.display(),
                e,
                self.github_repo()
            ))
        })?;
        tracing::debug!("Using {} at {}", self.display_name(), found.display());
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smafa_names() {
        assert_eq!(Tool::Smafa.name(), "smafa");
        assert_eq!(Tool::Smafa.binary_name(), "smafa");
    }

    #[test]
    fn test_locate_missing_binary() {
        let result = Tool::Smafa.locate(Some(Path::new("/nonexistent/dir/smafa")));
        assert!(matches!(result, Err(MarkerDbError::ClusterToolFailed(_))));
    }
}
