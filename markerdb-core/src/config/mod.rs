//! Configuration types for markerdb

use crate::MarkerDbError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming a configuration file to load
pub const CONFIG_ENV_VAR: &str = "MARKERDB_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Divergence threshold handed to the clustering tool
    #[serde(default = "default_clustering_divergence")]
    pub clustering_divergence: u32,
    /// Rows per insert transaction while loading observations
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Rows per page when streaming the observation table back out
    #[serde(default = "default_dump_chunk_size")]
    pub dump_chunk_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Explicit smafa binary; resolved on PATH when unset
    #[serde(default)]
    pub smafa_path: Option<PathBuf>,
    /// Wall-clock limit per external tool invocation (0 = no limit)
    #[serde(default = "default_cluster_timeout_secs")]
    pub cluster_timeout_secs: u64,
}

fn default_clustering_divergence() -> u32 { crate::DEFAULT_CLUSTERING_DIVERGENCE }
fn default_batch_size() -> usize { crate::DEFAULT_BATCH_SIZE }
fn default_dump_chunk_size() -> usize { crate::DEFAULT_DUMP_CHUNK_SIZE }
fn default_cluster_timeout_secs() -> u64 { 86_400 }

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            clustering_divergence: default_clustering_divergence(),
            batch_size: default_batch_size(),
            dump_chunk_size: default_dump_chunk_size(),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            smafa_path: None,
            cluster_timeout_secs: default_cluster_timeout_secs(),
        }
    }
}

impl ToolsConfig {
    pub fn cluster_timeout(&self) -> Option<Duration> {
        match self.cluster_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, MarkerDbError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| MarkerDbError::Configuration(format!("Failed to parse config: {}", e)))?;
    config.validate()?;
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(path: P, config: &Config) -> Result<(), MarkerDbError> {
    let contents = toml::to_string_pretty(config)
        .map_err(|e| MarkerDbError::Configuration(format!("Failed to serialize config: {}", e)))?;
    std::fs::write(path, contents)?;
    Ok(())
}

/// Load the configuration named on the command line, else the one named by
/// `MARKERDB_CONFIG`, else fall back to defaults.
pub fn resolve_config(explicit: Option<&Path>) -> Result<Config, MarkerDbError> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    match std::env::var_os(CONFIG_ENV_VAR) {
        Some(path) if !path.is_empty() => {
            tracing::debug!("Loading configuration from ${}: {:?}", CONFIG_ENV_VAR, path);
            load_config(PathBuf::from(path))
        }
        _ => Ok(Config::default()),
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), MarkerDbError> {
        if self.database.batch_size == 0 {
            return Err(MarkerDbError::Configuration(
                "database.batch_size must be at least 1".to_string(),
            ));
        }
        if self.database.dump_chunk_size == 0 {
            return Err(MarkerDbError::Configuration(
                "database.dump_chunk_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.database.clustering_divergence, 3);
        assert_eq!(config.database.batch_size, 10_000);
        assert_eq!(config.database.dump_chunk_size, 1_000);

        assert_eq!(config.tools.smafa_path, None);
        assert_eq!(config.tools.cluster_timeout(), Some(Duration::from_secs(86_400)));
    }

    #[test]
    fn test_load_partial_config() {
        let toml_content = r#"
[database]
clustering_divergence = 5

[tools]
smafa_path = "/opt/smafa/bin/smafa"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", toml_content).unwrap();

        let config = load_config(temp_file.path()).unwrap();

        assert_eq!(config.database.clustering_divergence, 5);
        assert_eq!(config.database.batch_size, 10_000);
        assert_eq!(
            config.tools.smafa_path,
            Some(PathBuf::from("/opt/smafa/bin/smafa"))
        );
        assert_eq!(config.tools.cluster_timeout_secs, 86_400);
    }

    #[test]
    fn test_zero_timeout_disables_limit() {
        let tools = ToolsConfig {
            smafa_path: None,
            cluster_timeout_secs: 0,
        };
        assert_eq!(tools.cluster_timeout(), None);
    }

    #[test]
    fn test_load_invalid_config() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "this is not valid TOML {{").unwrap();

        match load_config(temp_file.path()).unwrap_err() {
            MarkerDbError::Configuration(msg) => assert!(msg.contains("Failed to parse config")),
            other => panic!("Expected Configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "[database]\nbatch_size = 0\n").unwrap();

        assert!(matches!(
            load_config(temp_file.path()),
            Err(MarkerDbError::Configuration(_))
        ));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = load_config("/nonexistent/path/to/markerdb.toml");
        assert!(matches!(result, Err(MarkerDbError::Io(_))));
    }

    #[test]
    fn test_config_round_trip() {
        let mut config = Config::default();
        config.database.clustering_divergence = 7;
        config.tools.cluster_timeout_secs = 60;

        let temp_file = NamedTempFile::new().unwrap();
        save_config(temp_file.path(), &config).unwrap();
        let loaded = load_config(temp_file.path()).unwrap();

        assert_eq!(loaded.database.clustering_divergence, 7);
        assert_eq!(loaded.tools.cluster_timeout_secs, 60);
    }

    #[test]
    fn test_resolve_explicit_path_wins() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "[database]\ndump_chunk_size = 50\n").unwrap();

        let config = resolve_config(Some(temp_file.path())).unwrap();
        assert_eq!(config.database.dump_chunk_size, 50);
    }
}
