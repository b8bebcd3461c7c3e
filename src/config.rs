use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration loaded from a TOML file, with every field
/// optional and defaulted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub indexing: IndexingConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the JSON index snapshot
    pub index_file: PathBuf,
    /// Scratch directory for staged files during indexing
    pub staging_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IndexingConfig {
    /// Concurrent extraction workers
    pub max_workers: usize,
    /// Directories indexed when the command line names none
    pub directories: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Default number of search results
    pub top_k: usize,
    /// Characters of context on each side of a snippet match
    pub snippet_radius: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            indexing: IndexingConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            index_file: PathBuf::from("data/file_index.json"),
            staging_dir: PathBuf::from("data/staging"),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            directories: vec![PathBuf::from("data/files"), PathBuf::from("data/documents")],
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            snippet_radius: 50,
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Load configuration from the first file found in the default
    /// locations, falling back to defaults when none exists
    pub fn load() -> Result<Self> {
        for candidate in ["settings.toml", "config/settings.toml"] {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::from_file(path);
            }
        }
        Ok(Self::default())
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
        assert_eq!(config.storage.index_file, Path::new("data/file_index.json"));
        assert_eq!(config.indexing.max_workers, 4);
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.retrieval.snippet_radius, 50);
    }

    #[test]
    fn test_from_file_full() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[storage]
index_file = "/var/docdex/index.json"
staging_dir = "/tmp/docdex-staging"

[indexing]
max_workers = 8
directories = ["/srv/docs"]

[retrieval]
top_k = 10
snippet_radius = 80
"#
        )
        .unwrap();
        file.flush().unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.storage.index_file, Path::new("/var/docdex/index.json"));
        assert_eq!(config.indexing.max_workers, 8);
        assert_eq!(config.indexing.directories, vec![PathBuf::from("/srv/docs")]);
        assert_eq!(config.retrieval.top_k, 10);
        assert_eq!(config.retrieval.snippet_radius, 80);
    }

    #[test]
    fn test_from_file_partial_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[indexing]
max_workers = 2
"#
        )
        .unwrap();
        file.flush().unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.indexing.max_workers, 2);
        // Untouched sections fall back to their defaults
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.storage.staging_dir, Path::new("data/staging"));
    }

    #[test]
    fn test_from_file_invalid_toml_fails() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "this is [not valid toml").unwrap();
        file.flush().unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("failed to parse config file"));
    }

    #[test]
    fn test_from_file_missing_fails() {
        let err = Config::from_file(Path::new("/nonexistent/settings.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }

    #[test]
    fn test_config_round_trip() {
        let config = Config::default();
        let serialized = toml::to_string(&config).unwrap();
        let back: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(config, back);
    }
}
