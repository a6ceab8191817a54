//! Run configuration, read from `.symgraph/config.toml` under the project root.
//!
//! A missing file means defaults. A malformed file is reported with a
//! warning and also falls back to defaults, so a typo never blocks a build.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Result, SymgraphError};

/// Files larger than this are skipped before scheduling.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1_048_576;
/// Number of file bodies kept in the shared source cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymgraphConfig {
    /// Worker threads for the two passes. 0 uses the rayon default.
    pub workers: usize,
    /// Entries in the source cache. 0 disables caching.
    pub cache_capacity: usize,
    /// Size limit in bytes for a single source file.
    pub max_file_size: u64,
    /// Extra gitignore-style file honored during discovery.
    pub ignore_file: String,
    /// Path substrings marking test code (exempt from the print lint).
    pub test_markers: Vec<String>,
}

impl Default for SymgraphConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            ignore_file: ".ctxignore".to_string(),
            test_markers: vec!["test".to_string()],
        }
    }
}

impl SymgraphConfig {
    /// Conventional config location for a project root.
    pub fn path_for(root: &Path) -> PathBuf {
        root.join(".symgraph").join("config.toml")
    }

    /// Load config from `path`, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(Some(config)) => {
                debug!(path = %path.display(), "loaded config");
                config
            }
            Ok(None) => Self::default(),
            Err(e) => {
                warn!(error = %e, "ignoring config, using defaults");
                Self::default()
            }
        }
    }

    /// Load config from `path`. `Ok(None)` when the file does not exist.
    pub fn try_load(path: &Path) -> Result<Option<Self>> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SymgraphError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        toml::from_str(&text)
            .map(Some)
            .map_err(|source| SymgraphError::Config {
                path: path.to_path_buf(),
                source,
            })
    }

    /// True when `path` looks like test code.
    pub fn is_test_path(&self, path: &str) -> bool {
        let lower = path.to_lowercase();
        self.test_markers
            .iter()
            .any(|marker| lower.contains(&marker.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = SymgraphConfig::load(&SymgraphConfig::path_for(dir.path()));
        assert_eq!(config, SymgraphConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = SymgraphConfig::path_for(dir.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "workers = 2\ntest_markers = [\"spec\"]\n").unwrap();

        let config = SymgraphConfig::load(&path);
        assert_eq!(config.workers, 2);
        assert_eq!(config.test_markers, vec!["spec".to_string()]);
        assert_eq!(config.max_file_size, DEFAULT_MAX_FILE_SIZE);
    }

    #[test]
    fn test_malformed_file_falls_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "workers = \"many\"").unwrap();

        assert!(SymgraphConfig::try_load(&path).is_err());
        assert_eq!(SymgraphConfig::load(&path), SymgraphConfig::default());
    }

    #[test]
    fn test_is_test_path() {
        let config = SymgraphConfig::default();
        assert!(config.is_test_path("tests/test_api.py"));
        assert!(config.is_test_path("pkg/Testing/helpers.py"));
        assert!(!config.is_test_path("pkg/service.py"));
    }
}
