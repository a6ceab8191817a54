//! Error types for symgraph.
//!
//! Only a handful of conditions are fatal to a run (an unusable root
//! directory, mostly). Everything that goes wrong for a single file is
//! reported as a [`ParseFailure`] value instead and the run continues.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SymgraphError>;

#[derive(Error, Debug)]
pub enum SymgraphError {
    #[error("invalid root directory: {}", .0.display())]
    InvalidRoot(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("grammar load failed: {0}")]
    Grammar(#[from] tree_sitter::LanguageError),

    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("source not found: {0}")]
    SourceNotFound(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A source unit that could not be loaded or parsed.
///
/// The module it belongs to is kept in the graph in its minimal form
/// (pseudo-symbol only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseFailure {
    /// Repository-relative path of the file.
    pub path: String,
    /// Human-readable reason.
    pub message: String,
}

impl ParseFailure {
    pub fn new(path: impl Into<String>, message: impl fmt::Display) -> Self {
        Self {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_failure_display() {
        let failure = ParseFailure::new("pkg/broken.py", "syntax error at line 3");
        assert_eq!(failure.to_string(), "pkg/broken.py: syntax error at line 3");
    }

    #[test]
    fn test_invalid_root_message() {
        let err = SymgraphError::InvalidRoot(PathBuf::from("/does/not/exist"));
        assert!(err.to_string().contains("/does/not/exist"));
    }
}
