//! Error types for llmpole
//!
//! Only a handful of conditions are fatal: the machine's RAM could not be
//! read, the bundled model dataset is corrupt, or the user asked for
//! something that does not exist. Everything else (GPU probes, the user
//! overlay file, implausible VRAM figures) degrades to a documented fallback
//! at the point of failure and never reaches this type.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for llmpole operations
#[derive(Error, Debug)]
pub enum PoleError {
    /// I/O error while reading or writing a file
    #[error("I/O error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// System memory could not be detected, so no snapshot can be built
    #[error("System resource detection error: {0}")]
    ResourceDetection(String),

    /// A model dataset could not be parsed
    #[error("Model dataset error in {origin}: {message}")]
    Dataset { origin: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// No model matched a lookup
    #[error("No model found matching '{0}'")]
    ModelNotFound(String),

    /// More than one model matched a lookup that needs exactly one
    #[error("{} models match '{query}', please be more specific", .matches.len())]
    AmbiguousModel { query: String, matches: Vec<String> },

    /// JSON encoding failure while rendering output
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PoleError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a dataset error for a named origin (file path or "bundled dataset")
    pub fn dataset(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Dataset {
            origin: origin.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether this is an I/O error for a file that does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Result type alias for llmpole operations
pub type Result<T> = std::result::Result<T, PoleError>;

impl From<std::io::Error> for PoleError {
    fn from(err: std::io::Error) -> Self {
        PoleError::Io {
            path: PathBuf::new(),
            source: err,
        }
    }
}

/// Extension trait for adding path context to std::io::Result
pub trait IoResultExt<T> {
    /// Add path context to an I/O error
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| PoleError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_with_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = PoleError::io("/test/models.json", io_err);
        assert!(err.is_not_found());
        assert!(err.to_string().contains("/test/models.json"));
    }

    #[test]
    fn test_with_path_extension() {
        let res: std::io::Result<()> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        let err = res.with_path("/etc/llmpole").unwrap_err();
        assert!(err.to_string().contains("/etc/llmpole"));
    }

    #[test]
    fn test_ambiguous_message_counts_matches() {
        let err = PoleError::AmbiguousModel {
            query: "qwen".to_string(),
            matches: vec!["a".to_string(), "b".to_string(), "c".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "3 models match 'qwen', please be more specific"
        );
    }

    #[test]
    fn test_not_found_only_for_missing_files() {
        assert!(!PoleError::config("bad").is_not_found());
        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(!PoleError::io("/x", denied).is_not_found());
    }
}
