//! Error types for stack state loading.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while reading stack state.
///
/// Only whole-file problems are errors. A single malformed resource record
/// inside an otherwise readable checkpoint is skipped, not reported here.
#[derive(Error, Debug)]
pub enum StateError {
    /// Couldn't read the file or directory.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file isn't valid JSON.
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The document has no `checkpoint.latest` section.
    #[error("no checkpoint found in {0}")]
    MissingCheckpoint(PathBuf),

    /// The requested stack doesn't exist in the state directory.
    #[error("stack '{stack}' not found in project '{project}'")]
    StackNotFound { project: String, stack: String },

    /// The state directory path isn't a directory.
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
}

impl StateError {
    /// Creates an IO error with path context.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Creates a JSON error with path context.
    pub fn json(path: impl AsRef<Path>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

/// Result type for state operations.
pub type Result<T> = std::result::Result<T, StateError>;
