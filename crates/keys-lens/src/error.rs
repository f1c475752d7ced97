//! Error types for keys-lens

use keys_fs::NormalizedPath;

/// Result type for keys-lens operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading, editing, or committing a tree
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to parse {path} at line {line}: {message}")]
    ParseError {
        path: NormalizedPath,
        line: usize,
        message: String,
    },

    #[error("Failed to read {path}: {source}")]
    ReadError {
        path: NormalizedPath,
        #[source]
        source: keys_fs::Error,
    },

    #[error("Failed to write {path}: {source}")]
    WriteError {
        path: NormalizedPath,
        #[source]
        source: keys_fs::Error,
    },

    #[error("Path not found: {path}")]
    PathNotFound { path: String },

    #[error("Path {path} matches {count} nodes, expected at most one")]
    MultipleMatches { path: String, count: usize },

    #[error("File not loaded: {path}")]
    FileNotLoaded { path: NormalizedPath },

    #[error("Invalid path {path}: {message}")]
    InvalidPath { path: String, message: String },

    #[error("Invalid node: {message}")]
    InvalidNode { message: String },
}

impl Error {
    pub(crate) fn invalid_path(path: impl ToString, message: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid_node(message: impl Into<String>) -> Self {
        Self::InvalidNode {
            message: message.into(),
        }
    }
}
