// error.rs — Error types for coordination-store operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by [`DistribStateStore`](crate::DistribStateStore) backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No node exists at the path.
    #[error("no node at '{0}'")]
    NotFound(String),

    /// A node already exists at the path (returned by `make_path`).
    #[error("node already exists at '{0}'")]
    AlreadyExists(String),

    /// A conditional write named a version that doesn't match the node.
    #[error("version mismatch at '{path}': expected {expected}, found {actual}")]
    BadVersion {
        path: String,
        expected: u64,
        actual: u64,
    },

    /// The node still has children and can't be removed.
    #[error("node at '{0}' has children")]
    NotEmpty(String),

    /// The path is not an absolute `/`-separated path.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// The store has been shut down.
    #[error("state store is closed")]
    Closed,

    /// A blocking call was interrupted before it completed.
    #[error("interrupted while accessing '{0}'")]
    Interrupted(String),

    /// A file I/O operation failed (file backend).
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Any other backend failure (connectivity, corrupt node, ...).
    #[error("state store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// True when the store reported that it has already been shut down.
    pub fn is_closed(&self) -> bool {
        matches!(self, StoreError::Closed)
    }

    /// True when the call was interrupted and the interruption must reach the caller.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, StoreError::Interrupted(_))
    }
}
