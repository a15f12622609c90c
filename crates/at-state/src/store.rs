// store.rs — DistribStateStore trait and path helpers.
//
// Paths are absolute and `/`-separated ("/autoscaling/triggerState/foo").
// Every node may carry a byte payload and a version; the version starts at 0
// when the node is created and increments on every write.
//
// All calls block until the backend answers. Backends are shared between
// threads (the trigger's background worker and the control thread), so the
// trait requires Send + Sync and takes `&self` everywhere.

use crate::error::StoreError;

/// Base path under which every trigger keeps its checkpoint.
pub const TRIGGER_STATE_PATH: &str = "/autoscaling/triggerState";

/// A node payload together with the version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedData {
    pub data: Vec<u8>,
    pub version: u64,
}

/// Blocking client for a hierarchical coordination store.
///
/// This is the only surface triggers use to persist state. Implementations
/// decide how nodes are stored; callers only rely on the semantics below.
pub trait DistribStateStore: Send + Sync {
    /// Whether a node exists at `path`.
    fn has_data(&self, path: &str) -> Result<bool, StoreError>;

    /// Create the node at `path`, including any missing ancestors.
    ///
    /// Returns [`StoreError::AlreadyExists`] if the node itself already exists.
    fn make_path(&self, path: &str) -> Result<(), StoreError>;

    /// Read the payload stored at `path`.
    fn get_data(&self, path: &str) -> Result<VersionedData, StoreError>;

    /// Write `data` at `path` and return the node's new version.
    ///
    /// With `expected_version: None` the write is a blind overwrite and
    /// creates the node if needed (its parent must exist). With `Some(v)` the
    /// node must exist at version `v`.
    fn set_data(
        &self,
        path: &str,
        data: &[u8],
        expected_version: Option<u64>,
    ) -> Result<u64, StoreError>;

    /// Names of the direct children of `path`, sorted.
    fn list_data(&self, path: &str) -> Result<Vec<String>, StoreError>;

    /// Remove the (childless) node at `path`. Returns false if it didn't exist.
    fn remove_data(&self, path: &str) -> Result<bool, StoreError>;

    /// Shut the store down. Every later call fails with [`StoreError::Closed`].
    fn close(&self);

    /// Whether [`close`](Self::close) has been called.
    fn is_closed(&self) -> bool;
}

/// Checkpoint path for the trigger named `trigger_name`.
pub fn trigger_state_path(trigger_name: &str) -> String {
    join_path(TRIGGER_STATE_PATH, trigger_name)
}

/// Join a child name onto a parent path.
pub fn join_path(parent: &str, child: &str) -> String {
    if parent == "/" {
        format!("/{}", child)
    } else {
        format!("{}/{}", parent.trim_end_matches('/'), child)
    }
}

/// Parent of a normalized path (`"/"` for top-level nodes and for the root).
pub fn parent_path(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some(("", _)) | None => "/",
        Some((parent, _)) => parent,
    }
}

/// Validate `path` and strip any trailing separator.
///
/// Segments must be non-empty and may not start with `.` (the file backend
/// keeps its bookkeeping files under dot-names).
pub fn normalize_path(path: &str) -> Result<String, StoreError> {
    let invalid = |reason: &str| StoreError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    };

    if !path.starts_with('/') {
        return Err(invalid("must be absolute"));
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok("/".to_string());
    }
    for segment in trimmed[1..].split('/') {
        if segment.is_empty() {
            return Err(invalid("empty segment"));
        }
        if segment.starts_with('.') {
            return Err(invalid("segments may not start with '.'"));
        }
    }
    Ok(trimmed.to_string())
}
