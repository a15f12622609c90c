// memory.rs — MemoryStateStore: an in-process coordination store.
//
// Nodes live in a BTreeMap keyed by normalized path, so the children of a
// node are a contiguous range of keys. The root node always exists.
//
// Clones share the same node map, which lets tests hand one handle to a
// trigger and inspect the store through another.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::StoreError;
use crate::store::{normalize_path, parent_path, DistribStateStore, VersionedData};

#[derive(Debug, Clone, Default)]
struct Node {
    data: Vec<u8>,
    version: u64,
}

/// Thread-safe, cheaply cloneable in-memory store.
#[derive(Clone)]
pub struct MemoryStateStore {
    nodes: Arc<RwLock<BTreeMap<String, Node>>>,
    closed: Arc<AtomicBool>,
}

impl MemoryStateStore {
    /// Create an empty store containing only the root node.
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::default());
        Self {
            nodes: Arc::new(RwLock::new(nodes)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Number of nodes, including the root.
    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    /// True if only the root node exists.
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

impl Default for MemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStateStore")
            .field("nodes", &self.len())
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}

/// Prefix shared by every descendant key of `path`.
fn child_prefix(path: &str) -> String {
    if path == "/" {
        "/".to_string()
    } else {
        format!("{}/", path)
    }
}

impl DistribStateStore for MemoryStateStore {
    fn has_data(&self, path: &str) -> Result<bool, StoreError> {
        self.ensure_open()?;
        let path = normalize_path(path)?;
        Ok(self.nodes.read().contains_key(&path))
    }

    fn make_path(&self, path: &str) -> Result<(), StoreError> {
        self.ensure_open()?;
        let path = normalize_path(path)?;
        let mut nodes = self.nodes.write();
        if nodes.contains_key(&path) {
            return Err(StoreError::AlreadyExists(path));
        }

        let mut current = String::new();
        for segment in path[1..].split('/') {
            current.push('/');
            current.push_str(segment);
            nodes.entry(current.clone()).or_default();
        }
        Ok(())
    }

    fn get_data(&self, path: &str) -> Result<VersionedData, StoreError> {
        self.ensure_open()?;
        let path = normalize_path(path)?;
        let nodes = self.nodes.read();
        let node = nodes.get(&path).ok_or(StoreError::NotFound(path.clone()))?;
        Ok(VersionedData {
            data: node.data.clone(),
            version: node.version,
        })
    }

    fn set_data(
        &self,
        path: &str,
        data: &[u8],
        expected_version: Option<u64>,
    ) -> Result<u64, StoreError> {
        self.ensure_open()?;
        let path = normalize_path(path)?;
        let mut nodes = self.nodes.write();

        if let Some(node) = nodes.get_mut(&path) {
            if let Some(expected) = expected_version {
                if node.version != expected {
                    return Err(StoreError::BadVersion {
                        path,
                        expected,
                        actual: node.version,
                    });
                }
            }
            node.data = data.to_vec();
            node.version += 1;
            return Ok(node.version);
        }

        if expected_version.is_some() {
            return Err(StoreError::NotFound(path));
        }
        let parent = parent_path(&path);
        if !nodes.contains_key(parent) {
            return Err(StoreError::NotFound(parent.to_string()));
        }
        nodes.insert(
            path,
            Node {
                data: data.to_vec(),
                version: 0,
            },
        );
        Ok(0)
    }

    fn list_data(&self, path: &str) -> Result<Vec<String>, StoreError> {
        self.ensure_open()?;
        let path = normalize_path(path)?;
        let nodes = self.nodes.read();
        if !nodes.contains_key(&path) {
            return Err(StoreError::NotFound(path));
        }

        let prefix = child_prefix(&path);
        let children = nodes
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter_map(|(key, _)| {
                let rest = &key[prefix.len()..];
                (!rest.is_empty() && !rest.contains('/')).then(|| rest.to_string())
            })
            .collect();
        Ok(children)
    }

    fn remove_data(&self, path: &str) -> Result<bool, StoreError> {
        self.ensure_open()?;
        let path = normalize_path(path)?;
        if path == "/" {
            return Err(StoreError::InvalidPath {
                path,
                reason: "the root node can't be removed".to_string(),
            });
        }
        let mut nodes = self.nodes.write();
        if !nodes.contains_key(&path) {
            return Ok(false);
        }

        let prefix = child_prefix(&path);
        let has_children = nodes
            .range(prefix.clone()..)
            .next()
            .is_some_and(|(key, _)| key.starts_with(&prefix));
        if has_children {
            return Err(StoreError::NotEmpty(path));
        }
        nodes.remove(&path);
        Ok(true)
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::debug!("memory state store closed");
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn make_path_creates_ancestors() {
        let store = MemoryStateStore::new();
        store.make_path("/autoscaling/triggerState").unwrap();

        assert!(store.has_data("/autoscaling").unwrap());
        assert!(store.has_data("/autoscaling/triggerState").unwrap());
        assert_eq!(store.list_data("/").unwrap(), vec!["autoscaling"]);
    }

    #[test]
    fn make_path_twice_reports_already_exists() {
        let store = MemoryStateStore::new();
        store.make_path("/a/b").unwrap();
        assert!(matches!(
            store.make_path("/a/b"),
            Err(StoreError::AlreadyExists(_))
        ));
        // Intermediate nodes are created silently.
        store.make_path("/a/c").unwrap();
    }

    #[test]
    fn blind_write_creates_then_bumps_version() {
        let store = MemoryStateStore::new();
        store.make_path("/a").unwrap();

        assert_eq!(store.set_data("/a/x", b"one", None).unwrap(), 0);
        assert_eq!(store.set_data("/a/x", b"two", None).unwrap(), 1);

        let read = store.get_data("/a/x").unwrap();
        assert_eq!(read.data, b"two");
        assert_eq!(read.version, 1);
    }

    #[test]
    fn write_without_parent_fails() {
        let store = MemoryStateStore::new();
        let err = store.set_data("/missing/x", b"data", None).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(p) if p == "/missing"));
    }

    #[test]
    fn conditional_write_checks_version() {
        let store = MemoryStateStore::new();
        store.set_data("/x", b"v0", None).unwrap();

        assert_eq!(store.set_data("/x", b"v1", Some(0)).unwrap(), 1);
        let err = store.set_data("/x", b"v2", Some(0)).unwrap_err();
        assert!(matches!(
            err,
            StoreError::BadVersion {
                expected: 0,
                actual: 1,
                ..
            }
        ));
        assert!(matches!(
            store.set_data("/y", b"v0", Some(0)),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn get_missing_node_is_not_found() {
        let store = MemoryStateStore::new();
        assert!(!store.has_data("/nope").unwrap());
        assert!(matches!(
            store.get_data("/nope"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn list_returns_direct_children_only() {
        let store = MemoryStateStore::new();
        store.make_path("/t/a/deep").unwrap();
        store.set_data("/t/b", b"", None).unwrap();
        store.make_path("/tx").unwrap();

        assert_eq!(store.list_data("/t").unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn remove_refuses_nodes_with_children() {
        let store = MemoryStateStore::new();
        store.make_path("/t/a").unwrap();

        assert!(matches!(store.remove_data("/t"), Err(StoreError::NotEmpty(_))));
        assert!(store.remove_data("/t/a").unwrap());
        assert!(!store.remove_data("/t/a").unwrap());
        assert!(store.remove_data("/t").unwrap());
    }

    #[test]
    fn closed_store_rejects_everything() {
        let store = MemoryStateStore::new();
        let other = store.clone();
        store.close();

        assert!(other.is_closed());
        assert!(matches!(other.has_data("/"), Err(StoreError::Closed)));
        assert!(matches!(
            other.set_data("/x", b"", None),
            Err(StoreError::Closed)
        ));
    }
}
