// file.rs — FileStateStore: a directory-backed coordination store.
//
// Each node is a directory under the store root: `/a/b` lives at
// `<root>/a/b/`. A node's payload and version are kept together in
// `<node dir>/.node` (8-byte big-endian version followed by the payload), so
// a write replaces both in one rename. Nodes without a `.node` file (created
// by `make_path`) read as an empty payload at version 0.
//
// Writes go to a temp file that is synced before it is renamed over
// `.node`. A blind write over a node whose `.node` can't be read replaces it
// and restarts its version at 0. A process-local mutex serializes read-modify-write cycles;
// the store assumes one process owns the directory.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::error::StoreError;
use crate::store::{normalize_path, parent_path, DistribStateStore, VersionedData};

const NODE_FILE: &str = ".node";
const NODE_TMP_FILE: &str = ".node.tmp";
const VERSION_LEN: usize = 8;

/// Durable store rooted at a local directory.
pub struct FileStateStore {
    root: PathBuf,
    write_lock: Mutex<()>,
    closed: AtomicBool,
}

impl FileStateStore {
    /// Open (or create) a store rooted at `root`.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|source| StoreError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
        })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    /// Directory backing a normalized store path.
    fn node_dir(&self, path: &str) -> PathBuf {
        let mut dir = self.root.clone();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            dir.push(segment);
        }
        dir
    }

    fn read_node(&self, dir: &Path) -> Result<VersionedData, StoreError> {
        let file = dir.join(NODE_FILE);
        let bytes = match fs::read(&file) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(VersionedData {
                    data: Vec::new(),
                    version: 0,
                })
            }
            Err(source) => return Err(StoreError::Io { path: file, source }),
        };
        if bytes.len() < VERSION_LEN {
            return Err(StoreError::Backend(format!(
                "corrupt node file {}",
                file.display()
            )));
        }
        let (header, data) = bytes.split_at(VERSION_LEN);
        let mut version = [0u8; VERSION_LEN];
        version.copy_from_slice(header);
        Ok(VersionedData {
            data: data.to_vec(),
            version: u64::from_be_bytes(version),
        })
    }

    fn write_node(&self, dir: &Path, data: &[u8], version: u64) -> Result<(), StoreError> {
        let tmp = dir.join(NODE_TMP_FILE);
        let mut bytes = Vec::with_capacity(VERSION_LEN + data.len());
        bytes.extend_from_slice(&version.to_be_bytes());
        bytes.extend_from_slice(data);
        let io_err = |source| StoreError::Io {
            path: tmp.clone(),
            source,
        };
        let mut file = fs::File::create(&tmp).map_err(io_err)?;
        file.write_all(&bytes).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        drop(file);
        let file = dir.join(NODE_FILE);
        fs::rename(&tmp, &file).map_err(|source| StoreError::Io { path: file, source })
    }

    fn child_names(&self, dir: &Path) -> Result<Vec<String>, StoreError> {
        let entries = fs::read_dir(dir).map_err(|source| StoreError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.starts_with('.') {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

impl std::fmt::Debug for FileStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStateStore")
            .field("root", &self.root)
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}

impl DistribStateStore for FileStateStore {
    fn has_data(&self, path: &str) -> Result<bool, StoreError> {
        self.ensure_open()?;
        let path = normalize_path(path)?;
        Ok(self.node_dir(&path).is_dir())
    }

    fn make_path(&self, path: &str) -> Result<(), StoreError> {
        self.ensure_open()?;
        let path = normalize_path(path)?;
        let dir = self.node_dir(&path);
        let _guard = self.write_lock.lock();
        if dir.is_dir() {
            return Err(StoreError::AlreadyExists(path));
        }
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io { path: dir, source })
    }

    fn get_data(&self, path: &str) -> Result<VersionedData, StoreError> {
        self.ensure_open()?;
        let path = normalize_path(path)?;
        let dir = self.node_dir(&path);
        if !dir.is_dir() {
            return Err(StoreError::NotFound(path));
        }
        self.read_node(&dir)
    }

    fn set_data(
        &self,
        path: &str,
        data: &[u8],
        expected_version: Option<u64>,
    ) -> Result<u64, StoreError> {
        self.ensure_open()?;
        let path = normalize_path(path)?;
        let dir = self.node_dir(&path);
        let _guard = self.write_lock.lock();

        if dir.is_dir() {
            let version = match (self.read_node(&dir), expected_version) {
                (Ok(current), Some(expected)) if current.version != expected => {
                    return Err(StoreError::BadVersion {
                        path,
                        expected,
                        actual: current.version,
                    });
                }
                (Ok(current), _) => current.version + 1,
                // A blind write replaces an unreadable node outright.
                (Err(e), None) => {
                    tracing::warn!(path = %path, "overwriting unreadable node: {}", e);
                    0
                }
                (Err(e), Some(_)) => return Err(e),
            };
            self.write_node(&dir, data, version)?;
            return Ok(version);
        }

        if expected_version.is_some() {
            return Err(StoreError::NotFound(path));
        }
        let parent = parent_path(&path);
        if !self.node_dir(parent).is_dir() {
            return Err(StoreError::NotFound(parent.to_string()));
        }
        fs::create_dir(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        self.write_node(&dir, data, 0)?;
        Ok(0)
    }

    fn list_data(&self, path: &str) -> Result<Vec<String>, StoreError> {
        self.ensure_open()?;
        let path = normalize_path(path)?;
        let dir = self.node_dir(&path);
        if !dir.is_dir() {
            return Err(StoreError::NotFound(path));
        }
        self.child_names(&dir)
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
        let dir = self.node_dir(&path);
        let _guard = self.write_lock.lock();
        if !dir.is_dir() {
            return Ok(false);
        }
        if !self.child_names(&dir)?.is_empty() {
            return Err(StoreError::NotEmpty(path));
        }
        fs::remove_dir_all(&dir).map_err(|source| StoreError::Io { path: dir, source })?;
        Ok(true)
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::debug!(root = %self.root.display(), "file state store closed");
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
