//! Store configuration loaded from `store.toml`.
//!
//! ```toml
//! backend = "file"
//! root = "/var/lib/autoscaling/state"
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::StoreError;
use crate::file::FileStateStore;
use crate::memory::MemoryStateStore;
use crate::store::DistribStateStore;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read store config: {0}")]
    Read(#[from] std::io::Error),
    #[error("Failed to parse store config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("The file backend requires a `root` directory")]
    MissingRoot,
    #[error("Failed to open state store: {0}")]
    Open(#[from] StoreError),
}

/// Which backend to open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Memory,
    File,
}

/// Coordination store configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend type: "memory" (default) or "file".
    #[serde(default)]
    pub backend: StoreBackend,

    /// Root directory for the file backend.
    #[serde(default)]
    pub root: Option<PathBuf>,
}

impl StoreConfig {
    /// Config for a file store rooted at `root`.
    pub fn file(root: impl Into<PathBuf>) -> Self {
        Self {
            backend: StoreBackend::File,
            root: Some(root.into()),
        }
    }

    /// Load the config from a TOML file.
    ///
    /// Returns the default (in-memory) config if the file doesn't exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: StoreConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Open the configured backend.
    pub fn open(&self) -> Result<Arc<dyn DistribStateStore>, ConfigError> {
        match self.backend {
            StoreBackend::Memory => Ok(Arc::new(MemoryStateStore::new())),
            StoreBackend::File => {
                let root = self.root.as_ref().ok_or(ConfigError::MissingRoot)?;
                tracing::debug!(root = %root.display(), "opening file state store");
                Ok(Arc::new(FileStateStore::new(root)?))
            }
        }
    }
}
