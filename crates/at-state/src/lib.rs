//! # at-state
//!
//! The coordination-store boundary used by autoscaling triggers to persist
//! their checkpoints.
//!
//! A coordination store is a hierarchical key/value service: `/`-separated
//! paths, each node holding a versioned byte payload. Triggers only need a
//! handful of operations (existence check, idempotent path creation, blind
//! write, read), captured by the [`DistribStateStore`] trait.
//!
//! ## Key components
//!
//! - [`DistribStateStore`] — the store capability (blocking, thread-safe)
//! - [`MemoryStateStore`] — in-process backend, useful for tests and
//!   single-process deployments
//! - [`FileStateStore`] — directory-backed backend that survives restarts
//! - [`StoreConfig`] — TOML configuration selecting and opening a backend
//! - [`TRIGGER_STATE_PATH`] — the well-known base path for trigger checkpoints

pub mod config;
pub mod error;
pub mod file;
pub mod memory;
pub mod store;

pub use config::{ConfigError, StoreBackend, StoreConfig};
pub use error::StoreError;
pub use file::FileStateStore;
pub use memory::MemoryStateStore;
pub use store::{
    join_path, normalize_path, parent_path, trigger_state_path, DistribStateStore, VersionedData,
    TRIGGER_STATE_PATH,
};
