// error.rs — Error types for the trigger harness.
//
// TriggerError is what lifecycle calls return. Checkpoint failures never
// surface as TriggerError except for interruption: the lifecycle logs them
// and keeps the trigger running.

use std::collections::BTreeMap;

use at_state::StoreError;
use thiserror::Error;

/// Errors returned by [`Trigger`](crate::Trigger) lifecycle calls.
#[derive(Debug, Error)]
pub enum TriggerError {
    /// Invalid or missing properties, or an action that couldn't be created.
    /// Nothing from the failed `configure` call was committed.
    #[error("invalid configuration for trigger '{trigger}': {}", format_details(.details))]
    Configuration {
        trigger: String,
        /// Offending property → reason.
        details: BTreeMap<String, String>,
    },

    /// `init` failed; the trigger must not be treated as active.
    #[error("trigger '{trigger}' failed to initialize: {source}")]
    Init {
        trigger: String,
        #[source]
        source: InitError,
    },

    /// A blocking store call was interrupted.
    #[error("trigger '{trigger}' was interrupted during {operation}")]
    Interrupted {
        trigger: String,
        operation: &'static str,
    },

    /// The call needs a store, but `configure` has not succeeded yet.
    #[error("trigger '{trigger}' has not been configured")]
    NotConfigured { trigger: String },
}

impl TriggerError {
    /// Per-property details of a configuration error.
    pub fn details(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            TriggerError::Configuration { details, .. } => Some(details),
            _ => None,
        }
    }
}

fn format_details(details: &BTreeMap<String, String>) -> String {
    details
        .iter()
        .map(|(property, reason)| format!("{}: {}", property, reason))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Cause of a failed `init`.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("could not create trigger state path: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Action(#[from] ActionError),
}

/// Errors raised by actions and by the action pipeline.
#[derive(Debug, Error)]
pub enum ActionError {
    /// No factory is registered under this class name.
    #[error("unknown action class '{0}'")]
    UnknownClass(String),

    /// The `actions` property is not a list.
    #[error("`actions` must be a list of maps, got {0}")]
    NotAList(String),

    /// The action spec itself is malformed.
    #[error("invalid action spec #{index}: {reason}")]
    InvalidSpec { index: usize, reason: String },

    /// Resolving or configuring the action at `index` failed.
    #[error("exception creating action #{index} ({class}): {source}")]
    Build {
        index: usize,
        class: String,
        #[source]
        source: Box<ActionError>,
    },

    #[error("action '{action}' rejected its configuration: {reason}")]
    Configure { action: String, reason: String },

    #[error("action '{action}' failed to initialize: {reason}")]
    Init { action: String, reason: String },

    #[error("action '{action}' failed to process event: {reason}")]
    Process { action: String, reason: String },

    #[error("action '{action}' failed to close: {reason}")]
    Close { action: String, reason: String },
}

/// Canonicalization failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    /// The state tree nests deeper than the canonical form allows.
    #[error("state nests deeper than {max_depth} levels")]
    TooDeep { max_depth: usize },
}

/// Failures of a single checkpoint save or restore.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("state store error at '{path}': {source}")]
    Store {
        path: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to encode trigger state: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode trigger state at '{path}': {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("trigger state at '{path}' is not a map")]
    NotAMap { path: String },

    #[error(transparent)]
    State(#[from] StateError),
}

impl CheckpointError {
    /// The store reported that it has been shut down.
    pub fn is_store_closed(&self) -> bool {
        matches!(self, CheckpointError::Store { source, .. } if source.is_closed())
    }

    /// The store call was interrupted.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, CheckpointError::Store { source, .. } if source.is_interrupted())
    }
}
