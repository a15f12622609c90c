// checkpoint.rs — StateCheckpointer: trigger state ⇄ coordination store.
//
// The checkpoint for trigger `name` lives at `TRIGGER_STATE_PATH/name` as
// compact JSON of the canonical state. Writes are blind overwrites: one
// trigger instance owns its checkpoint, and the host guarantees there is a
// single owner per trigger name, so no version check is made.
//
// The checkpointer reports every failure as a CheckpointError. Whether a
// failure is logged, ignored, or propagated is the caller's decision.

use std::sync::Arc;

use at_state::{trigger_state_path, DistribStateStore, StoreError};
use serde_json::Value;

use crate::error::CheckpointError;
use crate::state::{CanonicalState, StateMap};

/// Result of a successful [`StateCheckpointer::save`].
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// The state equals the last written checkpoint; nothing was written.
    Unchanged,
    /// The state was written; this is the new last-written checkpoint.
    Written(CanonicalState),
}

/// Persists one trigger's state at its well-known store path.
pub struct StateCheckpointer {
    store: Arc<dyn DistribStateStore>,
    path: String,
}

impl StateCheckpointer {
    pub fn new(store: Arc<dyn DistribStateStore>, trigger_name: &str) -> Self {
        Self {
            store,
            path: trigger_state_path(trigger_name),
        }
    }

    /// Store path of the checkpoint.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Canonicalize `current` and write it unless it equals `last_written`.
    ///
    /// On error, the caller's `last_written` remains the last good checkpoint.
    pub fn save(
        &self,
        current: &StateMap,
        last_written: Option<&CanonicalState>,
    ) -> Result<SaveOutcome, CheckpointError> {
        let state = CanonicalState::from_map(current)?;
        if last_written == Some(&state) {
            return Ok(SaveOutcome::Unchanged);
        }

        let data = state.encode().map_err(CheckpointError::Encode)?;
        let version = self
            .store
            .set_data(&self.path, &data, None)
            .map_err(|source| self.store_error(source))?;
        tracing::debug!(path = %self.path, version, bytes = data.len(), "wrote trigger state");
        Ok(SaveOutcome::Written(state))
    }

    /// Read the checkpoint, if one exists.
    pub fn restore(&self) -> Result<Option<CanonicalState>, CheckpointError> {
        if !self
            .store
            .has_data(&self.path)
            .map_err(|source| self.store_error(source))?
        {
            return Ok(None);
        }
        let versioned = match self.store.get_data(&self.path) {
            Ok(versioned) => versioned,
            // Removed between the existence check and the read.
            Err(StoreError::NotFound(_)) => return Ok(None),
            Err(source) => return Err(self.store_error(source)),
        };

        let value: Value =
            serde_json::from_slice(&versioned.data).map_err(|source| CheckpointError::Decode {
                path: self.path.clone(),
                source,
            })?;
        let map = match value {
            Value::Object(map) => map,
            _ => {
                return Err(CheckpointError::NotAMap {
                    path: self.path.clone(),
                })
            }
        };
        Ok(Some(CanonicalState::from_map(&map)?))
    }

    fn store_error(&self, source: StoreError) -> CheckpointError {
        CheckpointError::Store {
            path: self.path.clone(),
            source,
        }
    }
}

impl std::fmt::Debug for StateCheckpointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateCheckpointer")
            .field("path", &self.path)
            .finish()
    }
}
