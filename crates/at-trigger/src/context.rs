// context.rs — What a trigger and its actions get to see of the host.

use std::sync::Arc;

use at_state::DistribStateStore;

use crate::registry::ActionRegistry;

/// Host capabilities handed to `configure`: the registry used to resolve
/// action classes and the coordination store used for checkpoints.
///
/// Cheap to clone; every clone shares the same registry and store.
#[derive(Clone)]
pub struct TriggerContext {
    registry: ActionRegistry,
    store: Arc<dyn DistribStateStore>,
}

impl TriggerContext {
    pub fn new(registry: ActionRegistry, store: Arc<dyn DistribStateStore>) -> Self {
        Self { registry, store }
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn DistribStateStore> {
        &self.store
    }
}

impl std::fmt::Debug for TriggerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerContext")
            .field("registry", &self.registry)
            .field("store_closed", &self.store.is_closed())
            .finish()
    }
}
