//! Registry mapping action class names to factories.
//!
//! Trigger configs name their actions by `class`; the [`ActionRegistry`]
//! turns that name into a fresh, unconfigured [`TriggerAction`]. Only types
//! registered here can be instantiated, so an unknown class is a
//! configuration error rather than a lookup at runtime.
//!
//! Thread-safe and cheaply cloneable: all instances share the same
//! underlying storage via `Arc`.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::action::{LogAction, TriggerAction};
use crate::error::ActionError;

/// Builds a new, unconfigured action instance.
pub type ActionFactory = Arc<dyn Fn() -> Box<dyn TriggerAction> + Send + Sync>;

/// Thread-safe registry of action factories keyed by class name.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    inner: Arc<RwLock<BTreeMap<String, ActionFactory>>>,
}

impl ActionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in actions (`LogAction`).
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register(LogAction::CLASS, || Box::new(LogAction::new()));
        registry
    }

    /// Register a factory. Overwrites any previous factory for `class`.
    pub fn register<F>(&self, class: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn TriggerAction> + Send + Sync + 'static,
    {
        let mut guard = self.inner.write();
        guard.insert(class.into(), Arc::new(factory));
    }

    /// Whether a factory is registered for `class`.
    pub fn contains(&self, class: &str) -> bool {
        self.inner.read().contains_key(class)
    }

    /// Registered class names, sorted.
    pub fn classes(&self) -> Vec<String> {
        self.inner.read().keys().cloned().collect()
    }

    /// Instantiate the action registered under `class`.
    pub fn create(&self, class: &str) -> Result<Box<dyn TriggerAction>, ActionError> {
        // Clone the factory out so the lock isn't held while it runs.
        let factory = self
            .inner
            .read()
            .get(class)
            .cloned()
            .ok_or_else(|| ActionError::UnknownClass(class.to_string()))?;
        Ok(factory())
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("classes", &self.classes())
            .finish()
    }
}
