// action.rs — The TriggerAction capability and the built-in LogAction.
//
// Actions are auxiliary components composed into a trigger. They follow the
// trigger's lifecycle: created and configured during the trigger's
// `configure`, initialized during `init`, closed during `close`. Between
// init and close they may be asked to process fired events.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::context::TriggerContext;
use crate::error::ActionError;
use crate::event::TriggerEvent;
use crate::validation::{self, PropertyMap, PropertySet};

/// An auxiliary component run alongside a trigger.
///
/// `configure` is the only call that gets `&mut self`: it happens before the
/// action is shared. Every other call may arrive from any thread.
pub trait TriggerAction: Send + Sync {
    /// Display name (defaults to the class name for the built-ins).
    fn name(&self) -> &str;

    /// Apply the action's spec. `properties` includes `class`.
    fn configure(
        &mut self,
        ctx: &TriggerContext,
        properties: &PropertyMap,
    ) -> Result<(), ActionError>;

    /// Acquire resources before the trigger starts.
    fn init(&self) -> Result<(), ActionError> {
        Ok(())
    }

    /// Handle an event fired by the owning trigger.
    fn process(&self, event: &TriggerEvent) -> Result<(), ActionError>;

    /// Release resources. Must be idempotent: a trigger closed twice closes
    /// its actions twice.
    fn close(&self) -> Result<(), ActionError> {
        Ok(())
    }
}

/// Logs every processed event.
///
/// Properties: `name` (optional), `class`, `message` (optional prefix for the
/// log line).
pub struct LogAction {
    name: String,
    message: String,
    processed: AtomicU64,
    closed: AtomicBool,
}

impl LogAction {
    pub const CLASS: &'static str = "LogAction";

    pub fn new() -> Self {
        Self {
            name: Self::CLASS.to_string(),
            message: "trigger event".to_string(),
            processed: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Number of events processed so far.
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::SeqCst)
    }

    fn valid_properties() -> PropertySet {
        let mut valid = PropertySet::new();
        validation::valid_properties(&mut valid, &["name", "class", "message"]);
        valid
    }
}

impl Default for LogAction {
    fn default() -> Self {
        Self::new()
    }
}

impl TriggerAction for LogAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn configure(
        &mut self,
        _ctx: &TriggerContext,
        properties: &PropertyMap,
    ) -> Result<(), ActionError> {
        let errors =
            validation::check_properties(properties, &PropertySet::new(), &Self::valid_properties());
        if !errors.is_empty() {
            let reason = errors
                .iter()
                .map(|(k, v)| format!("{}: {}", k, v))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ActionError::Configure {
                action: self.name.clone(),
                reason,
            });
        }

        if let Some(name) = properties.get("name").and_then(|v| v.as_str()) {
            self.name = name.to_string();
        }
        if let Some(message) = properties.get("message").and_then(|v| v.as_str()) {
            self.message = message.to_string();
        }
        Ok(())
    }

    fn process(&self, event: &TriggerEvent) -> Result<(), ActionError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ActionError::Process {
                action: self.name.clone(),
                reason: "action is closed".to_string(),
            });
        }
        self.processed.fetch_add(1, Ordering::SeqCst);
        tracing::info!(
            action = %self.name,
            event_id = %event.id,
            event_type = %event.event_type,
            source = %event.source,
            "{}",
            self.message
        );
        Ok(())
    }

    fn close(&self) -> Result<(), ActionError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
