// trigger.rs — Trigger: the lifecycle shell shared by every trigger type.
//
// Lifecycle:
//   new → configure → init → (save_state / restore_state / dispatch)* → close
//
// Concrete trigger types supply their detection logic and a StateProvider;
// the shell owns everything else. Calls arrive from two directions: the
// host's control thread (configure, close) and the trigger's background
// worker (save/restore, dispatch). Shared fields are therefore either
// immutable after construction or published as whole snapshots:
//
// - ConfigSnapshot: properties + derived fields + action pipeline + context,
//   replaced wholesale by a successful configure. Readers clone the Arc and
//   never see a half-applied configuration.
// - processor: a single swappable slot; last writer wins.
// - closed: monotonic flag, set before the actions are closed.
//
// configure itself takes no lock across its work; the host serializes
// configure and close.

use std::hash::{Hash, Hasher};
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use at_state::{StoreError, TRIGGER_STATE_PATH};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::checkpoint::{SaveOutcome, StateCheckpointer};
use crate::context::TriggerContext;
use crate::error::{CheckpointError, InitError, StateError, TriggerError};
use crate::event::{TriggerEvent, TriggerEventProcessor, TriggerEventType};
use crate::pipeline::{ActionPipeline, ActionSpec};
use crate::state::{CanonicalState, StateMap};
use crate::validation::{self, PropertyMap, PropertySet};

/// Default for `waitFor` when the property is absent.
pub const DEFAULT_WAIT_FOR_SECOND: i64 = -1;

/// Exposes a concrete trigger's internal progress for checkpointing.
///
/// Implementations use interior mutability: the shell calls these from the
/// trigger's worker thread through a shared reference.
pub trait StateProvider: Send + Sync {
    /// Current internal state. Values must be plain JSON (maps, lists,
    /// strings, numbers, booleans, null).
    fn get_state(&self) -> StateMap;

    /// Replace internal state with a restored checkpoint. Never called with
    /// an absent state, though the map may be empty.
    fn set_state(&self, state: StateMap);
}

/// What [`Trigger::save_state`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    /// A new checkpoint was written.
    Written,
    /// State matched the last checkpoint; no write.
    Unchanged,
    /// The trigger is closed; no attempt was made.
    Skipped,
    /// The write failed and was logged; the previous checkpoint still stands.
    Failed,
}

/// One published configuration.
struct ConfigSnapshot {
    properties: Arc<PropertyMap>,
    enabled: bool,
    wait_for_second: i64,
    actions: Arc<ActionPipeline>,
    context: Option<TriggerContext>,
}

impl ConfigSnapshot {
    fn unconfigured() -> Self {
        Self {
            properties: Arc::new(PropertyMap::new()),
            enabled: false,
            wait_for_second: DEFAULT_WAIT_FOR_SECOND,
            actions: Arc::new(ActionPipeline::empty()),
            context: None,
        }
    }
}

/// The shared trigger harness, generic over the concrete trigger's state.
pub struct Trigger<P> {
    name: String,
    event_type: TriggerEventType,
    valid_properties: PropertySet,
    required_properties: PropertySet,
    config: RwLock<Arc<ConfigSnapshot>>,
    processor: RwLock<Option<Arc<dyn TriggerEventProcessor>>>,
    last_state: Mutex<Option<CanonicalState>>,
    closed: AtomicBool,
    provider: P,
}

impl<P: StateProvider> Trigger<P> {
    /// Create an unconfigured trigger accepting the base property set.
    pub fn new(event_type: TriggerEventType, name: impl Into<String>, provider: P) -> Self {
        Self {
            name: name.into(),
            event_type,
            valid_properties: validation::base_properties(),
            required_properties: PropertySet::new(),
            config: RwLock::new(Arc::new(ConfigSnapshot::unconfigured())),
            processor: RwLock::new(None),
            last_state: Mutex::new(None),
            closed: AtomicBool::new(false),
            provider,
        }
    }

    /// Accept additional properties.
    pub fn with_valid_properties<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        validation::valid_properties(&mut self.valid_properties, names);
        self
    }

    /// Require additional properties (they become valid as well).
    pub fn with_required_properties<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        validation::required_properties(
            &mut self.required_properties,
            &mut self.valid_properties,
            names,
        );
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn event_type(&self) -> TriggerEventType {
        self.event_type
    }

    pub fn valid_properties(&self) -> &PropertySet {
        &self.valid_properties
    }

    pub fn required_properties(&self) -> &PropertySet {
        &self.required_properties
    }

    /// The concrete trigger's state provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    fn snapshot(&self) -> Arc<ConfigSnapshot> {
        Arc::clone(&self.config.read())
    }

    fn not_configured(&self) -> TriggerError {
        TriggerError::NotConfigured {
            trigger: self.name.clone(),
        }
    }

    /// Merge `properties` over the current configuration and apply it.
    ///
    /// Derives `enabled` and `waitFor`, builds the action pipeline, then
    /// checks the merged map against the valid and required sets. Either all
    /// of it is published, or none of it is and a
    /// [`TriggerError::Configuration`] names every offending property.
    pub fn configure(
        &self,
        ctx: &TriggerContext,
        properties: &PropertyMap,
    ) -> Result<(), TriggerError> {
        let current = self.snapshot();
        let mut merged = current.properties.as_ref().clone();
        for (key, value) in properties {
            merged.insert(key.clone(), value.clone());
        }

        let mut details =
            validation::check_properties(&merged, &self.required_properties, &self.valid_properties);
        if self.name.is_empty() {
            details.insert("name".to_string(), "trigger name must not be empty".to_string());
        }

        let enabled = parse_enabled(merged.get("enabled"));
        let wait_for_second = match parse_wait_for(merged.get("waitFor")) {
            Ok(seconds) => seconds,
            Err(reason) => {
                details.entry("waitFor".to_string()).or_insert(reason);
                DEFAULT_WAIT_FOR_SECOND
            }
        };

        let actions = ActionSpec::parse_list(merged.get("actions"))
            .and_then(|specs| ActionPipeline::build(&specs, ctx));
        let actions = match actions {
            Ok(pipeline) => pipeline,
            Err(e) => {
                tracing::error!(trigger = %self.name, "exception creating action: {}", e);
                details.entry("actions".to_string()).or_insert(e.to_string());
                ActionPipeline::empty()
            }
        };

        if !details.is_empty() {
            return Err(TriggerError::Configuration {
                trigger: self.name.clone(),
                details,
            });
        }

        tracing::info!(
            trigger = %self.name,
            enabled,
            wait_for_second,
            actions = actions.len(),
            "configured trigger"
        );
        *self.config.write() = Arc::new(ConfigSnapshot {
            properties: Arc::new(merged),
            enabled,
            wait_for_second,
            actions: Arc::new(actions),
            context: Some(ctx.clone()),
        });
        Ok(())
    }

    /// Ensure the checkpoint base path exists, then initialize the actions.
    pub fn init(&self) -> Result<(), TriggerError> {
        let snapshot = self.snapshot();
        let ctx = snapshot.context.as_ref().ok_or_else(|| self.not_configured())?;
        let store = ctx.store();

        let ensured = store.has_data(TRIGGER_STATE_PATH).and_then(|exists| {
            if exists {
                Ok(())
            } else {
                store.make_path(TRIGGER_STATE_PATH)
            }
        });
        match ensured {
            Ok(()) | Err(StoreError::AlreadyExists(_)) => {}
            Err(e) if e.is_interrupted() => {
                return Err(TriggerError::Interrupted {
                    trigger: self.name.clone(),
                    operation: "init",
                })
            }
            Err(e) => {
                return Err(TriggerError::Init {
                    trigger: self.name.clone(),
                    source: InitError::Store(e),
                })
            }
        }

        snapshot
            .actions
            .init()
            .map_err(|e| TriggerError::Init {
                trigger: self.name.clone(),
                source: InitError::Action(e),
            })?;
        tracing::info!(trigger = %self.name, "initialized trigger");
        Ok(())
    }

    /// Install `processor` (or clear the slot) and return the previous one.
    ///
    /// Each swap is atomic; concurrent callers are ordered arbitrarily and
    /// the last one wins.
    pub fn set_processor(
        &self,
        processor: Option<Arc<dyn TriggerEventProcessor>>,
    ) -> Option<Arc<dyn TriggerEventProcessor>> {
        mem::replace(&mut *self.processor.write(), processor)
    }

    pub fn processor(&self) -> Option<Arc<dyn TriggerEventProcessor>> {
        self.processor.read().clone()
    }

    /// Hand `event` to the current processor.
    ///
    /// Returns false if the trigger is closed, no processor is installed, or
    /// the processor rejected the event.
    pub fn dispatch(&self, event: &TriggerEvent) -> bool {
        if self.is_closed() {
            return false;
        }
        match self.processor() {
            Some(processor) => processor.process(event),
            None => {
                tracing::debug!(trigger = %self.name, "no processor installed, dropping event");
                false
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.snapshot().enabled
    }

    pub fn wait_for_second(&self) -> i64 {
        self.snapshot().wait_for_second
    }

    /// The current (merged) configuration.
    pub fn properties(&self) -> Arc<PropertyMap> {
        Arc::clone(&self.snapshot().properties)
    }

    /// The current action pipeline.
    pub fn actions(&self) -> Arc<ActionPipeline> {
        Arc::clone(&self.snapshot().actions)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Mark the trigger closed, then close its actions (best-effort).
    ///
    /// Safe to call more than once and concurrently with `save_state`.
    pub fn close(&self) {
        let was_closed = self.closed.swap(true, Ordering::SeqCst);
        let failures = self.actions().close();
        if !was_closed {
            tracing::info!(
                trigger = %self.name,
                action_failures = failures.len(),
                "closed trigger"
            );
        }
    }

    /// Canonical copy of the provider's current state.
    pub fn deep_copy_state(&self) -> Result<CanonicalState, StateError> {
        CanonicalState::from_map(&self.provider.get_state())
    }

    /// The most recently written (or restored) checkpoint, if any.
    pub fn last_saved_state(&self) -> Option<CanonicalState> {
        self.last_state.lock().clone()
    }

    /// Checkpoint the provider's state unless it's unchanged.
    ///
    /// Store and encoding failures are logged and reported as
    /// [`SaveStatus::Failed`]; only interruption is returned as an error.
    pub fn save_state(&self) -> Result<SaveStatus, TriggerError> {
        if self.is_closed() {
            tracing::debug!(trigger = %self.name, "trigger closed, skipping state save");
            return Ok(SaveStatus::Skipped);
        }
        let snapshot = self.snapshot();
        let ctx = snapshot.context.as_ref().ok_or_else(|| self.not_configured())?;
        let checkpointer = StateCheckpointer::new(Arc::clone(ctx.store()), &self.name);

        let mut last = self.last_state.lock();
        match checkpointer.save(&self.provider.get_state(), last.as_ref()) {
            Ok(SaveOutcome::Unchanged) => Ok(SaveStatus::Unchanged),
            Ok(SaveOutcome::Written(state)) => {
                *last = Some(state);
                Ok(SaveStatus::Written)
            }
            Err(e) if e.is_interrupted() => Err(TriggerError::Interrupted {
                trigger: self.name.clone(),
                operation: "save_state",
            }),
            Err(CheckpointError::State(e)) => {
                tracing::error!(
                    trigger = %self.name,
                    "trigger state can't be canonicalized: {}",
                    e
                );
                Ok(SaveStatus::Failed)
            }
            Err(e) => {
                tracing::warn!(
                    trigger = %self.name,
                    path = %checkpointer.path(),
                    "Exception updating trigger state: {}",
                    e
                );
                Ok(SaveStatus::Failed)
            }
        }
    }

    /// Load the checkpoint (if any) into the provider.
    ///
    /// Returns whether state was restored. Missing, unreadable, or corrupt
    /// checkpoints leave the provider at its defaults; a closed store is
    /// treated as missing without logging. Only interruption is an error.
    pub fn restore_state(&self) -> Result<bool, TriggerError> {
        if self.is_closed() {
            return Ok(false);
        }
        let snapshot = self.snapshot();
        let ctx = snapshot.context.as_ref().ok_or_else(|| self.not_configured())?;
        let checkpointer = StateCheckpointer::new(Arc::clone(ctx.store()), &self.name);

        match checkpointer.restore() {
            Ok(Some(state)) => {
                self.provider.set_state(state.to_map());
                *self.last_state.lock() = Some(state);
                tracing::debug!(trigger = %self.name, "restored trigger state");
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(e) if e.is_store_closed() => Ok(false),
            Err(e) if e.is_interrupted() => Err(TriggerError::Interrupted {
                trigger: self.name.clone(),
                operation: "restore_state",
            }),
            Err(e) => {
                tracing::warn!(
                    trigger = %self.name,
                    path = %checkpointer.path(),
                    "Exception getting trigger state: {}",
                    e
                );
                Ok(false)
            }
        }
    }
}

impl<P> PartialEq for Trigger<P> {
    /// Same name and same current configuration. Transient state is ignored.
    fn eq(&self, other: &Self) -> bool {
        // One guard at a time: parking_lot read locks aren't recursive.
        let ours = Arc::clone(&self.config.read());
        let theirs = Arc::clone(&other.config.read());
        self.name == other.name && ours.properties == theirs.properties
    }
}

impl<P> Eq for Trigger<P> {}

impl<P> Hash for Trigger<P> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        let properties = Arc::clone(&self.config.read().properties);
        hash_map(&properties, state);
    }
}

impl<P> std::fmt::Debug for Trigger<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = Arc::clone(&self.config.read());
        f.debug_struct("Trigger")
            .field("name", &self.name)
            .field("event_type", &self.event_type)
            .field("enabled", &snapshot.enabled)
            .field("wait_for_second", &snapshot.wait_for_second)
            .field("actions", &snapshot.actions)
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}

/// `enabled`: booleans as-is, anything else compared to "true" ignoring case.
fn parse_enabled(value: Option<&Value>) -> bool {
    match value {
        None => true,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        Some(other) => other.to_string().eq_ignore_ascii_case("true"),
    }
}

/// `waitFor`: whole seconds; floats are truncated, numeric strings accepted.
fn parse_wait_for(value: Option<&Value>) -> Result<i64, String> {
    let invalid = |v: &Value| format!("expected a number of seconds, got {}", v);
    match value {
        None | Some(Value::Null) => Ok(DEFAULT_WAIT_FOR_SECOND),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| invalid(&Value::Number(n.clone()))),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
                .ok_or_else(|| invalid(&Value::String(s.to_string())))
        }
        Some(other) => Err(invalid(other)),
    }
}

fn hash_map<H: Hasher>(map: &PropertyMap, state: &mut H) {
    map.len().hash(state);
    for (key, value) in map {
        key.hash(state);
        hash_value(value, state);
    }
}

fn hash_value<H: Hasher>(value: &Value, state: &mut H) {
    match value {
        Value::Null => 0u8.hash(state),
        Value::Bool(b) => {
            1u8.hash(state);
            b.hash(state);
        }
        Value::Number(n) => {
            2u8.hash(state);
            hash_number(n, state);
        }
        Value::String(s) => {
            3u8.hash(state);
            s.hash(state);
        }
        Value::Array(items) => {
            4u8.hash(state);
            items.len().hash(state);
            for item in items {
                hash_value(item, state);
            }
        }
        Value::Object(map) => {
            5u8.hash(state);
            hash_map(map, state);
        }
    }
}

/// Consistent with `Number` equality: integers and floats never compare
/// equal, and `-0.0 == 0.0`.
fn hash_number<H: Hasher>(n: &serde_json::Number, state: &mut H) {
    if let Some(u) = n.as_u64() {
        0u8.hash(state);
        u.hash(state);
    } else if let Some(i) = n.as_i64() {
        1u8.hash(state);
        i.hash(state);
    } else if let Some(f) = n.as_f64() {
        2u8.hash(state);
        let f = if f == 0.0 { 0.0 } else { f };
        f.to_bits().hash(state);
    }
}
