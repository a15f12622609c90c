//! # at-trigger
//!
//! Shared lifecycle and persistence harness for autoscaling triggers.
//!
//! A trigger watches some cluster condition and fires events for a policy
//! engine. What it watches is up to the concrete trigger type; this crate
//! supplies what every trigger needs in common:
//!
//! - validated configuration (property sets, `enabled`, `waitFor`)
//! - an ordered pipeline of auxiliary actions, configured, initialized and
//!   closed alongside the trigger
//! - durable checkpoints of the trigger's internal state in a coordination
//!   store, so a restarted trigger doesn't re-detect handled events
//!
//! ## Key components
//!
//! - [`Trigger`] — the lifecycle shell (configure → init → run → close)
//! - [`StateProvider`] — implemented by concrete trigger types to expose state
//! - [`ActionPipeline`] / [`ActionRegistry`] / [`TriggerAction`] — actions
//! - [`StateCheckpointer`] — save/restore of [`CanonicalState`] in the store
//! - [`validation`] — property-set checks
//! - [`TriggerEvent`] / [`TriggerEventProcessor`] — fired events and their consumer

pub mod action;
pub mod checkpoint;
pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod pipeline;
pub mod registry;
pub mod state;
pub mod trigger;
pub mod validation;

pub use action::{LogAction, TriggerAction};
pub use checkpoint::{SaveOutcome, StateCheckpointer};
pub use config::{DefinitionError, TriggerDefinitions};
pub use context::TriggerContext;
pub use error::{ActionError, CheckpointError, InitError, StateError, TriggerError};
pub use event::{TriggerEvent, TriggerEventProcessor, TriggerEventType};
pub use pipeline::{ActionPipeline, ActionSpec};
pub use registry::{ActionFactory, ActionRegistry};
pub use state::{CanonicalState, StateMap, MAX_STATE_DEPTH};
pub use trigger::{SaveStatus, StateProvider, Trigger};
pub use validation::{PropertyMap, PropertySet, BASE_PROPERTIES};
