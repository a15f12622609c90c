// event.rs — Trigger event types and the processor that consumes them.
//
// When to fire an event is decided by the concrete trigger; the harness only
// defines the event shape and hands events to whichever processor is
// currently installed on the trigger.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validation::PropertyMap;

/// The kind of cluster condition a trigger reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TriggerEventType {
    NodeAdded,
    NodeLost,
    ReplicaLost,
    Manual,
    Scheduled,
    SearchRate,
    IndexSize,
    Metric,
    Invalid,
}

impl TriggerEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerEventType::NodeAdded => "NODEADDED",
            TriggerEventType::NodeLost => "NODELOST",
            TriggerEventType::ReplicaLost => "REPLICALOST",
            TriggerEventType::Manual => "MANUAL",
            TriggerEventType::Scheduled => "SCHEDULED",
            TriggerEventType::SearchRate => "SEARCHRATE",
            TriggerEventType::IndexSize => "INDEXSIZE",
            TriggerEventType::Metric => "METRIC",
            TriggerEventType::Invalid => "INVALID",
        }
    }
}

impl fmt::Display for TriggerEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerEventType {
    type Err = String;

    /// Case-insensitive; underscores are ignored ("node_lost" == "NODELOST").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_')
            .collect::<String>()
            .to_ascii_uppercase();
        match normalized.as_str() {
            "NODEADDED" => Ok(TriggerEventType::NodeAdded),
            "NODELOST" => Ok(TriggerEventType::NodeLost),
            "REPLICALOST" => Ok(TriggerEventType::ReplicaLost),
            "MANUAL" => Ok(TriggerEventType::Manual),
            "SCHEDULED" => Ok(TriggerEventType::Scheduled),
            "SEARCHRATE" => Ok(TriggerEventType::SearchRate),
            "INDEXSIZE" => Ok(TriggerEventType::IndexSize),
            "METRIC" => Ok(TriggerEventType::Metric),
            "INVALID" => Ok(TriggerEventType::Invalid),
            _ => Err(format!("unknown trigger event type '{}'", s)),
        }
    }
}

/// An event fired by a trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub id: Uuid,
    pub event_type: TriggerEventType,
    /// Name of the trigger that fired the event.
    pub source: String,
    pub event_time: DateTime<Utc>,
    /// Trigger-specific payload (e.g. the lost node names).
    #[serde(default)]
    pub properties: PropertyMap,
}

impl TriggerEvent {
    /// New event stamped with a fresh id and the current time.
    pub fn new(event_type: TriggerEventType, source: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            source: source.into(),
            event_time: Utc::now(),
            properties: PropertyMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }
}

/// Consumer of fired events, typically the policy engine's entry point.
///
/// Returns whether the event was accepted.
pub trait TriggerEventProcessor: Send + Sync {
    fn process(&self, event: &TriggerEvent) -> bool;
}

impl<F> TriggerEventProcessor for F
where
    F: Fn(&TriggerEvent) -> bool + Send + Sync,
{
    fn process(&self, event: &TriggerEvent) -> bool {
        self(event)
    }
}
