//! Trigger definition files.
//!
//! A definition file lists triggers as plain property maps, the same maps
//! [`Trigger::configure`](crate::Trigger::configure) accepts. TOML uses an
//! array of tables, YAML a `trigger` list:
//!
//! ```toml
//! [[trigger]]
//! name = "idleNodeTrigger"
//! event = "nodeLost"
//! waitFor = 30
//! actions = [{ class = "LogAction" }]
//! ```
//!
//! Only the shape is checked here. Property validation happens when a
//! trigger is configured with the map.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::TriggerEventType;
use crate::validation::PropertyMap;

#[derive(Error, Debug)]
pub enum DefinitionError {
    #[error("Failed to read trigger definitions from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML trigger definitions: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Failed to parse YAML trigger definitions: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Unsupported definition format '{0}' (expected .toml, .yaml or .yml)")]
    UnsupportedFormat(String),
    #[error("Trigger definition #{index} has no string `name`")]
    MissingName { index: usize },
    #[error("Trigger '{name}': {reason}")]
    InvalidEvent { name: String, reason: String },
}

/// A set of trigger definitions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerDefinitions {
    #[serde(default)]
    pub trigger: Vec<PropertyMap>,
}

impl TriggerDefinitions {
    /// Load definitions, choosing the format by file extension.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DefinitionError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let content = std::fs::read_to_string(path).map_err(|source| DefinitionError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let definitions = match extension.as_str() {
            "toml" => Self::from_toml_str(&content)?,
            "yaml" | "yml" => Self::from_yaml_str(&content)?,
            other => return Err(DefinitionError::UnsupportedFormat(other.to_string())),
        };
        tracing::debug!(
            path = %path.display(),
            triggers = definitions.trigger.len(),
            "loaded trigger definitions"
        );
        Ok(definitions)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, DefinitionError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, DefinitionError> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn len(&self) -> usize {
        self.trigger.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trigger.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PropertyMap> {
        self.trigger.iter()
    }
}

/// The `name` of definition #`index`.
pub fn definition_name(index: usize, properties: &PropertyMap) -> Result<&str, DefinitionError> {
    properties
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or(DefinitionError::MissingName { index })
}

/// The `event` of a definition. Absent means [`TriggerEventType::Invalid`],
/// which a concrete trigger type would reject.
pub fn definition_event(
    name: &str,
    properties: &PropertyMap,
) -> Result<TriggerEventType, DefinitionError> {
    let invalid = |reason: String| DefinitionError::InvalidEvent {
        name: name.to_string(),
        reason,
    };
    match properties.get("event") {
        None => Ok(TriggerEventType::Invalid),
        Some(serde_json::Value::String(s)) => TriggerEventType::from_str(s).map_err(invalid),
        Some(other) => Err(invalid(format!("`event` must be a string, got {}", other))),
    }
}
