// state.rs — Canonical form of trigger state.
//
// A trigger's state is an opaque JSON-like tree. Before it is compared or
// persisted it is deep-copied into a CanonicalState: an immutable,
// key-sorted, depth-bounded snapshot that later mutation of the trigger's
// live structures can't reach.

use std::ops::Deref;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::StateError;

/// Top-level shape of trigger state.
pub type StateMap = Map<String, Value>;

/// Maximum nesting of maps and lists, counting the top-level map as 1.
pub const MAX_STATE_DEPTH: usize = 10;

/// Immutable, canonicalized trigger state.
///
/// Cloning is cheap (shared `Arc`). Equality is deep equality of the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalState(Arc<StateMap>);

impl CanonicalState {
    /// Deep-copy `state` into canonical form.
    pub fn from_map(state: &StateMap) -> Result<Self, StateError> {
        Ok(Self(Arc::new(copy_map(state, 1)?)))
    }

    /// Canonical form of an empty state.
    pub fn empty() -> Self {
        Self(Arc::new(StateMap::new()))
    }

    pub fn as_map(&self) -> &StateMap {
        &self.0
    }

    /// An owned, mutable copy of the tree.
    pub fn to_map(&self) -> StateMap {
        self.0.as_ref().clone()
    }

    /// Serialize to the persisted byte form (compact JSON, sorted keys).
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self.0.as_ref())
    }
}

impl Deref for CanonicalState {
    type Target = StateMap;

    fn deref(&self) -> &StateMap {
        &self.0
    }
}

fn copy_map(map: &StateMap, depth: usize) -> Result<StateMap, StateError> {
    if depth > MAX_STATE_DEPTH {
        return Err(StateError::TooDeep {
            max_depth: MAX_STATE_DEPTH,
        });
    }
    // serde_json's Map is a BTreeMap here, so the copy comes out key-sorted.
    let mut copy = StateMap::new();
    for (key, value) in map {
        copy.insert(key.clone(), copy_value(value, depth)?);
    }
    Ok(copy)
}

fn copy_value(value: &Value, depth: usize) -> Result<Value, StateError> {
    match value {
        Value::Object(map) => Ok(Value::Object(copy_map(map, depth + 1)?)),
        Value::Array(items) => {
            if depth + 1 > MAX_STATE_DEPTH {
                return Err(StateError::TooDeep {
                    max_depth: MAX_STATE_DEPTH,
                });
            }
            items
                .iter()
                .map(|item| copy_value(item, depth + 1))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        scalar => Ok(scalar.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> StateMap {
        value.as_object().cloned().unwrap()
    }

    /// A map nested `levels` deep, counting the outermost map.
    fn nested(levels: usize) -> StateMap {
        let mut value = json!({"leaf": 1});
        for _ in 1..levels {
            value = json!({ "child": value });
        }
        map(value)
    }

    #[test]
    fn copy_is_detached_from_source() {
        let mut live = map(json!({"lastVersion": 5, "pending": ["a"]}));
        let canonical = CanonicalState::from_map(&live).unwrap();

        live.insert("lastVersion".to_string(), json!(6));
        live["pending"].as_array_mut().unwrap().push(json!("b"));

        assert_eq!(canonical["lastVersion"], json!(5));
        assert_eq!(canonical["pending"], json!(["a"]));
    }

    #[test]
    fn equal_trees_compare_equal() {
        let a = CanonicalState::from_map(&map(json!({"b": 1, "a": {"x": [1, 2]}}))).unwrap();
        let b = CanonicalState::from_map(&map(json!({"a": {"x": [1, 2]}, "b": 1}))).unwrap();
        assert_eq!(a, b);

        let c = CanonicalState::from_map(&map(json!({"a": {"x": [2, 1]}, "b": 1}))).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn encoding_sorts_keys() {
        let state = CanonicalState::from_map(&map(json!({"z": 1, "a": true, "m": null}))).unwrap();
        assert_eq!(
            String::from_utf8(state.encode().unwrap()).unwrap(),
            r#"{"a":true,"m":null,"z":1}"#
        );
    }

    #[test]
    fn depth_bound_is_inclusive() {
        assert!(CanonicalState::from_map(&nested(MAX_STATE_DEPTH)).is_ok());
        assert_eq!(
            CanonicalState::from_map(&nested(MAX_STATE_DEPTH + 1)),
            Err(StateError::TooDeep {
                max_depth: MAX_STATE_DEPTH
            })
        );
    }

    #[test]
    fn lists_count_toward_depth() {
        let mut value = json!([1]);
        for _ in 2..MAX_STATE_DEPTH {
            value = json!([value]);
        }
        // map + 9 nested lists = 10 levels
        let ok = map(json!({ "list": value.clone() }));
        assert!(CanonicalState::from_map(&ok).is_ok());

        let too_deep = map(json!({ "list": [value] }));
        assert!(CanonicalState::from_map(&too_deep).is_err());
    }

    #[test]
    fn empty_state_is_empty() {
        assert!(CanonicalState::empty().is_empty());
        assert_eq!(
            CanonicalState::empty(),
            CanonicalState::from_map(&StateMap::new()).unwrap()
        );
    }
}
