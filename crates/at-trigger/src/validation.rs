// validation.rs — Property-set checks for trigger configuration.
//
// Every trigger accepts the base properties below. Concrete trigger types
// may add valid and required names on top, never remove them; required
// names are always valid too.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

/// A trigger's (or action's) property map, as supplied by the config loader.
pub type PropertyMap = Map<String, Value>;

/// A set of property names.
pub type PropertySet = BTreeSet<String>;

/// Properties every trigger accepts.
pub const BASE_PROPERTIES: &[&str] = &["name", "class", "event", "enabled", "waitFor", "actions"];

pub const UNKNOWN_PROPERTY: &str = "unknown property";
pub const MISSING_REQUIRED_PROPERTY: &str = "missing required property";

/// The base valid-property set.
pub fn base_properties() -> PropertySet {
    let mut set = PropertySet::new();
    valid_properties(&mut set, BASE_PROPERTIES);
    set
}

/// Add `names` to a valid-property set.
pub fn valid_properties<S: AsRef<str>>(valid: &mut PropertySet, names: &[S]) {
    valid.extend(names.iter().map(|n| n.as_ref().to_string()));
}

/// Add `names` to a required-property set, and to the valid set as well.
pub fn required_properties<S: AsRef<str>>(
    required: &mut PropertySet,
    valid: &mut PropertySet,
    names: &[S],
) {
    valid_properties(required, names);
    valid_properties(valid, names);
}

/// Check `properties` against the valid and required sets.
///
/// Returns one entry per offending property; an empty map means the
/// properties are valid. A property that is both required and absent is
/// reported as missing.
pub fn check_properties(
    properties: &PropertyMap,
    required: &PropertySet,
    valid: &PropertySet,
) -> BTreeMap<String, String> {
    let mut errors = BTreeMap::new();

    for name in properties.keys() {
        if !valid.contains(name) {
            errors.insert(name.clone(), UNKNOWN_PROPERTY.to_string());
        }
    }
    for name in required {
        if !properties.contains_key(name) {
            errors.insert(name.clone(), MISSING_REQUIRED_PROPERTY.to_string());
        }
    }

    errors
}
