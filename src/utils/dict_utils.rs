//! Helpers for nested `serde_json::Value` mappings.

use serde_json::Value;

/// Recursively update `base` with the keys of `overrides`.
///
/// Objects merge key by key, so sibling keys in `base` survive; any other
/// value in `overrides` replaces what was there.
pub fn recursive_dict_update(base: &mut Value, overrides: &Value) {
    let Value::Object(updates) = overrides else {
        *base = overrides.clone();
        return;
    };

    if !base.is_object() {
        *base = Value::Object(serde_json::Map::new());
    }
    if let Value::Object(target) = base {
        for (key, value) in updates {
            if value.is_object() {
                let entry = target
                    .entry(key.clone())
                    .or_insert_with(|| Value::Object(serde_json::Map::new()));
                recursive_dict_update(entry, value);
            } else {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Return a merged copy of `base` and `overrides`.
pub fn merged(base: &Value, overrides: &Value) -> Value {
    let mut result = base.clone();
    recursive_dict_update(&mut result, overrides);
    result
}
