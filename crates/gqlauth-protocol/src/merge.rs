//! Recursive configuration merging.
//!
//! Users supply partial options (`{ "token": { "required": false } }`) and
//! expect every field they didn't mention to keep its default. A shallow
//! overwrite would throw away the whole `token` group, so we merge key by
//! key instead.

use serde_json::map::Entry;
use serde_json::Value;

/// Overlays `source` onto `target`, field by field, and returns `target`.
///
/// For every key in `source`:
/// - if `target` lacks the key, it is copied in;
/// - if both sides hold objects (or arrays), they are merged recursively;
/// - otherwise the source value overwrites the target value, `null`
///   included.
///
/// Arrays are treated like objects whose keys are indices: merging
/// `["x"]` onto `["a", "b"]` yields `["x", "b"]`, not `["x"]` and not
/// `["a", "b", "x"]`. Indices past the end extend the array (gaps are
/// filled with `null`).
///
/// When either root is a scalar there are no keys to merge and `source`
/// simply replaces `target`.
///
/// ```rust
/// use gqlauth_protocol::deep_merge;
/// use serde_json::json;
///
/// let mut config = json!({ "token": { "required": true, "global": false } });
/// deep_merge(&mut config, &json!({ "token": { "required": false } }));
/// assert_eq!(config, json!({ "token": { "required": false, "global": false } }));
/// ```
pub fn deep_merge<'a>(target: &'a mut Value, source: &Value) -> &'a mut Value {
    merge_into(target, source);
    target
}

fn merge_into(target: &mut Value, source: &Value) {
    if !is_container(target) || !is_container(source) {
        *target = source.clone();
        return;
    }

    match source {
        Value::Object(map) => {
            for (key, value) in map {
                merge_key(target, key, value);
            }
        }
        Value::Array(items) => {
            for (index, value) in items.iter().enumerate() {
                merge_key(target, &index.to_string(), value);
            }
        }
        _ => {}
    }
}

fn merge_key(target: &mut Value, key: &str, value: &Value) {
    match target {
        Value::Object(map) => match map.entry(key) {
            Entry::Occupied(mut existing) => merge_into(existing.get_mut(), value),
            Entry::Vacant(slot) => {
                slot.insert(value.clone());
            }
        },
        Value::Array(items) => {
            // JSON arrays can't carry named properties; only indices land.
            let Ok(index) = key.parse::<usize>() else {
                return;
            };
            match items.get_mut(index) {
                Some(existing) => merge_into(existing, value),
                None => {
                    items.resize(index, Value::Null);
                    items.push(value.clone());
                }
            }
        }
        _ => {}
    }
}

fn is_container(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_deep_merge_copies_missing_keys() {
        let mut target = json!({ "a": 1 });
        deep_merge(&mut target, &json!({ "b": 2 }));
        assert_eq!(target, json!({ "a": 1, "b": 2 }));
    }

    #[test]
    fn test_deep_merge_nested_objects_preserve_unspecified_defaults() {
        let mut target = json!({
            "token": { "loginProperty": "data.login.token", "required": true },
            "user": { "property": "data.user" }
        });
        deep_merge(&mut target, &json!({ "token": { "required": false } }));

        assert_eq!(
            target,
            json!({
                "token": { "loginProperty": "data.login.token", "required": false },
                "user": { "property": "data.user" }
            })
        );
    }

    #[test]
    fn test_deep_merge_scalar_overwrites_object() {
        let mut target = json!({ "maxAge": { "seconds": 10 } });
        deep_merge(&mut target, &json!({ "maxAge": 5 }));
        assert_eq!(target, json!({ "maxAge": 5 }));
    }

    #[test]
    fn test_deep_merge_object_overwrites_scalar() {
        let mut target = json!({ "property": "data.user" });
        deep_merge(&mut target, &json!({ "property": { "nested": true } }));
        assert_eq!(target, json!({ "property": { "nested": true } }));
    }

    #[test]
    fn test_deep_merge_null_overwrites() {
        let mut target = json!({ "token": { "maxAge": 1800 } });
        deep_merge(&mut target, &json!({ "token": { "maxAge": null } }));
        assert_eq!(target, json!({ "token": { "maxAge": null } }));
    }

    #[test]
    fn test_deep_merge_arrays_merge_element_wise() {
        let mut target = json!({ "path": ["data", "login", "token"] });
        deep_merge(&mut target, &json!({ "path": ["payload"] }));
        assert_eq!(target, json!({ "path": ["payload", "login", "token"] }));
    }

    #[test]
    fn test_deep_merge_array_index_past_end_extends() {
        let mut target = json!(["a"]);
        deep_merge(&mut target, &json!({ "2": "c" }));
        assert_eq!(target, json!(["a", null, "c"]));
    }

    #[test]
    fn test_deep_merge_array_onto_object_uses_index_keys() {
        let mut target = json!({ "x": 1 });
        deep_merge(&mut target, &json!(["first"]));
        assert_eq!(target, json!({ "x": 1, "0": "first" }));
    }

    #[test]
    fn test_deep_merge_empty_source_leaves_target_unchanged() {
        let original = json!({ "a": { "b": [1, 2] }, "c": null });
        let mut target = original.clone();
        deep_merge(&mut target, &json!({}));
        assert_eq!(target, original);
    }

    #[test]
    fn test_deep_merge_is_idempotent() {
        let source = json!({ "a": { "b": 1, "c": [1, { "d": 2 }] }, "e": "x" });
        let mut once = json!({ "a": { "z": 0 } });
        deep_merge(&mut once, &source);

        let mut twice = once.clone();
        deep_merge(&mut twice, &source);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_deep_merge_returns_target() {
        let mut target = json!({});
        let returned = deep_merge(&mut target, &json!({ "k": true }));
        assert_eq!(returned, &json!({ "k": true }));
    }
}
