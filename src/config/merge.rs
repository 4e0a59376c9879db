//! Recursive merge of JSON configuration trees.
//!
//! Objects merge key by key; every other value in the overlay (arrays and
//! `null` included) replaces what the base held.

use serde_json::Value;

/// Merge `overlay` over `base` and return the result.
///
/// # Example
/// ```
/// use serde_json::json;
/// use cocos_config::config::deep_merge;
///
/// let defaults = json!({
///     "preview": { "port": 7456, "host": "localhost" },
///     "platforms": ["web-mobile", "android"]
/// });
/// let project = json!({
///     "preview": { "port": 8000 },
///     "platforms": ["ios"]
/// });
/// let result = deep_merge(defaults, project);
/// assert_eq!(result["preview"]["host"], "localhost");
/// assert_eq!(result["preview"]["port"], 8000);
/// assert_eq!(result["platforms"], json!(["ios"]));
/// ```
pub fn deep_merge(mut base: Value, overlay: Value) -> Value {
    merge_into(&mut base, overlay);
    base
}

/// In-place form of [`deep_merge`].
pub fn merge_into(target: &mut Value, overlay: Value) {
    match (target, overlay) {
        (Value::Object(target_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match target_map.get_mut(&key) {
                    Some(existing) => merge_into(existing, value),
                    None => {
                        target_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
