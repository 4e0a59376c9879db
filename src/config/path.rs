//! Dotted-path access into nested JSON objects.
//!
//! Keys are split on `.`; every segment addresses one object level.

use serde_json::{Map, Value};

/// Returns `false` for empty or whitespace-only keys.
pub fn is_valid_config_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Look up the value at `key`, or `None` if any segment is absent.
pub fn get_by_dot_path<'a>(tree: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.')
        .try_fold(tree, |node, segment| node.as_object()?.get(segment))
}

/// Store `value` at `key`, creating intermediate objects as needed.
///
/// A non-object found along the way (including `tree` itself) is replaced by
/// an empty object.
pub fn set_by_dot_path(tree: &mut Value, key: &str, value: Value) {
    if !tree.is_object() {
        *tree = Value::Object(Map::new());
    }
    let Value::Object(map) = tree else {
        return;
    };

    match key.split_once('.') {
        Some((head, rest)) => {
            let child = map.entry(head.to_string()).or_insert(Value::Null);
            set_by_dot_path(child, rest, value);
        }
        None => {
            map.insert(key.to_string(), value);
        }
    }
}

/// Delete the value at `key`. Returns `true` if something was removed.
pub fn remove_by_dot_path(tree: &mut Value, key: &str) -> bool {
    let (parent, leaf) = match key.rsplit_once('.') {
        Some((parent, leaf)) => (Some(parent), leaf),
        None => (None, key),
    };

    let container = match parent {
        Some(parent) => get_by_dot_path_mut(tree, parent),
        None => Some(tree),
    };

    container
        .and_then(Value::as_object_mut)
        .and_then(|map| map.remove(leaf))
        .is_some()
}

fn get_by_dot_path_mut<'a>(tree: &'a mut Value, key: &str) -> Option<&'a mut Value> {
    key.split('.')
        .try_fold(tree, |node, segment| node.as_object_mut()?.get_mut(segment))
}
