//! Tree utilities shared by configuration instances, the manager and the
//! migration framework.
//!
//! Configuration trees are `serde_json::Value` objects addressed with dotted
//! keys (`"builder.platforms.android"`).
//!
//! ## Merge Strategy
//! - Objects: merged key-by-key, recursively
//! - Arrays, strings, numbers, booleans, nulls: the override replaces the base

mod merge;
mod path;

pub use merge::{deep_merge, merge_into};
pub use path::{get_by_dot_path, is_valid_config_key, remove_by_dot_path, set_by_dot_path};
