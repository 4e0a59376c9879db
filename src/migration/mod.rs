//! Migration of legacy per-plugin settings into the project document.
//!
//! Older tool generations kept one JSON file per plugin and scope:
//! - project: `<project>/settings/v2/packages/<plugin>.json`
//! - local: `<project>/profiles/v2/packages/<plugin>.json`
//! - global: `<home>/.CocosCreator/profiles/v2/packages/<plugin>.json`
//!
//! A [`MigrationTarget`] reads one of those files, transforms it into module
//! configuration and names the result bucket it lands in. The
//! [`MigrationManager`] runs every registered target in order and merges the
//! fragments. Legacy files are never written.

mod builtin;
mod loader;
mod manager;
mod migrator;
mod target;

pub use builtin::builtin_targets;
pub use loader::{LEGACY_VERSION, LegacyConfigLoader};
pub use manager::{MigrationManager, MigrationOutput};
pub use migrator::TargetMigrator;
pub use target::{DEFAULT_TARGET_SCOPE, LegacyScope, MigrationTarget, PathMapping};
