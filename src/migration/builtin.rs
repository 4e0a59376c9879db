//! Targets discovered by default.

use super::target::MigrationTarget;

/// Legacy packages whose project settings carry over unchanged.
const PASSTHROUGH_PACKAGES: &[&str] = &["engine", "builder", "preview"];

/// The static discovery list used by [`MigrationManager::with_builtin`](super::MigrationManager::with_builtin).
pub fn builtin_targets() -> Vec<MigrationTarget> {
    PASSTHROUGH_PACKAGES
        .iter()
        .map(|name| MigrationTarget::passthrough(*name, *name))
        .collect()
}
