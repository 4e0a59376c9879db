//! Orchestration of every registered migration target.

use super::builtin::builtin_targets;
use super::loader::LegacyConfigLoader;
use super::migrator::TargetMigrator;
use super::target::{DEFAULT_TARGET_SCOPE, MigrationTarget};
use crate::config::deep_merge;
use crate::error::{ConfigError, ConfigResult};
use crate::logging::Logger;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

/// Migrated fragments keyed by result bucket, then by module name.
pub type MigrationOutput = Map<String, Value>;

type DiscoveryFn = Arc<dyn Fn() -> Vec<MigrationTarget> + Send + Sync>;

#[derive(Default)]
struct TargetTable {
    initialized: bool,
    by_scope: BTreeMap<String, Vec<Arc<MigrationTarget>>>,
}

/// Registry and runner for migration targets.
///
/// Targets are populated lazily from the discovery function on first use.
/// Populating clears the table first, so targets registered by hand before
/// then are dropped; call [`register_migration`](Self::register_migration)
/// before adding extra targets.
pub struct MigrationManager {
    targets: Mutex<TargetTable>,
    discovery: DiscoveryFn,
    migrator: TargetMigrator,
    logger: Logger,
}

impl MigrationManager {
    pub fn new<F>(loader: Arc<LegacyConfigLoader>, discovery: F, logger: Logger) -> Self
    where
        F: Fn() -> Vec<MigrationTarget> + Send + Sync + 'static,
    {
        Self {
            targets: Mutex::new(TargetTable::default()),
            discovery: Arc::new(discovery),
            migrator: TargetMigrator::new(loader),
            logger: logger.named("migration"),
        }
    }

    /// Manager discovering the built-in targets.
    pub fn with_builtin(loader: Arc<LegacyConfigLoader>, logger: Logger) -> Self {
        Self::new(loader, builtin_targets, logger)
    }

    pub fn loader(&self) -> &Arc<LegacyConfigLoader> {
        self.migrator.loader()
    }

    /// Populate the table from discovery once; later calls are free.
    pub fn register_migration(&self) {
        let mut table = self.targets.lock().unwrap_or_else(PoisonError::into_inner);
        if table.initialized {
            return;
        }
        table.by_scope.clear();
        for target in (self.discovery)() {
            Self::insert(&mut table, target);
        }
        table.initialized = true;
    }

    /// Append targets to their buckets. Duplicates are kept and run twice.
    pub fn register(&self, targets: impl IntoIterator<Item = MigrationTarget>) {
        let mut table = self.targets.lock().unwrap_or_else(PoisonError::into_inner);
        for target in targets {
            Self::insert(&mut table, target);
        }
    }

    fn insert(table: &mut TargetTable, target: MigrationTarget) {
        table
            .by_scope
            .entry(target.bucket().to_string())
            .or_default()
            .push(Arc::new(target));
    }

    /// Registered targets: buckets in name order, registration order within
    /// a bucket.
    pub fn targets(&self) -> Vec<Arc<MigrationTarget>> {
        self.targets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .by_scope
            .values()
            .flatten()
            .cloned()
            .collect()
    }

    /// Empty the table so the next use repopulates from discovery.
    pub fn clear(&self) {
        let mut table = self.targets.lock().unwrap_or_else(PoisonError::into_inner);
        table.by_scope.clear();
        table.initialized = false;
    }

    /// Run every target sequentially and merge the fragments per bucket.
    ///
    /// A failing target is logged and the remaining targets still run, but
    /// the call then fails as a whole and the merged output is discarded.
    pub async fn migrate(&self, project: &Path) -> ConfigResult<MigrationOutput> {
        self.register_migration();

        let targets = self.targets();
        if targets.is_empty() {
            return Err(ConfigError::no_migrators());
        }

        let mut output = MigrationOutput::new();
        output.insert(DEFAULT_TARGET_SCOPE.to_string(), Value::Object(Map::new()));
        let mut failed = Vec::new();

        for target in targets {
            match self.migrator.migrate(project, &target).await {
                Ok(fragment) => {
                    let bucket = output
                        .remove(target.bucket())
                        .unwrap_or_else(|| Value::Object(Map::new()));
                    output.insert(target.bucket().to_string(), deep_merge(bucket, fragment));
                    self.logger.debug(&format!(
                        "Migrated '{}' into {}",
                        target.plugin_name,
                        target.bucket()
                    ));
                }
                Err(err) => {
                    self.logger.error(&format!(
                        "Migration target '{}' failed: {}",
                        target.plugin_name, err
                    ));
                    failed.push(target.plugin_name.clone());
                }
            }
        }

        if !failed.is_empty() {
            return Err(ConfigError::migration_partial_failure(&failed));
        }
        Ok(output)
    }
}
