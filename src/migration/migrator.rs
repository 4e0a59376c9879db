//! Execution of a single migration target.

use super::loader::LegacyConfigLoader;
use super::target::{MigrationTarget, PathMapping};
use crate::config::{get_by_dot_path, remove_by_dot_path, set_by_dot_path};
use crate::error::{ConfigError, ConfigResult};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;

/// Runs one [`MigrationTarget`] against a project.
#[derive(Clone)]
pub struct TargetMigrator {
    loader: Arc<LegacyConfigLoader>,
}

impl TargetMigrator {
    pub fn new(loader: Arc<LegacyConfigLoader>) -> Self {
        Self { loader }
    }

    pub fn loader(&self) -> &Arc<LegacyConfigLoader> {
        &self.loader
    }

    /// Load the target's legacy file, transform it and apply its path
    /// mappings. Always yields an object; a missing legacy file yields `{}`.
    pub async fn migrate(&self, project: &Path, target: &MigrationTarget) -> ConfigResult<Value> {
        self.loader.initialize(project);

        let Some(legacy) = self
            .loader
            .load_config(target.source_scope, &target.plugin_name)
            .await
        else {
            return Ok(Value::Object(Map::new()));
        };

        let mut migrated = match target.transform(legacy, project) {
            Ok(Value::Null) => Value::Object(Map::new()),
            Ok(value @ Value::Object(_)) => value,
            Ok(other) => {
                return Err(ConfigError::migration_failed(
                    &target.plugin_name,
                    format!("transform produced a non-object value: {}", other),
                ));
            }
            Err(err) => return Err(ConfigError::migration_failed(&target.plugin_name, err)),
        };

        apply_path_mappings(&mut migrated, &target.path_mappings);
        Ok(migrated)
    }
}

fn apply_path_mappings(fragment: &mut Value, mappings: &[PathMapping]) {
    for mapping in mappings {
        if let Some(value) = get_by_dot_path(fragment, &mapping.from).cloned() {
            remove_by_dot_path(fragment, &mapping.from);
            set_by_dot_path(fragment, &mapping.to, value);
        }
    }
}
