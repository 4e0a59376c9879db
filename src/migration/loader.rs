//! Legacy settings file resolution and caching.

use super::target::LegacyScope;
use crate::logging::Logger;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock, PoisonError};

/// Directory version of the legacy settings layout.
pub const LEGACY_VERSION: &str = "v2";

/// Reads legacy plugin files and caches every successful parse for the
/// lifetime of the loader.
pub struct LegacyConfigLoader {
    project_path: OnceLock<PathBuf>,
    home: Option<PathBuf>,
    cache: Mutex<HashMap<LegacyScope, HashMap<String, Value>>>,
    logger: Logger,
}

impl LegacyConfigLoader {
    pub fn new(home: Option<PathBuf>, logger: Logger) -> Self {
        Self {
            project_path: OnceLock::new(),
            home,
            cache: Mutex::new(HashMap::new()),
            logger: logger.named("migration"),
        }
    }

    /// Bind the loader to a project. Only the first call has an effect.
    pub fn initialize(&self, project_path: &Path) {
        if self.project_path.set(project_path.to_path_buf()).is_err() {
            self.logger.debug(&format!(
                "Legacy loader already initialized, ignoring {}",
                project_path.display()
            ));
        }
    }

    pub fn project_path(&self) -> Option<&Path> {
        self.project_path.get().map(PathBuf::as_path)
    }

    /// Where the legacy file for `plugin_name` lives in `scope`.
    ///
    /// `None` when the scope's root is unknown (uninitialized loader, no home
    /// directory).
    pub fn get_path_by_scope(&self, plugin_name: &str, scope: LegacyScope) -> Option<PathBuf> {
        let root = match scope {
            LegacyScope::Project => self.project_path.get()?.join("settings"),
            LegacyScope::Local => self.project_path.get()?.join("profiles"),
            LegacyScope::Global => self.home.as_ref()?.join(".CocosCreator").join("profiles"),
        };
        Some(
            root.join(LEGACY_VERSION)
                .join("packages")
                .join(format!("{}.json", plugin_name)),
        )
    }

    fn cached(&self, scope: LegacyScope, plugin_name: &str) -> Option<Value> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&scope)
            .and_then(|plugins| plugins.get(plugin_name))
            .cloned()
    }

    /// Load and cache a legacy file. Missing or unreadable files yield `None`.
    pub async fn load_config(&self, scope: LegacyScope, plugin_name: &str) -> Option<Value> {
        if let Some(value) = self.cached(scope, plugin_name) {
            return Some(value);
        }

        let path = self.get_path_by_scope(plugin_name, scope)?;
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return None;
        }

        let parsed = match tokio::fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str::<Value>(&content).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match parsed {
            Ok(value) => {
                self.cache
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .entry(scope)
                    .or_default()
                    .insert(plugin_name.to_string(), value.clone());
                Some(value)
            }
            Err(err) => {
                self.logger.warning(&format!(
                    "Failed to read legacy config {}: {}",
                    path.display(),
                    err
                ));
                None
            }
        }
    }
}
