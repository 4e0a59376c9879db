//! The configuration manager: sole owner of the project document.
//!
//! The manager keeps the merged project document (`cocos.config.json`) in
//! memory and binds every registered [`ModuleConfiguration`] to the slice of
//! the document stored under its module name:
//! - On binding, an existing object-valued slice is copied into the instance.
//! - On every project-scope write, the instance's snapshot is copied back and
//!   the whole document is persisted.
//!
//! ## Lifecycle
//! `Uninitialized` → [`initialize`](ConfigurationManager::initialize) →
//! `Initializing` (load, schema copy, migration) → `Initialized`. Migration
//! failures are logged and never block initialization.

use crate::config::{deep_merge, is_valid_config_key};
use crate::configuration::{ConfigScope, ListenerId, ModuleConfiguration, SaveListener};
use crate::error::{ConfigError, ConfigResult};
use crate::events::{ConfigEvent, EventBus};
use crate::logging::Logger;
use crate::migration::{DEFAULT_TARGET_SCOPE, MigrationManager};
use crate::registry::{ConfigurationRegistry, RegistryObserver};
use crate::settings::{EMBEDDED_SCHEMA, ManagerSettings};
use crate::version::{INITIAL_VERSION, Version};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Bookkeeping keys stored next to module slices in the document.
const VERSION_KEY: &str = "version";
const SCHEMA_KEY: &str = "$schema";

/// A dotted key split into its module and the remainder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedKey {
    pub module_name: String,
    pub actual_key: String,
}

/// Split `"module.sub.key"` on the first dot.
pub fn parse_key(key: &str) -> ConfigResult<ParsedKey> {
    let Some((module_name, actual_key)) = key.split_once('.') else {
        return Err(ConfigError::invalid_key(key, "expected <module>.<key>"));
    };
    if !is_valid_config_key(module_name) {
        return Err(ConfigError::invalid_key(key, "module name is empty"));
    }
    if actual_key.trim().is_empty() {
        return Err(ConfigError::invalid_key(key, "key after the module name is empty"));
    }
    Ok(ParsedKey {
        module_name: module_name.to_string(),
        actual_key: actual_key.to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Uninitialized,
    Initializing,
    Initialized,
}

struct Binding {
    instance: Arc<dyn ModuleConfiguration>,
    listener: ListenerId,
}

struct ManagerState {
    phase: Phase,
    project_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
    /// Module slices only; `version` and `$schema` live outside.
    document: Map<String, Value>,
    version: String,
    bindings: HashMap<String, Binding>,
}

impl ManagerState {
    fn new() -> Self {
        Self {
            phase: Phase::Uninitialized,
            project_path: None,
            config_path: None,
            document: Map::new(),
            version: INITIAL_VERSION.to_string(),
            bindings: HashMap::new(),
        }
    }
}

struct ManagerInner {
    registry: Arc<ConfigurationRegistry>,
    migrations: Arc<MigrationManager>,
    settings: ManagerSettings,
    events: EventBus,
    logger: Logger,
    state: Mutex<ManagerState>,
    /// Distinguishes temp files of overlapping saves.
    save_counter: AtomicU64,
    self_ref: Weak<ManagerInner>,
}

/// Cloneable handle to the configuration manager.
#[derive(Clone)]
pub struct ConfigurationManager {
    inner: Arc<ManagerInner>,
}

impl ConfigurationManager {
    pub fn new(
        registry: Arc<ConfigurationRegistry>,
        migrations: Arc<MigrationManager>,
        settings: ManagerSettings,
        logger: Logger,
    ) -> Self {
        let events = registry.events().clone();
        let inner = Arc::new_cyclic(|self_ref| ManagerInner {
            registry,
            migrations,
            settings,
            events,
            logger: logger.named("configuration"),
            state: Mutex::new(ManagerState::new()),
            save_counter: AtomicU64::new(0),
            self_ref: self_ref.clone(),
        });
        Self { inner }
    }

    /// Load the project document, copy the schema, migrate if the document
    /// predates this build, then bind every registered module.
    ///
    /// Calling this again after the first call is a no-op.
    pub async fn initialize(&self, project_path: impl AsRef<Path>) {
        self.inner.initialize(project_path.as_ref()).await
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.lock_state().phase == Phase::Initialized
    }

    pub fn registry(&self) -> &Arc<ConfigurationRegistry> {
        &self.inner.registry
    }

    pub fn migrations(&self) -> &Arc<MigrationManager> {
        &self.inner.migrations
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn settings(&self) -> &ManagerSettings {
        &self.inner.settings
    }

    pub fn project_path(&self) -> Option<PathBuf> {
        self.inner.lock_state().project_path.clone()
    }

    pub fn config_path(&self) -> Option<PathBuf> {
        self.inner.lock_state().config_path.clone()
    }

    /// Version recorded by the last load or save.
    pub fn version(&self) -> String {
        self.inner.lock_state().version.clone()
    }

    /// The in-memory document (module slices only).
    pub fn document(&self) -> Value {
        Value::Object(self.inner.lock_state().document.clone())
    }

    /// Read `module.key` from the module's instance.
    pub fn get(&self, key: &str, scope: Option<ConfigScope>) -> ConfigResult<Value> {
        self.inner.ensure_initialized()?;
        let parsed = parse_key(key)?;
        let instance = self.inner.resolve(&parsed.module_name)?;
        instance.get(Some(&parsed.actual_key), scope)
    }

    /// Write `module.key`. Project-scope writes are persisted before this returns.
    pub async fn set(&self, key: &str, value: Value, scope: ConfigScope) -> ConfigResult<bool> {
        self.inner.ensure_initialized()?;
        let parsed = parse_key(key)?;
        let instance = self.inner.resolve(&parsed.module_name)?;

        let updated = instance
            .set(&parsed.actual_key, value.clone(), scope)
            .await?;
        self.inner.events.emit(ConfigEvent::Update {
            key: key.to_string(),
            value,
            scope,
        });
        Ok(updated)
    }

    /// Remove `module.key`. The remove event fires before the instance is asked.
    pub async fn remove(&self, key: &str, scope: ConfigScope) -> ConfigResult<bool> {
        self.inner.ensure_initialized()?;
        let parsed = parse_key(key)?;
        let instance = self.inner.resolve(&parsed.module_name)?;

        self.inner.events.emit(ConfigEvent::Remove {
            key: key.to_string(),
            scope,
        });
        instance.remove(&parsed.actual_key, scope).await
    }

    /// Persist the document. Without `force`, an empty document is not written.
    pub async fn save(&self, force: bool) -> ConfigResult<()> {
        self.inner.save(force).await
    }

    /// Re-read the document from disk, discarding in-memory state. Does not
    /// migrate.
    pub async fn reload(&self) -> ConfigResult<Value> {
        self.inner.ensure_initialized()?;
        self.inner.load().await;

        let document = {
            let state = self.inner.lock_state();
            self.inner.reseed(&state);
            Value::Object(state.document.clone())
        };
        self.inner.events.emit(ConfigEvent::Reload {
            document: document.clone(),
        });
        Ok(document)
    }

    /// Migrate when this build is newer than the recorded document version.
    /// Returns whether a migration ran.
    pub async fn migrate(&self) -> ConfigResult<bool> {
        self.inner.ensure_started()?;
        self.inner.migrate_if_stale().await
    }

    /// Run every migration target against `project_path` and merge the
    /// project bucket into the document, regardless of versions.
    pub async fn migrate_from_project(&self, project_path: impl AsRef<Path>) -> ConfigResult<Value> {
        self.inner.ensure_started()?;
        self.inner.migrate_from_project(project_path.as_ref()).await
    }

    /// Unbind every module, detach from the registry and return to
    /// `Uninitialized`. Persisted data is untouched.
    pub fn reset(&self) {
        self.inner.reset();
    }
}

impl ManagerInner {
    fn lock_state(&self) -> MutexGuard<'_, ManagerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn observer(&self) -> Weak<dyn RegistryObserver> {
        self.self_ref.clone() as Weak<dyn RegistryObserver>
    }

    fn ensure_initialized(&self) -> ConfigResult<()> {
        match self.lock_state().phase {
            Phase::Initialized => Ok(()),
            _ => Err(ConfigError::not_initialized()),
        }
    }

    /// Initialized, or far enough into initialization to have a project.
    fn ensure_started(&self) -> ConfigResult<()> {
        match self.lock_state().phase {
            Phase::Uninitialized => Err(ConfigError::not_initialized()),
            _ => Ok(()),
        }
    }

    fn resolve(&self, module_name: &str) -> ConfigResult<Arc<dyn ModuleConfiguration>> {
        self.registry
            .get_instance(module_name)
            .ok_or_else(|| ConfigError::module_not_registered(module_name))
    }

    async fn initialize(&self, project_path: &Path) {
        {
            let mut state = self.lock_state();
            if state.phase != Phase::Uninitialized {
                self.logger.debug("Configuration manager already initialized");
                return;
            }
            state.phase = Phase::Initializing;
            state.project_path = Some(project_path.to_path_buf());
            state.config_path = Some(self.settings.config_path(project_path));
        }

        self.registry.observe(self.observer());
        self.load().await;
        self.copy_schema(project_path).await;

        if let Err(err) = self.migrate_if_stale().await {
            self.logger
                .error(&format!("Configuration migration failed: {}", err));
        }

        {
            let mut state = self.lock_state();
            state.phase = Phase::Initialized;
            for instance in self.registry.get_instances().values() {
                if let Err(err) = self.bind(&mut state, instance) {
                    self.logger.error(&err.to_string());
                }
            }
        }

        self.logger.info(&format!(
            "Configuration initialized for {}",
            project_path.display()
        ));
    }

    /// Attach the document writer to `instance`, seeding it first from an
    /// existing slice. Already-bound modules are left alone.
    fn bind(
        &self,
        state: &mut ManagerState,
        instance: &Arc<dyn ModuleConfiguration>,
    ) -> ConfigResult<()> {
        let module_name = instance.module_name().to_string();
        if state.bindings.contains_key(&module_name) {
            return Ok(());
        }

        if let Some(Value::Object(slice)) = state.document.get(&module_name) {
            let base = instance
                .as_base()
                .ok_or_else(|| ConfigError::invalid_instance_type(&module_name))?;
            base.replace_configs(slice.clone());
        }

        let listener = instance.on_save(Arc::new(DocumentWriter {
            manager: self.self_ref.clone(),
        }));
        state.bindings.insert(
            module_name,
            Binding {
                instance: Arc::clone(instance),
                listener,
            },
        );
        Ok(())
    }

    /// Copy document slices into every bound base instance.
    ///
    /// Modules without an object slice in the document are reset to empty.
    fn reseed(&self, state: &ManagerState) {
        for (module_name, binding) in &state.bindings {
            let Some(base) = binding.instance.as_base() else {
                continue;
            };
            let slice = match state.document.get(module_name) {
                Some(Value::Object(slice)) => slice.clone(),
                _ => Map::new(),
            };
            base.replace_configs(slice);
        }
    }

    fn store_module(&self, module_name: &str, snapshot: Value) {
        self.lock_state()
            .document
            .insert(module_name.to_string(), snapshot);
    }

    async fn load(&self) {
        let Some(path) = self.lock_state().config_path.clone() else {
            return;
        };

        let exists = tokio::fs::try_exists(&path).await.unwrap_or(false);
        if !exists {
            {
                let mut state = self.lock_state();
                state.document.clear();
                state.version = INITIAL_VERSION.to_string();
            }
            if let Err(err) = self.save(false).await {
                self.logger.error(&err.to_string());
            }
            return;
        }

        let loaded = match tokio::fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str::<Value>(&content).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        let mut state = self.lock_state();
        state.document.clear();
        state.version = INITIAL_VERSION.to_string();

        match loaded {
            Ok(Value::Object(mut document)) => {
                if let Some(Value::String(version)) = document.remove(VERSION_KEY) {
                    state.version = version;
                }
                document.remove(SCHEMA_KEY);
                state.document = document;
            }
            Ok(_) => self.logger.error(&format!(
                "Ignoring {}: top level is not an object",
                path.display()
            )),
            Err(err) => self.logger.error(&format!(
                "Failed to read {}: {}",
                path.display(),
                err
            )),
        }
    }

    async fn save(&self, force: bool) -> ConfigResult<()> {
        let (path, file, document) = {
            let mut state = self.lock_state();
            if state.document.is_empty() && !force {
                return Ok(());
            }
            let path = state
                .config_path
                .clone()
                .ok_or_else(ConfigError::not_initialized)?;

            state.version = self.settings.current_version.clone();
            let mut file = state.document.clone();
            file.insert(
                SCHEMA_KEY.to_string(),
                Value::String(self.settings.schema_reference()),
            );
            file.insert(VERSION_KEY.to_string(), Value::String(state.version.clone()));
            (path, Value::Object(file), Value::Object(state.document.clone()))
        };

        let sequence = self.save_counter.fetch_add(1, Ordering::Relaxed);
        match write_document(&path, &file, sequence).await {
            Ok(()) => {
                self.events.emit(ConfigEvent::Save { document });
                Ok(())
            }
            Err(err) => {
                let err = ConfigError::persistence(&path, err);
                self.logger.error(&err.to_string());
                Err(err)
            }
        }
    }

    async fn copy_schema(&self, project_path: &Path) {
        let destination = self.settings.schema_path(project_path);
        let result = async {
            if let Some(parent) = destination.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            match self.settings.schema_source {
                Some(ref source) => tokio::fs::copy(source, &destination).await.map(|_| ()),
                None => tokio::fs::write(&destination, EMBEDDED_SCHEMA).await,
            }
        }
        .await;

        if let Err(err) = result {
            self.logger.warning(&format!(
                "Failed to copy configuration schema to {}: {}",
                destination.display(),
                err
            ));
        }
    }

    async fn migrate_if_stale(&self) -> ConfigResult<bool> {
        let (project_path, recorded) = {
            let state = self.lock_state();
            let project_path = state
                .project_path
                .clone()
                .ok_or_else(ConfigError::not_initialized)?;
            (project_path, state.version.clone())
        };

        let current = Version::parse(&self.settings.current_version).map_err(ConfigError::internal)?;
        let recorded = Version::parse(&recorded).unwrap_or_else(|err| {
            self.logger
                .warning(&format!("Unreadable document version '{}': {}", recorded, err));
            Version::new(0, 0, 0)
        });

        if current > recorded {
            self.logger
                .info(&format!("Migrating project configuration {} -> {}", recorded, current));
            self.migrate_from_project(&project_path).await?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn migrate_from_project(&self, project_path: &Path) -> ConfigResult<Value> {
        let mut output = self.migrations.migrate(project_path).await?;
        let fragment = match output.remove(DEFAULT_TARGET_SCOPE) {
            Some(fragment @ Value::Object(_)) => fragment,
            _ => Value::Object(Map::new()),
        };

        let merged = {
            let mut state = self.lock_state();
            let current = Value::Object(std::mem::take(&mut state.document));
            if let Value::Object(document) = deep_merge(current, fragment) {
                state.document = document;
            }
            self.reseed(&state);
            Value::Object(state.document.clone())
        };

        self.save(false).await?;
        Ok(merged)
    }

    fn reset(&self) {
        let mut state = self.lock_state();
        for (_, binding) in state.bindings.drain() {
            binding.instance.off_save(binding.listener);
        }
        *state = ManagerState::new();
        drop(state);
        self.registry.unobserve(&self.observer());
    }
}

impl RegistryObserver for ManagerInner {
    fn on_registered(&self, instance: &Arc<dyn ModuleConfiguration>) -> ConfigResult<()> {
        let mut state = self.lock_state();
        // Modules registered earlier are bound when initialization completes.
        if state.phase != Phase::Initialized {
            return Ok(());
        }
        self.bind(&mut state, instance)
    }

    fn on_unregistered(&self, module_name: &str, _instance: Option<&Arc<dyn ModuleConfiguration>>) {
        if let Some(binding) = self.lock_state().bindings.remove(module_name) {
            binding.instance.off_save(binding.listener);
        }
    }
}

/// Save listener copying a module snapshot into the document and persisting it.
struct DocumentWriter {
    manager: Weak<ManagerInner>,
}

#[async_trait]
impl SaveListener for DocumentWriter {
    async fn on_save(&self, module_name: &str, snapshot: Value) -> ConfigResult<()> {
        let Some(manager) = self.manager.upgrade() else {
            return Ok(());
        };
        manager.store_module(module_name, snapshot);
        manager.save(false).await
    }
}

/// Write pretty JSON (4-space indent) through a temp file and rename.
async fn write_document(path: &Path, document: &Value, sequence: u64) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    document.serialize(&mut serializer)?;
    buf.push(b'\n');

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = path.with_file_name(format!(".{}.{}.tmp", file_name, sequence));
    let written = match tokio::fs::write(&temp_path, &buf).await {
        Ok(()) => tokio::fs::rename(&temp_path, path).await,
        Err(err) => Err(err),
    };
    if written.is_err() {
        // Best effort.
        let _ = tokio::fs::remove_file(&temp_path).await;
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::json;

    #[test]
    fn test_parse_key() {
        assert_eq!(
            parse_key("builder.platforms.android").unwrap(),
            ParsedKey {
                module_name: "builder".into(),
                actual_key: "platforms.android".into()
            }
        );
    }

    #[test]
    fn test_parse_key_rejects_malformed() {
        for key in ["builder", "builder.", "builder.   ", ".key", "", "  .x"] {
            let err = parse_key(key).unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidKey, "key {:?}", key);
        }
    }

    #[tokio::test]
    async fn test_write_document_is_pretty_with_four_spaces() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("nested").join("cocos.config.json");
        write_document(&path, &json!({"a": {"b": 1}}), 0).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "{\n    \"a\": {\n        \"b\": 1\n    }\n}\n");
        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_temp_files() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("cocos.config.json");
        std::fs::create_dir_all(path.join("occupied")).unwrap();

        for sequence in 0..3 {
            assert!(write_document(&path, &json!({"a": 1}), sequence).await.is_err());
        }

        let names: Vec<String> = std::fs::read_dir(temp.path())
            .unwrap()
            .filter_map(Result::ok)
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["cocos.config.json"]);
    }
}
