//! Per-module configuration instances.
//!
//! A module's configuration lives in two trees: `defaults` (built-in fallback
//! values, never persisted by the instance) and `configs` (the project-scope
//! values bound to the project document). Persistence is not the instance's
//! concern: project-scope writes notify the subscribed [`SaveListener`]s and
//! wait for all of them before returning.

use crate::config::{deep_merge, get_by_dot_path, remove_by_dot_path, set_by_dot_path};
use crate::error::{ConfigError, ConfigResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Which configuration tier a read or write targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigScope {
    /// Built-in defaults supplied at registration.
    Default,
    /// Values persisted in the project document.
    #[default]
    Project,
}

impl fmt::Display for ConfigScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigScope::Default => write!(f, "default"),
            ConfigScope::Project => write!(f, "project"),
        }
    }
}

impl FromStr for ConfigScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(ConfigScope::Default),
            "project" => Ok(ConfigScope::Project),
            other => Err(format!("unknown configuration scope: {}", other)),
        }
    }
}

/// Handle returned by [`ModuleConfiguration::on_save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    /// For custom [`ModuleConfiguration`] implementations issuing their own ids.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Receives a module's project-scope snapshot after every project-scope write.
#[async_trait]
pub trait SaveListener: Send + Sync {
    async fn on_save(&self, module_name: &str, snapshot: Value) -> ConfigResult<()>;
}

/// Behavior shared by everything the registry can hold.
///
/// [`Configuration`] is the stock implementation. Modules may register their
/// own, but only instances that expose a [`Configuration`] through
/// [`as_base`](ModuleConfiguration::as_base) can be seeded from the project
/// document.
#[async_trait]
pub trait ModuleConfiguration: Send + Sync {
    fn module_name(&self) -> &str;

    /// Read a value. With no key, returns the project tree merged over the
    /// defaults tree.
    fn get(&self, key: Option<&str>, scope: Option<ConfigScope>) -> ConfigResult<Value>;

    async fn set(&self, key: &str, value: Value, scope: ConfigScope) -> ConfigResult<bool>;

    async fn remove(&self, key: &str, scope: ConfigScope) -> ConfigResult<bool>;

    /// The raw tree for `scope`: defaults for `Default`, project values otherwise.
    fn get_all(&self, scope: Option<ConfigScope>) -> Option<Value>;

    fn on_save(&self, listener: Arc<dyn SaveListener>) -> ListenerId;

    /// Detach a listener. Returns `true` if it was attached.
    fn off_save(&self, id: ListenerId) -> bool;

    fn as_base(&self) -> Option<&Configuration> {
        None
    }
}

struct Trees {
    defaults: Value,
    configs: Value,
}

/// The stock configuration instance for one module.
pub struct Configuration {
    module_name: String,
    trees: RwLock<Trees>,
    listeners: Mutex<Vec<(ListenerId, Arc<dyn SaveListener>)>>,
    next_listener: AtomicU64,
}

impl Configuration {
    /// Create an instance. Non-object `defaults` are treated as empty.
    pub fn new(module_name: impl Into<String>, defaults: Value) -> Self {
        let defaults = match defaults {
            Value::Object(map) => Value::Object(map),
            _ => Value::Object(Map::new()),
        };
        Self {
            module_name: module_name.into(),
            trees: RwLock::new(Trees {
                defaults,
                configs: Value::Object(Map::new()),
            }),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(1),
        }
    }

    /// Replace the whole project tree without notifying listeners.
    pub fn replace_configs(&self, configs: Map<String, Value>) {
        let mut trees = self.trees.write().unwrap_or_else(PoisonError::into_inner);
        trees.configs = Value::Object(configs);
    }

    /// Number of attached save listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn project_snapshot(&self) -> Value {
        self.trees
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .configs
            .clone()
    }

    async fn emit_save(&self) -> ConfigResult<()> {
        let listeners: Vec<Arc<dyn SaveListener>> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener
                .on_save(&self.module_name, self.project_snapshot())
                .await?;
        }
        Ok(())
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("module_name", &self.module_name)
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[async_trait]
impl ModuleConfiguration for Configuration {
    fn module_name(&self) -> &str {
        &self.module_name
    }

    fn get(&self, key: Option<&str>, scope: Option<ConfigScope>) -> ConfigResult<Value> {
        let trees = self.trees.read().unwrap_or_else(PoisonError::into_inner);

        let Some(key) = key.filter(|k| !k.is_empty()) else {
            return Ok(deep_merge(trees.defaults.clone(), trees.configs.clone()));
        };

        // Per-key reads return the project value as-is; no leaf-level merge.
        let found = match scope {
            Some(ConfigScope::Project) => get_by_dot_path(&trees.configs, key),
            Some(ConfigScope::Default) => get_by_dot_path(&trees.defaults, key),
            None => get_by_dot_path(&trees.configs, key)
                .or_else(|| get_by_dot_path(&trees.defaults, key)),
        };

        found
            .cloned()
            .ok_or_else(|| ConfigError::config_not_found(&self.module_name, key))
    }

    async fn set(&self, key: &str, value: Value, scope: ConfigScope) -> ConfigResult<bool> {
        {
            let mut trees = self.trees.write().unwrap_or_else(PoisonError::into_inner);
            match scope {
                ConfigScope::Default => set_by_dot_path(&mut trees.defaults, key, value),
                ConfigScope::Project => set_by_dot_path(&mut trees.configs, key, value),
            }
        }

        if scope == ConfigScope::Project {
            self.emit_save().await?;
        }
        Ok(true)
    }

    async fn remove(&self, key: &str, scope: ConfigScope) -> ConfigResult<bool> {
        let removed = {
            let mut trees = self.trees.write().unwrap_or_else(PoisonError::into_inner);
            match scope {
                ConfigScope::Default => remove_by_dot_path(&mut trees.defaults, key),
                ConfigScope::Project => remove_by_dot_path(&mut trees.configs, key),
            }
        };

        if removed && scope == ConfigScope::Project {
            self.emit_save().await?;
        }
        Ok(removed)
    }

    fn get_all(&self, scope: Option<ConfigScope>) -> Option<Value> {
        let trees = self.trees.read().unwrap_or_else(PoisonError::into_inner);
        match scope {
            Some(ConfigScope::Default) => Some(trees.defaults.clone()),
            _ => Some(trees.configs.clone()),
        }
    }

    fn on_save(&self, listener: Arc<dyn SaveListener>) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    fn off_save(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    fn as_base(&self) -> Option<&Configuration> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::json;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(String, Value)>>,
    }

    #[async_trait]
    impl SaveListener for Recorder {
        async fn on_save(&self, module_name: &str, snapshot: Value) -> ConfigResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push((module_name.to_string(), snapshot));
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl SaveListener for Failing {
        async fn on_save(&self, _module_name: &str, _snapshot: Value) -> ConfigResult<()> {
            Err(ConfigError::persistence(
                std::path::Path::new("cocos.config.json"),
                "disk full",
            ))
        }
    }

    fn preview() -> Configuration {
        Configuration::new("preview", json!({"port": 7456, "server": {"host": "localhost"}}))
    }

    #[tokio::test]
    async fn test_set_then_get_project() {
        let config = preview();
        assert!(config.set("port", json!(8000), ConfigScope::Project).await.unwrap());
        assert_eq!(
            config.get(Some("port"), Some(ConfigScope::Project)).unwrap(),
            json!(8000)
        );
    }

    #[test]
    fn test_unscoped_get_falls_back_to_default() {
        let config = preview();
        assert_eq!(config.get(Some("port"), None).unwrap(), json!(7456));
    }

    #[test]
    fn test_scoped_get_missing_is_not_found() {
        let config = preview();
        let err = config
            .get(Some("port"), Some(ConfigScope::Project))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigNotFound);

        let err = config.get(Some("nope"), None).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigNotFound);
    }

    #[tokio::test]
    async fn test_per_key_read_does_not_merge_leaf() {
        let config = preview();
        config
            .set("server", json!({"secure": true}), ConfigScope::Project)
            .await
            .unwrap();

        assert_eq!(config.get(Some("server"), None).unwrap(), json!({"secure": true}));
        assert_eq!(
            config.get(None, None).unwrap(),
            json!({"port": 7456, "server": {"host": "localhost", "secure": true}})
        );
    }

    #[tokio::test]
    async fn test_project_write_notifies_listener() {
        let config = preview();
        let recorder = Arc::new(Recorder::default());
        config.on_save(recorder.clone());

        config.set("a.b", json!(1), ConfigScope::Project).await.unwrap();

        let calls = recorder.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "preview");
        assert_eq!(calls[0].1, json!({"a": {"b": 1}}));
    }

    #[tokio::test]
    async fn test_default_write_is_silent() {
        let config = preview();
        let recorder = Arc::new(Recorder::default());
        config.on_save(recorder.clone());

        config.set("port", json!(1), ConfigScope::Default).await.unwrap();
        assert!(config.remove("port", ConfigScope::Default).await.unwrap());

        assert!(recorder.calls.lock().unwrap().is_empty());
        assert!(config.get(Some("port"), None).is_err());
    }

    #[tokio::test]
    async fn test_remove_missing_is_false_and_silent() {
        let config = preview();
        let recorder = Arc::new(Recorder::default());
        config.on_save(recorder.clone());

        assert!(!config.remove("ghost", ConfigScope::Project).await.unwrap());
        assert!(recorder.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_after_set_restores_not_found() {
        let config = preview();
        config.set("extra", json!("x"), ConfigScope::Project).await.unwrap();
        assert!(config.remove("extra", ConfigScope::Project).await.unwrap());
        let err = config
            .get(Some("extra"), Some(ConfigScope::Project))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigNotFound);
    }

    #[tokio::test]
    async fn test_listener_error_reaches_caller() {
        let config = preview();
        config.on_save(Arc::new(Failing));

        let err = config
            .set("port", json!(1), ConfigScope::Project)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PersistenceFailure);
        // The in-memory write already happened.
        assert_eq!(config.get(Some("port"), Some(ConfigScope::Project)).unwrap(), json!(1));
    }

    #[tokio::test]
    async fn test_off_save_detaches() {
        let config = preview();
        let recorder = Arc::new(Recorder::default());
        let id = config.on_save(recorder.clone());
        assert_eq!(config.listener_count(), 1);

        assert!(config.off_save(id));
        assert!(!config.off_save(id));

        config.set("port", json!(1), ConfigScope::Project).await.unwrap();
        assert!(recorder.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_get_all_and_replace() {
        let config = preview();
        let mut seeded = Map::new();
        seeded.insert("port".into(), json!(9999));
        config.replace_configs(seeded);

        assert_eq!(config.get_all(None), Some(json!({"port": 9999})));
        assert_eq!(
            config.get_all(Some(ConfigScope::Default)).unwrap()["port"],
            json!(7456)
        );
    }

    #[test]
    fn test_non_object_defaults_are_empty() {
        let config = Configuration::new("x", json!([1, 2]));
        assert_eq!(config.get_all(Some(ConfigScope::Default)), Some(json!({})));
    }

    #[test]
    fn test_scope_parse_and_display() {
        assert_eq!("project".parse::<ConfigScope>().unwrap(), ConfigScope::Project);
        assert_eq!("default".parse::<ConfigScope>().unwrap(), ConfigScope::Default);
        assert!("local".parse::<ConfigScope>().is_err());
        assert_eq!(ConfigScope::default().to_string(), "project");
    }
}
