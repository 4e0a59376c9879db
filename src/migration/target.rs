//! Migration target definitions.

use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Result bucket used when a target does not name one.
pub const DEFAULT_TARGET_SCOPE: &str = "project";

/// Which legacy file a target reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LegacyScope {
    /// `<project>/settings/...`
    #[default]
    Project,
    /// `<project>/profiles/...`
    Local,
    /// `<home>/.CocosCreator/profiles/...`
    Global,
}

impl LegacyScope {
    /// Legacy file read by default for targets landing in `bucket`.
    pub fn for_bucket(bucket: &str) -> Self {
        match bucket {
            "project" => LegacyScope::Project,
            "local" => LegacyScope::Local,
            _ => LegacyScope::Global,
        }
    }
}

impl fmt::Display for LegacyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LegacyScope::Project => write!(f, "project"),
            LegacyScope::Local => write!(f, "local"),
            LegacyScope::Global => write!(f, "global"),
        }
    }
}

/// Moves the value at dotted path `from` to `to` in a transformed fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMapping {
    pub from: String,
    pub to: String,
}

/// Transform from legacy plugin JSON to a fragment keyed by module name.
pub type TransformFn = Arc<dyn Fn(Value, &Path) -> anyhow::Result<Value> + Send + Sync>;

/// One legacy plugin's migration.
#[derive(Clone)]
pub struct MigrationTarget {
    /// Legacy plugin whose file is read; also used in logs.
    pub plugin_name: String,
    /// Follows the result bucket unless set with [`from_scope`](Self::from_scope).
    pub source_scope: LegacyScope,
    explicit_source: bool,
    /// Result bucket; `None` means [`DEFAULT_TARGET_SCOPE`].
    pub target_scope: Option<String>,
    /// Applied in order after the transform.
    pub path_mappings: Vec<PathMapping>,
    transform: TransformFn,
}

impl MigrationTarget {
    pub fn new<F>(plugin_name: impl Into<String>, transform: F) -> Self
    where
        F: Fn(Value, &Path) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            plugin_name: plugin_name.into(),
            source_scope: LegacyScope::default(),
            explicit_source: false,
            target_scope: None,
            path_mappings: Vec::new(),
            transform: Arc::new(transform),
        }
    }

    /// Place the whole legacy file under `module_name`.
    pub fn passthrough(plugin_name: impl Into<String>, module_name: impl Into<String>) -> Self {
        let module_name = module_name.into();
        Self::new(plugin_name, move |legacy, _project| {
            let mut fragment = Map::new();
            fragment.insert(module_name.clone(), legacy);
            Ok(Value::Object(fragment))
        })
    }

    /// Read the legacy file from `scope` regardless of the result bucket.
    pub fn from_scope(mut self, scope: LegacyScope) -> Self {
        self.source_scope = scope;
        self.explicit_source = true;
        self
    }

    pub fn into_scope(mut self, scope: impl Into<String>) -> Self {
        let scope = scope.into();
        if !self.explicit_source {
            self.source_scope = LegacyScope::for_bucket(&scope);
        }
        self.target_scope = Some(scope);
        self
    }

    pub fn map_path(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.path_mappings.push(PathMapping {
            from: from.into(),
            to: to.into(),
        });
        self
    }

    /// The result bucket this target merges into.
    pub fn bucket(&self) -> &str {
        self.target_scope.as_deref().unwrap_or(DEFAULT_TARGET_SCOPE)
    }

    pub fn transform(&self, legacy: Value, project: &Path) -> anyhow::Result<Value> {
        (self.transform)(legacy, project)
    }
}

impl fmt::Debug for MigrationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationTarget")
            .field("plugin_name", &self.plugin_name)
            .field("source_scope", &self.source_scope)
            .field("target_scope", &self.bucket())
            .field("path_mappings", &self.path_mappings)
            .finish()
    }
}
