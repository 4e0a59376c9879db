//! Manager settings: file names, schema source and legacy home directory.
//!
//! ## Environment Variables
//! - `COCOS_CONFIG_SCHEMA_PATH` - Schema file copied into projects instead of the embedded one
//! - `COCOS_CONFIG_HOME` - Home directory used to resolve global legacy profiles

use crate::version::CURRENT_VERSION;
use std::path::{Path, PathBuf};

/// Name of the persisted project document.
pub const CONFIG_FILE_NAME: &str = "cocos.config.json";

/// Name of the schema artifact written next to the project.
pub const SCHEMA_FILE_NAME: &str = "cocos.config.schema.json";

/// Project-relative directory receiving the schema artifact.
pub const SCHEMA_DIR: &str = "temp";

/// Schema embedded at build time.
pub const EMBEDDED_SCHEMA: &str = include_str!("../schema/cocos.config.schema.json");

#[derive(Debug, Clone)]
pub struct ManagerSettings {
    pub config_file_name: String,
    pub schema_dir: String,
    pub schema_file_name: String,
    /// Copied into the project when set; otherwise the embedded schema is written.
    pub schema_source: Option<PathBuf>,
    /// Home directory for global legacy profiles.
    pub legacy_home: Option<PathBuf>,
    /// Version stamped into saved documents.
    pub current_version: String,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self::discover()
    }
}

impl ManagerSettings {
    /// Discover settings from environment and defaults.
    pub fn discover() -> Self {
        let schema_source = std::env::var("COCOS_CONFIG_SCHEMA_PATH")
            .ok()
            .map(PathBuf::from);

        let legacy_home = std::env::var("COCOS_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(dirs::home_dir);

        Self {
            config_file_name: CONFIG_FILE_NAME.to_string(),
            schema_dir: SCHEMA_DIR.to_string(),
            schema_file_name: SCHEMA_FILE_NAME.to_string(),
            schema_source,
            legacy_home,
            current_version: CURRENT_VERSION.to_string(),
        }
    }

    /// Settings with an explicit legacy home and no environment lookups.
    pub fn with_home(legacy_home: impl Into<PathBuf>) -> Self {
        Self {
            config_file_name: CONFIG_FILE_NAME.to_string(),
            schema_dir: SCHEMA_DIR.to_string(),
            schema_file_name: SCHEMA_FILE_NAME.to_string(),
            schema_source: None,
            legacy_home: Some(legacy_home.into()),
            current_version: CURRENT_VERSION.to_string(),
        }
    }

    pub fn with_schema_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.schema_source = Some(source.into());
        self
    }

    pub fn with_current_version(mut self, version: impl Into<String>) -> Self {
        self.current_version = version.into();
        self
    }

    pub fn config_path(&self, project: &Path) -> PathBuf {
        project.join(&self.config_file_name)
    }

    pub fn schema_path(&self, project: &Path) -> PathBuf {
        project.join(&self.schema_dir).join(&self.schema_file_name)
    }

    /// Value of the document's `$schema` field, relative to the project root.
    pub fn schema_reference(&self) -> String {
        format!("./{}/{}", self.schema_dir, self.schema_file_name)
    }
}
