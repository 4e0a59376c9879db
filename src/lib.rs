//! Cocos project configuration library
//!
//! This module exports the configuration registry, the scoped configuration
//! store, the project document manager and the legacy settings migration.

pub mod cli;
pub mod config;
pub mod configuration;
pub mod error;
pub mod events;
pub mod format;
pub mod logging;
pub mod manager;
pub mod migration;
pub mod registry;
pub mod settings;
pub mod version;

pub use configuration::{ConfigScope, Configuration, ModuleConfiguration, SaveListener};
pub use error::{ConfigError, ConfigResult, ErrorCode};
pub use events::{ConfigEvent, EventBus};
pub use manager::ConfigurationManager;
pub use registry::{ConfigurationRegistry, Registration};
