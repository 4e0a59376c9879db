//! CLI command definitions for cocos-config
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod access;
pub mod migrate;

use crate::configuration::ConfigScope;
use crate::error::ConfigResult;
use crate::manager::ConfigurationManager;
use access::{GetArgs, RemoveArgs, SetArgs, ShowArgs};
use clap::{Parser, Subcommand, ValueEnum};
use migrate::MigrateArgs;
use serde_json::{Value, json};

/// Scope selector for reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ScopeArg {
    /// Registered defaults (in memory only)
    Default,
    /// Persisted project values
    #[default]
    Project,
}

impl From<ScopeArg> for ConfigScope {
    fn from(scope: ScopeArg) -> Self {
        match scope {
            ScopeArg::Default => ConfigScope::Default,
            ScopeArg::Project => ConfigScope::Project,
        }
    }
}

/// Inspect, edit and migrate a Cocos project's cocos.config.json
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Project root (default: current directory)
    #[arg(short, long, global = true)]
    pub project: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the project document
    Show(ShowArgs),

    /// Read one `module.key` value
    Get(GetArgs),

    /// Write one `module.key` value
    Set(SetArgs),

    /// Remove one `module.key` value
    Remove(RemoveArgs),

    /// Migrate legacy settings/profiles files into the project document
    Migrate(MigrateArgs),
}

/// Register a plain module for every slice already present in the document.
pub fn register_document_modules(manager: &ConfigurationManager) -> ConfigResult<()> {
    let Value::Object(document) = manager.document() else {
        return Ok(());
    };
    for module_name in document.keys() {
        ensure_module(manager, module_name)?;
    }
    Ok(())
}

/// Register `module_name` with empty defaults unless something already is.
pub fn ensure_module(manager: &ConfigurationManager, module_name: &str) -> ConfigResult<()> {
    let registry = manager.registry();
    if !registry.contains(module_name) {
        registry.register_defaults(module_name, json!({}))?;
    }
    Ok(())
}

/// Parse a command-line value as JSON, falling back to a plain string.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
