//! Read and write commands: `show`, `get`, `set` and `remove`.

use super::{ScopeArg, ensure_module, parse_value};
use crate::format::{OutputFormat, format_value};
use crate::manager::{ConfigurationManager, parse_key};
use anyhow::Result;
use clap::Args;

/// Arguments for the show command.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

/// Arguments for the get command.
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Dotted key, `<module>.<key>`
    pub key: String,

    /// Read a single scope instead of project-then-default
    #[arg(long, value_enum)]
    pub scope: Option<ScopeArg>,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

/// Arguments for the set command.
#[derive(Args, Debug)]
pub struct SetArgs {
    /// Dotted key, `<module>.<key>`
    pub key: String,

    /// Value as JSON; anything that does not parse is stored as a string
    pub value: String,

    /// Scope to write
    #[arg(long, value_enum, default_value_t)]
    pub scope: ScopeArg,
}

/// Arguments for the remove command.
#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Dotted key, `<module>.<key>`
    pub key: String,

    /// Scope to remove from
    #[arg(long, value_enum, default_value_t)]
    pub scope: ScopeArg,
}

pub fn run_show(manager: &ConfigurationManager, args: &ShowArgs) -> Result<String> {
    Ok(format_value(&manager.document(), args.format))
}

pub fn run_get(manager: &ConfigurationManager, args: &GetArgs) -> Result<String> {
    let value = manager.get(&args.key, args.scope.map(Into::into))?;
    Ok(format_value(&value, args.format))
}

/// Write a value, registering the module first when it is new to the document.
pub async fn run_set(manager: &ConfigurationManager, args: &SetArgs) -> Result<String> {
    let parsed = parse_key(&args.key)?;
    ensure_module(manager, &parsed.module_name)?;

    let value = parse_value(&args.value);
    manager.set(&args.key, value, args.scope.into()).await?;
    Ok(format!("Set {}", args.key))
}

pub async fn run_remove(manager: &ConfigurationManager, args: &RemoveArgs) -> Result<String> {
    if manager.remove(&args.key, args.scope.into()).await? {
        Ok(format!("Removed {}", args.key))
    } else {
        Ok(format!("{} was not set", args.key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::logging::Logger;
    use crate::migration::{LegacyConfigLoader, MigrationManager};
    use crate::registry::ConfigurationRegistry;
    use crate::settings::ManagerSettings;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn initialized(temp: &TempDir) -> ConfigurationManager {
        let logger = Logger::new();
        let registry = Arc::new(ConfigurationRegistry::new(EventBus::new(), logger.clone()));
        let loader = Arc::new(LegacyConfigLoader::new(None, logger.clone()));
        let migrations = Arc::new(MigrationManager::with_builtin(loader, logger.clone()));
        let manager = ConfigurationManager::new(
            registry,
            migrations,
            ManagerSettings::with_home(temp.path()),
            logger,
        );
        manager.initialize(temp.path()).await;
        manager
    }

    #[tokio::test]
    async fn test_set_registers_new_module() {
        let temp = TempDir::new().unwrap();
        let manager = initialized(&temp).await;

        let set = SetArgs {
            key: "builder.platform".into(),
            value: "web-mobile".into(),
            scope: ScopeArg::Project,
        };
        assert_eq!(run_set(&manager, &set).await.unwrap(), "Set builder.platform");

        let get = GetArgs {
            key: "builder.platform".into(),
            scope: None,
            format: OutputFormat::Text,
        };
        assert_eq!(run_get(&manager, &get).unwrap(), "web-mobile");

        let show = ShowArgs {
            format: OutputFormat::Text,
        };
        assert_eq!(run_show(&manager, &show).unwrap(), "builder.platform = web-mobile");
    }

    #[tokio::test]
    async fn test_remove_reports_missing_keys() {
        let temp = TempDir::new().unwrap();
        let manager = initialized(&temp).await;
        super::ensure_module(&manager, "engine").unwrap();

        let remove = RemoveArgs {
            key: "engine.debug".into(),
            scope: ScopeArg::Project,
        };
        assert_eq!(
            run_remove(&manager, &remove).await.unwrap(),
            "engine.debug was not set"
        );
    }
}
