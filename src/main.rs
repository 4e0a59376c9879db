//! cocos-config
//!
//! Command-line access to a Cocos project's configuration document and the
//! legacy settings migration.

use anyhow::{Context, Result};
use clap::Parser;
use cocos_config::cli::access::{run_get, run_remove, run_set, run_show};
use cocos_config::cli::migrate::{run_dry_run, run_migrate};
use cocos_config::cli::{Cli, Command, register_document_modules};
use cocos_config::events::EventBus;
use cocos_config::logging::Logger;
use cocos_config::manager::ConfigurationManager;
use cocos_config::migration::{LegacyConfigLoader, MigrationManager};
use cocos_config::registry::ConfigurationRegistry;
use cocos_config::settings::ManagerSettings;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Level, debug};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn init_logging(cli: &Cli) -> Result<()> {
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    // RUST_LOG, when set, wins over --verbose.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));

    match cli.log.as_str() {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)
                .with_context(|| format!("Cannot open log file {}", filename))?;
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

fn build_manager(settings: ManagerSettings) -> ConfigurationManager {
    let logger = Logger::new();
    let registry = Arc::new(ConfigurationRegistry::new(EventBus::new(), logger.clone()));
    let loader = Arc::new(LegacyConfigLoader::new(
        settings.legacy_home.clone(),
        logger.clone(),
    ));
    let migrations = Arc::new(MigrationManager::with_builtin(loader, logger.clone()));
    ConfigurationManager::new(registry, migrations, settings, logger)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let project = match cli.project {
        Some(ref project) => PathBuf::from(project),
        None => std::env::current_dir().context("Cannot determine the current directory")?,
    };
    debug!("Using project {}", project.display());

    let manager = build_manager(ManagerSettings::discover());

    // A dry run must not touch the project, so it skips initialization.
    if let Command::Migrate(ref args) = cli.command
        && args.dry_run
    {
        println!("{}", run_dry_run(&manager, &project, args).await?);
        return Ok(());
    }

    manager.initialize(&project).await;
    register_document_modules(&manager)?;

    let output = match cli.command {
        Command::Show(args) => run_show(&manager, &args)?,
        Command::Get(args) => run_get(&manager, &args)?,
        Command::Set(args) => run_set(&manager, &args).await?,
        Command::Remove(args) => run_remove(&manager, &args).await?,
        Command::Migrate(args) => run_migrate(&manager, &project, &args).await?,
    };
    println!("{}", output);

    Ok(())
}
