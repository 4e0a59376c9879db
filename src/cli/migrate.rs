//! Migration command: fold legacy `settings/` and `profiles/` files into
//! `cocos.config.json`.

use crate::format::{OutputFormat, format_value};
use crate::manager::ConfigurationManager;
use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;
use std::path::Path;

/// Arguments for the migrate command.
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Show what would be migrated without making changes.
    #[arg(long)]
    pub dry_run: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

/// Run every migration target and print the result buckets.
///
/// Runs against the migration manager alone, so nothing is written and the
/// configuration manager does not need to be initialized.
pub async fn run_dry_run(
    manager: &ConfigurationManager,
    project: &Path,
    args: &MigrateArgs,
) -> Result<String> {
    let output = manager
        .migrations()
        .migrate(project)
        .await
        .with_context(|| format!("Dry run migration of {} failed", project.display()))?;

    let mut report = String::from("Dry run: No changes made.\n");
    report.push_str(&format_value(&Value::Object(output), args.format));
    Ok(report)
}

/// Migrate into the initialized manager's document and print the result.
pub async fn run_migrate(
    manager: &ConfigurationManager,
    project: &Path,
    args: &MigrateArgs,
) -> Result<String> {
    let document = manager
        .migrate_from_project(project)
        .await
        .with_context(|| format!("Migration of {} failed", project.display()))?;

    let config_path = manager
        .config_path()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    let mut report = format!("Migrated legacy settings into {}\n", config_path);
    report.push_str(&format_value(&document, args.format));
    Ok(report)
}
