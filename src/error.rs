//! Structured error types for configuration operations.

use serde::Serialize;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Lifecycle errors
    NotInitialized,

    // Validation errors
    InvalidKey,
    MismatchedModuleName,
    InvalidInstanceType,

    // Not found errors
    ModuleNotRegistered,
    ConfigNotFound,

    // Migration errors
    NoMigratorsRegistered,
    MigrationPartialFailure,
    MigrationFailed,

    // Internal errors
    PersistenceFailure,
    InternalError,
}

/// Structured error for configuration operations.
#[derive(Debug, Serialize)]
pub struct ConfigError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ConfigError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            module: None,
            details: None,
        }
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors

    pub fn not_initialized() -> Self {
        Self::new(
            ErrorCode::NotInitialized,
            "Configuration manager is not initialized",
        )
    }

    pub fn invalid_key(key: &str, reason: &str) -> Self {
        Self::new(
            ErrorCode::InvalidKey,
            format!("Invalid configuration key '{}': {}", key, reason),
        )
    }

    pub fn mismatched_module_name(expected: &str, actual: &str) -> Self {
        Self::new(
            ErrorCode::MismatchedModuleName,
            format!(
                "Instance module name '{}' does not match registration key '{}'",
                actual, expected
            ),
        )
        .with_module(expected)
    }

    pub fn module_not_registered(module: &str) -> Self {
        Self::new(
            ErrorCode::ModuleNotRegistered,
            format!("Configuration module not registered: {}", module),
        )
        .with_module(module)
    }

    pub fn config_not_found(module: &str, key: &str) -> Self {
        Self::new(
            ErrorCode::ConfigNotFound,
            format!("Configuration not found: {}.{}", module, key),
        )
        .with_module(module)
    }

    pub fn invalid_instance_type(module: &str) -> Self {
        Self::new(
            ErrorCode::InvalidInstanceType,
            format!(
                "Configuration instance for '{}' cannot be seeded from the project document",
                module
            ),
        )
        .with_module(module)
    }

    pub fn no_migrators() -> Self {
        Self::new(
            ErrorCode::NoMigratorsRegistered,
            "No migration targets registered",
        )
    }

    pub fn migration_partial_failure(failed: &[String]) -> Self {
        Self::new(
            ErrorCode::MigrationPartialFailure,
            format!("Migration failed for: {}", failed.join(", ")),
        )
    }

    pub fn migration_failed(plugin: &str, err: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::MigrationFailed,
            format!("Migration of '{}' failed: {}", plugin, err),
        )
        .with_module(plugin)
    }

    pub fn persistence(path: &std::path::Path, err: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::PersistenceFailure,
            format!("Failed to write {}", path.display()),
        )
        .with_details(err.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.details {
            Some(ref details) => write!(f, "{}: {}", self.message, details),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ConfigError {}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for ConfigError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ConfigError>() {
            Ok(config_err) => config_err,
            Err(err) => ConfigError::internal(err),
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
