//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value '{value}' for {key}")]
    Env { key: &'static str, value: String },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, override from the process environment, and validate.
///
/// Without a path the defaults are used as the base layer.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    load_config_with(path, |_| {})
}

/// Like [`load_config`], with `adjust` applied on top of the environment
/// layer. Command-line overrides go here so they are validated too.
pub fn load_config_with<A>(path: Option<&Path>, adjust: A) -> Result<AppConfig, ConfigError>
where
    A: FnOnce(&mut AppConfig),
{
    load(path, |key| std::env::var(key).ok(), adjust)
}

fn load<F, A>(path: Option<&Path>, lookup: F, adjust: A) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    A: FnOnce(&mut AppConfig),
{
    let config = match path {
        Some(path) => parse_file(path)?,
        None => AppConfig::default(),
    };
    let mut config = apply_env_overrides(config, lookup)?;
    adjust(&mut config);

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Parse a TOML file without validating it.
pub fn parse_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Apply `APP_ENV`, `HOST`, `PORT` and `LOG_DIR` on top of `config`.
///
/// `lookup` abstracts the environment so the mapping can be exercised
/// without touching process state.
pub fn apply_env_overrides<F>(mut config: AppConfig, lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("APP_ENV") {
        config.mode = value.parse().map_err(|_| ConfigError::Env {
            key: "APP_ENV",
            value,
        })?;
    }
    if let Some(value) = lookup("HOST") {
        config.server.host = value;
    }
    if let Some(value) = lookup("PORT") {
        config.server.port = value.trim().parse().map_err(|_| ConfigError::Env {
            key: "PORT",
            value,
        })?;
    }
    if let Some(value) = lookup("LOG_DIR") {
        config.logging.directory = value;
    }
    Ok(config)
}
