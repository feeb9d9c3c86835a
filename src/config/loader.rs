//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for {key}: {value}")]
    Override { key: &'static str, value: String },
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

/// Load a TOML file, apply environment overrides and validate the result.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content, |key| std::env::var(key).ok())
}

/// Parse TOML content, overlay values from `lookup` and validate.
pub fn parse_config<F>(content: &str, lookup: F) -> Result<ProxyConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config: ProxyConfig = toml::from_str(content)?;

    apply_overrides(&mut config, lookup)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay values found through `lookup` onto `config`.
///
/// Keys are the upper-cased field names: `PORT`, `LOG_LEVEL`, `SERVERS`
/// (comma separated), `JWT_SECRET`, `REDIS_ADDR`, `REDIS_PASSWORD`,
/// `REDIS_DB` and `METRICS_ADDRESS`.
pub fn apply_overrides<F>(config: &mut ProxyConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("PORT") {
        config.port = value
            .parse()
            .map_err(|_| ConfigError::Override { key: "PORT", value })?;
    }
    if let Some(value) = lookup("LOG_LEVEL") {
        config.log_level = value;
    }
    if let Some(value) = lookup("SERVERS") {
        config.servers = value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
    }
    if let Some(value) = lookup("JWT_SECRET") {
        config.jwt_secret = value;
    }
    if let Some(value) = lookup("REDIS_ADDR") {
        config.redis.addr = value;
    }
    if let Some(value) = lookup("REDIS_PASSWORD") {
        config.redis.password = value;
    }
    if let Some(value) = lookup("REDIS_DB") {
        config.redis.db = value
            .parse()
            .map_err(|_| ConfigError::Override { key: "REDIS_DB", value })?;
    }
    if let Some(value) = lookup("METRICS_ADDRESS") {
        config.metrics.address = value;
    }
    Ok(())
}
