//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::RelayConfig;
use crate::config::validation::{validate_config, ConfigIssue};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_issues(.0))]
    Validation(Vec<ConfigIssue>),

    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

fn join_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from a TOML file, apply environment overrides, then
/// validate.
pub fn load_config(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: RelayConfig = toml::from_str(&content)?;
    finalize(config, env_var)
}

/// Defaults plus environment overrides, validated.
pub fn load_defaults() -> Result<RelayConfig, ConfigError> {
    finalize(RelayConfig::default(), env_var)
}

/// Apply overrides from `lookup` and validate the result.
pub fn finalize(
    mut config: RelayConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<RelayConfig, ConfigError> {
    let mut issues = apply_env_overrides(&mut config, lookup);
    if let Err(mut invalid) = validate_config(&config) {
        issues.append(&mut invalid);
    }

    if issues.is_empty() {
        Ok(config)
    } else {
        Err(ConfigError::Validation(issues))
    }
}

/// Overlay `APP_ID`, `APP_SECRET`, `OPEN_CHAT_ID`, `RELAY_ENV` and
/// `RELAY_BIND` onto `config`. Returns values that could not be applied.
pub fn apply_env_overrides(
    config: &mut RelayConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Vec<ConfigIssue> {
    let mut issues = Vec::new();

    if let Some(app_id) = lookup("APP_ID") {
        config.platform.app_id = app_id;
    }
    if let Some(app_secret) = lookup("APP_SECRET") {
        config.platform.app_secret = app_secret;
    }
    if let Some(chat_id) = lookup("OPEN_CHAT_ID") {
        config.platform.chat_id = chat_id;
    }
    if let Some(bind) = lookup("RELAY_BIND") {
        config.listener.bind_address = bind;
    }
    if let Some(env) = lookup("RELAY_ENV") {
        match env.parse() {
            Ok(environment) => config.environment = environment,
            Err(message) => issues.push(ConfigIssue::new("RELAY_ENV", message)),
        }
    }

    issues
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}
