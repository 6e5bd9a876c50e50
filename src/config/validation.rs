//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (windows, batch sizes, timeouts > 0)
//! - Check addresses and URLs parse
//! - Refuse placeholder credentials in production
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ConfigIssue>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::{Environment, RelayConfig};

/// One semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub field: &'static str,
    pub message: String,
}

impl ConfigIssue {
    pub(crate) fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ConfigIssue>> {
    let mut issues = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        issues.push(ConfigIssue::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    let platform = &config.platform;
    if url::Url::parse(&platform.base_url).is_err() {
        issues.push(ConfigIssue::new(
            "platform.base_url",
            format!("'{}' is not a URL", platform.base_url),
        ));
    }
    if platform.request_timeout_secs == 0 {
        issues.push(ConfigIssue::new("platform.request_timeout_secs", "must be > 0"));
    }
    if config.environment == Environment::Production && platform.has_placeholder_credentials() {
        issues.push(ConfigIssue::new(
            "platform",
            "app_id, app_secret and chat_id must be set in production",
        ));
    }

    if config.timeouts.request_secs == 0 {
        issues.push(ConfigIssue::new("timeouts.request_secs", "must be > 0"));
    }

    let rate_limit = &config.rate_limit;
    if rate_limit.window_ms == 0 {
        issues.push(ConfigIssue::new("rate_limit.window_ms", "must be > 0"));
    }
    if rate_limit.max_requests == 0 {
        issues.push(ConfigIssue::new("rate_limit.max_requests", "must be > 0"));
    }
    if rate_limit.sweep_interval_secs == 0 {
        issues.push(ConfigIssue::new("rate_limit.sweep_interval_secs", "must be > 0"));
    }

    if config.dispatch.batch_size == 0 {
        issues.push(ConfigIssue::new("dispatch.batch_size", "must be > 0"));
    }

    let uploads = &config.uploads;
    if uploads.ttl_ms == 0 {
        issues.push(ConfigIssue::new("uploads.ttl_ms", "must be > 0"));
    }
    if uploads.sweep_interval_ms == 0 {
        issues.push(ConfigIssue::new("uploads.sweep_interval_ms", "must be > 0"));
    }
    if uploads.max_bytes == 0 {
        issues.push(ConfigIssue::new("uploads.max_bytes", "must be > 0"));
    }
    if uploads.allowed_extensions.is_empty() {
        issues.push(ConfigIssue::new("uploads.allowed_extensions", "must not be empty"));
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        issues.push(ConfigIssue::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", observability.metrics_address),
        ));
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&RelayConfig::default()).is_ok());
    }

    #[test]
    fn test_reports_every_issue() {
        let mut config = RelayConfig::default();
        config.dispatch.batch_size = 0;
        config.rate_limit.max_requests = 0;
        config.rate_limit.window_ms = 0;
        config.uploads.ttl_ms = 0;
        config.platform.request_timeout_secs = 0;
        config.listener.bind_address = "not-an-address".into();
        config.platform.base_url = "::nope".into();

        let issues = validate_config(&config).unwrap_err();
        let fields: Vec<_> = issues.iter().map(|i| i.field).collect();
        assert_eq!(issues.len(), 7, "{:?}", fields);
        assert!(fields.contains(&"dispatch.batch_size"));
        assert!(fields.contains(&"listener.bind_address"));
        assert!(fields.contains(&"platform.base_url"));
    }

    #[test]
    fn test_production_rejects_placeholders() {
        let mut config = RelayConfig::default();
        config.environment = Environment::Production;
        let issues = validate_config(&config).unwrap_err();
        assert_eq!(issues[0].field, "platform");

        config.platform.app_id = "cli_real".into();
        config.platform.app_secret = "real-secret".into();
        config.platform.chat_id = "oc_real".into();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_production_rejects_empty_secret() {
        let mut config = RelayConfig::default();
        config.environment = Environment::Production;
        config.platform.app_id = "cli_real".into();
        config.platform.app_secret = "  ".into();
        config.platform.chat_id = "oc_real".into();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = RelayConfig::default();
        config.observability.metrics_address = "bogus".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
