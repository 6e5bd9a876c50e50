//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Placeholder credentials used in development when none are configured.
pub const PLACEHOLDER_APP_ID: &str = "cli_placeholder_app_id";
pub const PLACEHOLDER_APP_SECRET: &str = "placeholder_app_secret";
pub const PLACEHOLDER_CHAT_ID: &str = "oc_placeholder_chat_id";

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Deployment environment. Production refuses placeholder credentials.
    pub environment: Environment,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Relay target endpoint and credentials.
    pub platform: PlatformConfig,

    /// Inbound request timeout.
    pub timeouts: TimeoutConfig,

    /// Per-client admission control.
    pub rate_limit: RateLimitConfig,

    /// Outbound dispatch pacing.
    pub dispatch: DispatchConfig,

    /// Attachment limits and temporary storage.
    pub uploads: UploadConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment '{}'", other)),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
        }
    }
}

/// Relay target configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Open platform base URL.
    pub base_url: String,

    /// Application identity for the token exchange.
    pub app_id: String,

    /// Application secret for the token exchange.
    pub app_secret: String,

    /// Group chat every message is relayed to.
    pub chat_id: String,

    /// Timeout for each outbound call in seconds.
    pub request_timeout_secs: u64,

    /// How long before the declared expiry a token stops being used.
    pub token_margin_secs: u64,
}

impl PlatformConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn token_margin(&self) -> Duration {
        Duration::from_secs(self.token_margin_secs)
    }

    /// Whether any credential field is empty or still a placeholder.
    pub fn has_placeholder_credentials(&self) -> bool {
        [
            (self.app_id.as_str(), PLACEHOLDER_APP_ID),
            (self.app_secret.as_str(), PLACEHOLDER_APP_SECRET),
            (self.chat_id.as_str(), PLACEHOLDER_CHAT_ID),
        ]
        .iter()
        .any(|(value, placeholder)| value.trim().is_empty() || value == placeholder)
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_url: "https://open.feishu.cn".to_string(),
            app_id: PLACEHOLDER_APP_ID.to_string(),
            // WARNING: This is a placeholder! Set APP_SECRET in production.
            app_secret: PLACEHOLDER_APP_SECRET.to_string(),
            chat_id: PLACEHOLDER_CHAT_ID.to_string(),
            request_timeout_secs: 10,
            token_margin_secs: 30,
        }
    }
}

impl std::fmt::Debug for PlatformConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformConfig")
            .field("base_url", &self.base_url)
            .field("app_id", &self.app_id)
            .field("app_secret", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("token_margin_secs", &self.token_margin_secs)
            .finish()
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time allowed for one inbound request in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Sliding-window rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable admission control on `/sendMessage`.
    pub enabled: bool,

    /// Window length in milliseconds.
    pub window_ms: u64,

    /// Requests admitted per client within one window.
    pub max_requests: usize,

    /// How often idle client windows are dropped.
    pub sweep_interval_secs: u64,

    /// Key clients by the first `X-Forwarded-For` hop instead of the peer.
    pub trust_forwarded_for: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_ms: 60_000,
            max_requests: 30,
            sweep_interval_secs: 60,
            trust_forwarded_for: false,
        }
    }
}

/// Dispatch queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Tasks run concurrently per batch.
    pub batch_size: usize,

    /// Pause between batches in milliseconds.
    pub pacing_ms: u64,

    /// Upper bound on draining queued tasks at shutdown.
    pub drain_timeout_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            pacing_ms: 200,
            drain_timeout_secs: 10,
        }
    }
}

/// Upload storage and attachment limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Directory holding uploads while they are relayed.
    pub dir: String,

    /// Age after which a leftover upload is deleted, in milliseconds.
    pub ttl_ms: u64,

    /// How often the upload directory is swept, in milliseconds.
    pub sweep_interval_ms: u64,

    /// Largest accepted attachment in bytes.
    pub max_bytes: usize,

    /// Accepted file extensions, lowercase without the dot.
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: "uploads".to_string(),
            ttl_ms: 3_600_000,
            sweep_interval_ms: 3_600_000,
            max_bytes: 5 * 1024 * 1024,
            allowed_extensions: ["jpg", "jpeg", "png", "gif", "webp", "bmp"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
