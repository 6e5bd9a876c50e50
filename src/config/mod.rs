//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (environment overrides: APP_ID, APP_SECRET, OPEN_CHAT_ID, RELAY_ENV, RELAY_BIND)
//!     → validation.rs (semantic checks)
//!     → RelayConfig (validated, immutable)
//!     → handed to startup, which builds every subsystem from it
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_defaults, ConfigError};
pub use schema::{
    DispatchConfig, Environment, ListenerConfig, LogFormat, ObservabilityConfig, PlatformConfig,
    RateLimitConfig, RelayConfig, TimeoutConfig, UploadConfig,
};
pub use validation::{validate_config, ConfigIssue};
