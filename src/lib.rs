//! Chat relay library.
//!
//! Accepts anonymous submissions over HTTP and relays them to one group chat
//! on the Feishu open platform, shielding the upstream from bursts.

pub mod config;
pub mod credentials;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod platform;
pub mod relay;
pub mod resilience;
pub mod security;
pub mod storage;

pub use config::schema::RelayConfig;
pub use error::RelayError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
