//! Relay target (chat platform) subsystem.
//!
//! # Data Flow
//! ```text
//! CredentialCache
//!     → TokenSource::exchange (identity exchange, app id/secret → tenant token)
//!
//! Courier (relay leg)
//!     → ChatApi::send_message (text or image message, bearer token)
//!     → ChatApi::upload_image (multipart image → opaque image key)
//! ```
//!
//! # Design Decisions
//! - Outbound calls sit behind two narrow traits so the resilience core can be
//!   exercised against in-process fakes
//! - HTTP 401 is reported as its own variant; everything else carries status/detail
//! - The concrete client is the only place that knows the platform's URLs

pub mod client;
pub mod error;
pub mod types;

use async_trait::async_trait;

use crate::credentials::CredentialError;

pub use client::PlatformClient;
pub use error::UpstreamError;
pub use types::{ImageKey, ImageUpload, MessageContent, MessageKind, OutboundMessage, TokenGrant};

/// Identity exchange capability: trades the application credentials for a
/// tenant access token.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn exchange(&self) -> Result<TokenGrant, CredentialError>;
}

/// Messaging capability of the relay target.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Send a text or image message to a chat.
    async fn send_message(&self, token: &str, message: &OutboundMessage) -> Result<(), UpstreamError>;

    /// Upload an image, returning the reference used by a later image message.
    async fn upload_image(&self, token: &str, image: &ImageUpload) -> Result<ImageKey, UpstreamError>;
}
