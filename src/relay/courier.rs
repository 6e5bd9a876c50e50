//! Authorized outbound calls to the relay target.

use std::sync::Arc;
use std::time::Duration;

use crate::credentials::CredentialCache;
use crate::dispatch::DispatchTask;
use crate::platform::{ChatApi, ImageKey, ImageUpload, OutboundMessage, UpstreamError};
use crate::resilience::retries::retry_on_unauthorized;
use crate::resilience::timeouts::with_deadline;

/// Sends messages to the configured chat with a cached credential, a
/// per-call deadline and one retry after a token rejection.
#[derive(Clone)]
pub struct Courier {
    credentials: Arc<CredentialCache>,
    api: Arc<dyn ChatApi>,
    chat_id: Arc<str>,
    call_timeout: Duration,
}

impl Courier {
    pub fn new(
        credentials: Arc<CredentialCache>,
        api: Arc<dyn ChatApi>,
        chat_id: impl Into<Arc<str>>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            credentials,
            api,
            chat_id: chat_id.into(),
            call_timeout,
        }
    }

    pub fn credentials(&self) -> &Arc<CredentialCache> {
        &self.credentials
    }

    pub async fn send_text(&self, text: &str) -> Result<(), UpstreamError> {
        let message = OutboundMessage::text(&*self.chat_id, text);
        self.send(&message, "send_text").await
    }

    /// Upload the image, then post it as an image message.
    pub async fn send_image(&self, image: &ImageUpload) -> Result<ImageKey, UpstreamError> {
        let timeout = self.call_timeout;
        let key = retry_on_unauthorized(&self.credentials, "upload_image", |credential| {
            let api = self.api.clone();
            async move { with_deadline(timeout, api.upload_image(credential.token(), image)).await }
        })
        .await?;
        tracing::debug!(image_key = %key.as_str(), "Image uploaded");

        let message = OutboundMessage::image(&*self.chat_id, &key);
        self.send(&message, "send_image").await?;
        Ok(key)
    }

    async fn send(&self, message: &OutboundMessage, operation: &'static str) -> Result<(), UpstreamError> {
        let timeout = self.call_timeout;
        retry_on_unauthorized(&self.credentials, operation, |credential| {
            let api = self.api.clone();
            async move { with_deadline(timeout, api.send_message(credential.token(), message)).await }
        })
        .await
    }

    /// A queue task that delivers `text` to the chat.
    pub fn text_task(&self, text: String) -> DispatchTask {
        let courier = self.clone();
        DispatchTask::new("send_text", move || async move { courier.send_text(&text).await })
    }
}
