//! Submission orchestration.

use std::sync::Arc;

use axum::body::Bytes;

use crate::dispatch::DispatchQueue;
use crate::error::RelayError;
use crate::platform::{ImageUpload, UpstreamError};
use crate::relay::courier::Courier;
use crate::relay::message::RelayRequest;
use crate::security::AttachmentPolicy;
use crate::storage::{ResourceJanitor, UploadStore};

/// An image submitted with a message.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: String,
    pub bytes: Bytes,
}

/// How far a submission got before the client was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Text handed to the dispatch queue; delivery is not confirmed.
    Queued,
    /// Text and image both delivered.
    Sent,
}

/// Turns a validated submission into outbound sends.
pub struct RelayService {
    courier: Courier,
    queue: DispatchQueue,
    uploads: UploadStore,
    janitor: Arc<ResourceJanitor>,
    attachments: AttachmentPolicy,
}

impl RelayService {
    pub fn new(
        courier: Courier,
        queue: DispatchQueue,
        uploads: UploadStore,
        janitor: Arc<ResourceJanitor>,
        attachments: AttachmentPolicy,
    ) -> Self {
        Self {
            courier,
            queue,
            uploads,
            janitor,
            attachments,
        }
    }

    pub fn queue(&self) -> &DispatchQueue {
        &self.queue
    }

    pub fn courier(&self) -> &Courier {
        &self.courier
    }

    /// Relay one submission.
    ///
    /// Text-only submissions are queued and acknowledged immediately. With an
    /// image, the text goes first through the queue and is awaited; the image
    /// is uploaded and sent only after the text was delivered.
    pub async fn relay(
        &self,
        request: RelayRequest,
        attachment: Option<Attachment>,
    ) -> Result<Delivery, RelayError> {
        request.validate()?;
        if let Some(attachment) = &attachment {
            self.attachments
                .check(&attachment.file_name, attachment.bytes.len())?;
        }

        // Surface identity exchange failures to this client rather than to the
        // detached queue task.
        self.courier.credentials().ensure().await?;

        let text = request.format_text();
        match attachment {
            None => {
                self.queue.enqueue(self.courier.text_task(text))?;
                Ok(Delivery::Queued)
            }
            Some(attachment) => self.relay_with_image(text, attachment).await,
        }
    }

    async fn relay_with_image(&self, text: String, attachment: Attachment) -> Result<Delivery, RelayError> {
        let stored = match self.uploads.save(&attachment.file_name, &attachment.bytes).await {
            Ok(file) => Some(file),
            Err(e) => {
                tracing::warn!(error = %e, "Could not store upload, relaying from memory");
                None
            }
        };

        let outcome = self.deliver_text_then_image(text, attachment).await;

        if let Some(file) = &stored {
            self.janitor.reclaim(file).await;
        }
        outcome
    }

    async fn deliver_text_then_image(&self, text: String, attachment: Attachment) -> Result<Delivery, RelayError> {
        let receipt = self.queue.submit(self.courier.text_task(text))?;
        receipt
            .await
            .unwrap_or_else(|_| Err(UpstreamError::Aborted("text task dropped before completion".to_string())))?;

        let image = ImageUpload::new(attachment.file_name, attachment.bytes);
        self.courier
            .send_image(&image)
            .await
            .map_err(|source| RelayError::PartialDelivery { source })?;
        Ok(Delivery::Sent)
    }
}
