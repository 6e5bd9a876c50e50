//! Attachment limits.
//!
//! # Responsibilities
//! - Enforce maximum attachment size
//! - Restrict attachments to common image extensions
//!
//! # Design Decisions
//! - Checked before anything touches disk or the upstream API
//! - Oversized payloads map to 413, wrong types to 400

use crate::config::UploadConfig;
use crate::relay::ValidationError;

/// Size and type rules for the single image attachment.
#[derive(Debug, Clone)]
pub struct AttachmentPolicy {
    pub max_bytes: usize,
    allowed_extensions: Vec<String>,
}

impl AttachmentPolicy {
    pub fn new(max_bytes: usize, allowed_extensions: &[String]) -> Self {
        Self {
            max_bytes,
            allowed_extensions: allowed_extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(config.max_bytes, &config.allowed_extensions)
    }

    pub fn check(&self, file_name: &str, size: usize) -> Result<(), ValidationError> {
        if size > self.max_bytes {
            return Err(ValidationError::AttachmentTooLarge {
                size,
                limit: self.max_bytes,
            });
        }
        if size == 0 {
            return Err(ValidationError::EmptyAttachment);
        }

        let ext = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        if !self.allowed_extensions.iter().any(|allowed| *allowed == ext) {
            return Err(ValidationError::UnsupportedAttachment {
                file_name: file_name.to_string(),
            });
        }
        Ok(())
    }
}
