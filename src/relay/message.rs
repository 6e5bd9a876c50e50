//! Inbound submission fields and their text rendering.

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_ALIAS: &str = "Anonymous";

/// Client input rejected before any side effect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Message is required")]
    MissingMessage,

    #[error("attachment of {size} bytes exceeds the {limit} byte limit")]
    AttachmentTooLarge { size: usize, limit: usize },

    #[error("request body exceeds the size limit")]
    PayloadTooLarge,

    #[error("unsupported attachment type: {file_name}")]
    UnsupportedAttachment { file_name: String },

    #[error("attachment is empty")]
    EmptyAttachment,

    #[error("only one attachment is accepted")]
    TooManyAttachments,

    #[error("malformed request body: {0}")]
    Malformed(String),

    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),
}

/// Fields a client submits with a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RelayRequest {
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub reply_to: Option<String>,
    #[serde(default)]
    pub queue: Option<String>,
}

impl RelayRequest {
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Assign a named form field. Unknown names are ignored.
    pub fn set_field(&mut self, name: &str, value: String) {
        let slot = match name {
            "alias" => &mut self.alias,
            "message" => &mut self.message,
            "video_id" => &mut self.video_id,
            "link" => &mut self.link,
            "reply_to" => &mut self.reply_to,
            "queue" => &mut self.queue,
            _ => return,
        };
        *slot = Some(value);
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.message.as_deref() {
            Some(message) if !message.trim().is_empty() => Ok(()),
            _ => Err(ValidationError::MissingMessage),
        }
    }

    pub fn alias(&self) -> &str {
        self.alias
            .as_deref()
            .map(str::trim)
            .filter(|alias| !alias.is_empty())
            .unwrap_or(DEFAULT_ALIAS)
    }

    /// Render the chat text:
    ///
    /// ```text
    /// <alias>[ → @<reply_to>]: <message>
    /// Link: <link>
    /// Video ID: <video_id>
    /// Queue: <queue>
    /// ```
    pub fn format_text(&self) -> String {
        let mut text = String::from(self.alias());

        if let Some(reply_to) = non_blank(&self.reply_to) {
            text.push_str(" → @");
            text.push_str(reply_to.trim());
        }
        text.push_str(": ");
        text.push_str(self.message.as_deref().unwrap_or_default());

        if let Some(link) = non_blank(&self.link) {
            text.push_str("\nLink: ");
            text.push_str(link);
        }
        if let Some(video_id) = non_blank(&self.video_id) {
            text.push_str("\nVideo ID: ");
            text.push_str(video_id);
        }
        if let Some(queue) = non_blank(&self.queue) {
            text.push_str("\nQueue: ");
            text.push_str(queue);
        }
        text
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_anonymous() {
        assert_eq!(RelayRequest::with_message("hi").format_text(), "Anonymous: hi");
    }

    #[test]
    fn test_blank_alias_falls_back() {
        let mut req = RelayRequest::with_message("hi");
        req.alias = Some("   ".into());
        assert_eq!(req.format_text(), "Anonymous: hi");
    }

    #[test]
    fn test_link_line_appended() {
        let mut req = RelayRequest::with_message("hi");
        req.link = Some("http://x".into());
        assert_eq!(req.format_text(), "Anonymous: hi\nLink: http://x");
    }

    #[test]
    fn test_reply_to_prefixes_alias_segment() {
        let mut req = RelayRequest::with_message("hi");
        req.alias = Some("alice".into());
        req.reply_to = Some("bob".into());
        assert_eq!(req.format_text(), "alice → @bob: hi");
    }

    #[test]
    fn test_blank_reply_to_and_queue_are_skipped() {
        let mut req = RelayRequest::with_message("hi");
        req.reply_to = Some(" ".into());
        req.queue = Some("  ".into());
        assert_eq!(req.format_text(), "Anonymous: hi");
    }

    #[test]
    fn test_all_optional_lines_in_order() {
        let mut req = RelayRequest::with_message("watch this");
        req.set_field("alias", "carol".into());
        req.set_field("link", "https://v.example/1".into());
        req.set_field("video_id", "v123".into());
        req.set_field("queue", "night".into());
        req.set_field("unknown", "ignored".into());
        assert_eq!(
            req.format_text(),
            "carol: watch this\nLink: https://v.example/1\nVideo ID: v123\nQueue: night"
        );
    }

    #[test]
    fn test_message_is_required() {
        assert_eq!(RelayRequest::default().validate(), Err(ValidationError::MissingMessage));
        assert_eq!(
            RelayRequest::with_message("  ").validate(),
            Err(ValidationError::MissingMessage)
        );
        assert!(RelayRequest::with_message("hi").validate().is_ok());
    }

    #[test]
    fn test_deserializes_json_body() {
        let req: RelayRequest =
            serde_json::from_str(r#"{"message":"hi","reply_to":"bob","extra":1}"#).unwrap();
        assert_eq!(req.message.as_deref(), Some("hi"));
        assert_eq!(req.reply_to.as_deref(), Some("bob"));
        assert!(req.alias.is_none());
    }
}
