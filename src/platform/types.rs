//! Wire types for the relay target's open API.

use std::time::Duration;

use axum::body::Bytes;
use serde::{Deserialize, Serialize};

/// Result of a successful identity exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub token: String,
    /// Server-declared lifetime of the token.
    pub lifetime: Duration,
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("token", &"<redacted>")
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

/// Opaque reference to an uploaded image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageKey(pub String);

impl ImageKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Image bytes handed to the upload endpoint.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Bytes,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// MIME type guessed from the file extension.
    pub fn mime_type(&self) -> &'static str {
        let ext = self
            .file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "gif" => "image/gif",
            "webp" => "image/webp",
            "bmp" => "image/bmp",
            _ => "application/octet-stream",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text { text: String },
    Image { image_key: String },
}

/// Body of a message send call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub open_chat_id: String,
    pub msg_type: MessageKind,
    pub content: MessageContent,
}

impl OutboundMessage {
    pub fn text(chat_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            open_chat_id: chat_id.into(),
            msg_type: MessageKind::Text,
            content: MessageContent::Text { text: text.into() },
        }
    }

    pub fn image(chat_id: impl Into<String>, key: &ImageKey) -> Self {
        Self {
            open_chat_id: chat_id.into(),
            msg_type: MessageKind::Image,
            content: MessageContent::Image {
                image_key: key.0.clone(),
            },
        }
    }

    /// Text body, if this is a text message.
    pub fn text_content(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text { text } => Some(text),
            MessageContent::Image { .. } => None,
        }
    }
}

/// Identity exchange request body.
#[derive(Serialize)]
pub(crate) struct TokenRequest<'a> {
    pub app_id: &'a str,
    pub app_secret: &'a str,
}

/// Identity exchange response body.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    pub tenant_access_token: Option<String>,
    pub expire: Option<u64>,
}

/// Common `{code, msg, data}` envelope of the messaging endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiEnvelope<T> {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImageData {
    pub image_key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_message_wire_shape() {
        let msg = OutboundMessage::text("oc_chat", "Anonymous: hi");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "open_chat_id": "oc_chat",
                "msg_type": "text",
                "content": { "text": "Anonymous: hi" }
            })
        );
    }

    #[test]
    fn test_image_message_wire_shape() {
        let msg = OutboundMessage::image("oc_chat", &ImageKey("img_v2_abc".into()));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["msg_type"], "image");
        assert_eq!(json["content"]["image_key"], "img_v2_abc");
        assert!(msg.text_content().is_none());
    }

    #[test]
    fn test_mime_type_from_extension() {
        assert_eq!(ImageUpload::new("cat.PNG", Vec::new()).mime_type(), "image/png");
        assert_eq!(ImageUpload::new("a.jpeg", Vec::new()).mime_type(), "image/jpeg");
        assert_eq!(ImageUpload::new("noext", Vec::new()).mime_type(), "application/octet-stream");
    }

    #[test]
    fn test_token_grant_debug_redacts() {
        let grant = TokenGrant {
            token: "t-secret".into(),
            lifetime: Duration::from_secs(7200),
        };
        assert!(!format!("{:?}", grant).contains("t-secret"));
    }
}
