//! HTTP client for the relay target's open API.
//!
//! # Responsibilities
//! - Identity exchange (app id/secret → tenant access token)
//! - Message send (text/image)
//! - Image upload (multipart)
//! - Map transport, status and envelope failures to typed errors
//!
//! # Design Decisions
//! - One pooled `reqwest::Client` with a hard per-call timeout
//! - Bodies of failed calls are passed through as a bounded preview

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use url::Url;

use crate::config::schema::PlatformConfig;
use crate::config::ConfigError;
use crate::credentials::CredentialError;
use crate::platform::error::UpstreamError;
use crate::platform::types::{
    ApiEnvelope, ImageData, ImageKey, ImageUpload, OutboundMessage, TokenGrant, TokenRequest,
    TokenResponse,
};
use crate::platform::{ChatApi, TokenSource};

const TOKEN_PATH: &str = "/open-apis/auth/v3/tenant_access_token/internal";
const SEND_PATH: &str = "/open-apis/message/v3/send";
const IMAGE_PATH: &str = "/open-apis/im/v1/images";

/// Image type marker expected by the upload endpoint.
const IMAGE_TYPE_MESSAGE: &str = "message";

const DETAIL_PREVIEW_CHARS: usize = 512;

/// Client for the relay target. Implements both [`TokenSource`] and [`ChatApi`].
#[derive(Clone)]
pub struct PlatformClient {
    http: reqwest::Client,
    base_url: Url,
    app_id: String,
    app_secret: String,
    timeout: Duration,
}

impl PlatformClient {
    pub fn new(config: &PlatformConfig) -> Result<Self, ConfigError> {
        let base_url: Url = config
            .base_url
            .parse()
            .map_err(|e| ConfigError::Client(format!("invalid base_url '{}': {}", config.base_url, e)))?;
        let timeout = Duration::from_secs(config.request_timeout_secs);

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("chat-relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            app_id: config.app_id.clone(),
            app_secret: config.app_secret.clone(),
            timeout,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(path)
    }

    fn transport_error(&self, err: reqwest::Error) -> UpstreamError {
        if err.is_timeout() {
            UpstreamError::Timeout(self.timeout)
        } else {
            UpstreamError::Transport(err.to_string())
        }
    }

    /// Map HTTP status and the `{code, msg, data}` envelope to a result.
    async fn read_envelope<T>(&self, response: Response) -> Result<ApiEnvelope<T>, UpstreamError>
    where
        T: serde::de::DeserializeOwned,
    {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(UpstreamError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                detail: preview(&body),
            });
        }

        let envelope: ApiEnvelope<T> = response.json().await.map_err(|e| {
            if e.is_timeout() {
                UpstreamError::Timeout(self.timeout)
            } else {
                UpstreamError::Malformed(e.to_string())
            }
        })?;

        if envelope.code != 0 {
            return Err(UpstreamError::Rejected {
                code: envelope.code,
                msg: envelope.msg,
            });
        }
        Ok(envelope)
    }
}

#[async_trait]
impl TokenSource for PlatformClient {
    async fn exchange(&self) -> Result<TokenGrant, CredentialError> {
        let url = self
            .endpoint(TOKEN_PATH)
            .map_err(|e| CredentialError::Transport(e.to_string()))?;

        let response = self
            .http
            .post(url)
            .json(&TokenRequest {
                app_id: &self.app_id,
                app_secret: &self.app_secret,
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CredentialError::Timeout(self.timeout)
                } else {
                    CredentialError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CredentialError::Status {
                status: status.as_u16(),
                detail: preview(&body),
            });
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| CredentialError::Malformed(e.to_string()))?;

        if body.code != 0 {
            return Err(CredentialError::Rejected {
                code: body.code,
                msg: body.msg,
            });
        }

        match (body.tenant_access_token, body.expire) {
            (Some(token), Some(expire)) if !token.is_empty() => Ok(TokenGrant {
                token,
                lifetime: Duration::from_secs(expire),
            }),
            _ => Err(CredentialError::Malformed(
                "response lacks tenant_access_token or expire".to_string(),
            )),
        }
    }
}

#[async_trait]
impl ChatApi for PlatformClient {
    async fn send_message(&self, token: &str, message: &OutboundMessage) -> Result<(), UpstreamError> {
        let url = self
            .endpoint(SEND_PATH)
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(message)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        self.read_envelope::<serde_json::Value>(response).await?;
        Ok(())
    }

    async fn upload_image(&self, token: &str, image: &ImageUpload) -> Result<ImageKey, UpstreamError> {
        let url = self
            .endpoint(IMAGE_PATH)
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        let part = Part::bytes(image.bytes.to_vec())
            .file_name(image.file_name.clone())
            .mime_str(image.mime_type())
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;
        let form = Form::new()
            .text("image_type", IMAGE_TYPE_MESSAGE)
            .part("image", part);

        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let envelope = self.read_envelope::<ImageData>(response).await?;
        envelope
            .data
            .map(|data| ImageKey(data.image_key))
            .filter(|key| !key.0.is_empty())
            .ok_or_else(|| UpstreamError::Malformed("upload response lacks data.image_key".to_string()))
    }
}

fn preview(body: &str) -> String {
    match body.char_indices().nth(DETAIL_PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
