//! Route handlers.
//!
//! # Responsibilities
//! - Liveness text and health summary
//! - Parse `/sendMessage` submissions (multipart form or JSON)
//! - Hand submissions to the relay service and shape the response
//!
//! # Design Decisions
//! - Body parsing failures are validation errors, never 500s
//! - The multipart file field is `image`; at most one is accepted
//! - A file part with neither name nor content (empty form input) is ignored
//! - JSON bodies are capped at 1 MiB; multipart bodies by the route body limit

use axum::{
    extract::{multipart::MultipartError, FromRequest, Multipart, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use crate::error::RelayError;
use crate::http::request::RequestIdExt;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::relay::{Attachment, Delivery, RelayRequest, ValidationError};

const IMAGE_FIELD: &str = "image";
const JSON_BODY_LIMIT: usize = 1024 * 1024;

pub async fn alive() -> &'static str {
    "Bot is alive!"
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub queue_depth: usize,
    pub credential_cached: bool,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    let status = if state.relay.queue().is_closed() {
        "shutting_down"
    } else {
        "ok"
    };
    Json(HealthStatus {
        status,
        version: env!("CARGO_PKG_VERSION"),
        queue_depth: state.relay.queue().depth(),
        credential_cached: state.relay.courier().credentials().has_valid(),
    })
}

pub async fn send_message(State(state): State<AppState>, request: Request) -> Response {
    let request_id = request.request_id().unwrap_or_default().to_string();

    let outcome = match read_submission(&state, request).await {
        Ok((fields, attachment)) => {
            let has_image = attachment.is_some();
            tracing::debug!(request_id = %request_id, has_image, "Submission received");
            state.relay.relay(fields, attachment).await
        }
        Err(e) => Err(e),
    };

    match outcome {
        Ok(Delivery::Queued) => {
            metrics::record_request("queued");
            tracing::info!(request_id = %request_id, "Message queued");
            (
                StatusCode::ACCEPTED,
                Json(json!({ "message": "Message queued", "request_id": request_id })),
            )
                .into_response()
        }
        Ok(Delivery::Sent) => {
            metrics::record_request("sent");
            tracing::info!(request_id = %request_id, "Message and image sent");
            (
                StatusCode::OK,
                Json(json!({ "message": "Message sent successfully!" })),
            )
                .into_response()
        }
        Err(e) => {
            metrics::record_request(e.outcome());
            match &e {
                RelayError::Validation(_) => {
                    tracing::info!(request_id = %request_id, error = %e, "Submission rejected")
                }
                _ => tracing::error!(request_id = %request_id, error = %e, "Submission failed"),
            }
            e.into_response()
        }
    }
}

async fn read_submission(
    state: &AppState,
    request: Request,
) -> Result<(RelayRequest, Option<Attachment>), RelayError> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, state)
            .await
            .map_err(|e| ValidationError::Malformed(e.body_text()))?;
        read_multipart(multipart).await
    } else if content_type.starts_with("application/json") {
        let body = axum::body::to_bytes(request.into_body(), JSON_BODY_LIMIT)
            .await
            .map_err(|_| ValidationError::PayloadTooLarge)?;
        let fields: RelayRequest = serde_json::from_slice(&body)
            .map_err(|e| ValidationError::Malformed(e.to_string()))?;
        Ok((fields, None))
    } else {
        Err(ValidationError::UnsupportedContentType(content_type).into())
    }
}

async fn read_multipart(
    mut multipart: Multipart,
) -> Result<(RelayRequest, Option<Attachment>), RelayError> {
    let mut fields = RelayRequest::default();
    let mut attachment = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == IMAGE_FIELD {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await.map_err(multipart_error)?;
            if file_name.is_empty() && bytes.is_empty() {
                continue;
            }
            if attachment.is_some() {
                return Err(ValidationError::TooManyAttachments.into());
            }
            attachment = Some(Attachment { file_name, bytes });
        } else {
            let value = field.text().await.map_err(multipart_error)?;
            fields.set_field(&name, value);
        }
    }

    Ok((fields, attachment))
}

fn multipart_error(e: MultipartError) -> RelayError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ValidationError::PayloadTooLarge.into()
    } else {
        ValidationError::Malformed(e.body_text()).into()
    }
}
