//! Error to response mapping.
//!
//! # Responsibilities
//! - Map relay failures to HTTP status codes and JSON bodies
//! - Attach `Retry-After` to rate-limited responses
//!
//! # Design Decisions
//! - A token rejection that survived the retry is reported as 401 so the
//!   client knows a resend is reasonable
//! - Upstream timeouts result in 504 Gateway Timeout, other upstream
//!   failures in 502
//! - Credential failures are the relay's own fault: 500

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::credentials::CredentialError;
use crate::error::RelayError;
use crate::platform::UpstreamError;
use crate::relay::ValidationError;

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match self {
            RelayError::Validation(e) => validation_response(&e),
            RelayError::RateLimited { retry_after } => {
                let secs = retry_after.as_secs_f64().ceil().max(1.0) as u64;
                let mut response = (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({
                        "error": "Too many requests",
                        "retry_after_secs": secs,
                    })),
                )
                    .into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(secs));
                response
            }
            RelayError::Credential(e) => credential_response(&e),
            RelayError::Upstream(e) => upstream_response(&e),
            RelayError::PartialDelivery { source } => (
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "error": "Partial delivery",
                    "text_sent": true,
                    "image_sent": false,
                    "detail": source.to_string(),
                })),
            )
                .into_response(),
            RelayError::Unavailable(e) => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": "Service is shutting down",
                    "detail": e.to_string(),
                })),
            )
                .into_response(),
        }
    }
}

fn validation_response(e: &ValidationError) -> Response {
    let status = match e {
        ValidationError::AttachmentTooLarge { .. } | ValidationError::PayloadTooLarge => {
            StatusCode::PAYLOAD_TOO_LARGE
        }
        ValidationError::UnsupportedContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        _ => StatusCode::BAD_REQUEST,
    };
    (status, Json(json!({ "error": e.to_string() }))).into_response()
}

fn credential_response(e: &CredentialError) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "Failed to obtain access token",
            "detail": e.to_string(),
        })),
    )
        .into_response()
}

fn upstream_response(e: &UpstreamError) -> Response {
    let (status, body): (StatusCode, Value) = match e {
        UpstreamError::Credential(inner) => return credential_response(inner),
        UpstreamError::Unauthorized => (
            StatusCode::UNAUTHORIZED,
            json!({ "error": "Token expired", "message": "Please try again" }),
        ),
        UpstreamError::Timeout(_) => (
            StatusCode::GATEWAY_TIMEOUT,
            json!({ "error": "Failed to send message", "detail": e.to_string() }),
        ),
        _ => (
            StatusCode::BAD_GATEWAY,
            json!({
                "error": "Failed to send message",
                "detail": e.to_string(),
                "upstream_status": e.upstream_status(),
            }),
        ),
    };
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::DispatchError;
    use std::time::Duration;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_missing_message_is_400() {
        let response = RelayError::from(ValidationError::MissingMessage).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Message is required");
    }

    #[tokio::test]
    async fn test_oversized_attachment_is_413() {
        let err = ValidationError::AttachmentTooLarge { size: 10, limit: 5 };
        let response = RelayError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_rate_limited_rounds_retry_after_up() {
        let response = RelayError::RateLimited {
            retry_after: Duration::from_millis(1500),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "2");
    }

    #[tokio::test]
    async fn test_credential_failure_is_500() {
        let response = RelayError::from(CredentialError::Transport("refused".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"], "Failed to obtain access token");

        let nested = UpstreamError::Credential(CredentialError::Malformed("no token".into()));
        let response = RelayError::from(nested).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_unauthorized_after_retry_is_401() {
        let response = RelayError::from(UpstreamError::Unauthorized).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Token expired");
        assert_eq!(body["message"], "Please try again");
    }

    #[tokio::test]
    async fn test_upstream_timeout_is_504_other_502() {
        let timeout = RelayError::from(UpstreamError::Timeout(Duration::from_secs(10))).into_response();
        assert_eq!(timeout.status(), StatusCode::GATEWAY_TIMEOUT);

        let status = UpstreamError::Status {
            status: 500,
            detail: "boom".into(),
        };
        let response = RelayError::from(status).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_json(response).await["upstream_status"], 500);
    }

    #[tokio::test]
    async fn test_partial_delivery_body() {
        let response = RelayError::PartialDelivery {
            source: UpstreamError::Transport("reset".into()),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Partial delivery");
        assert_eq!(body["text_sent"], true);
        assert_eq!(body["image_sent"], false);
    }

    #[tokio::test]
    async fn test_closed_queue_is_503() {
        let response = RelayError::from(DispatchError::Closed).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
