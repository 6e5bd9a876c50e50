//! Platform client wire tests against a mock open API.

use std::time::Duration;

use httpmock::prelude::*;
use serde_json::json;

use chat_relay::config::PlatformConfig;
use chat_relay::credentials::CredentialError;
use chat_relay::platform::{
    ChatApi, ImageKey, ImageUpload, OutboundMessage, PlatformClient, TokenSource, UpstreamError,
};

const TOKEN_PATH: &str = "/open-apis/auth/v3/tenant_access_token/internal";
const SEND_PATH: &str = "/open-apis/message/v3/send";
const IMAGE_PATH: &str = "/open-apis/im/v1/images";

fn client_for(server: &MockServer) -> PlatformClient {
    let config = PlatformConfig {
        base_url: server.base_url(),
        app_id: "cli_test".into(),
        app_secret: "test-secret".into(),
        chat_id: "oc_test".into(),
        request_timeout_secs: 1,
        ..PlatformConfig::default()
    };
    PlatformClient::new(&config).unwrap()
}

#[tokio::test]
async fn test_exchange_returns_token_and_lifetime() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(TOKEN_PATH)
                .json_body(json!({ "app_id": "cli_test", "app_secret": "test-secret" }));
            then.status(200).header("content-type", "application/json").json_body(json!({
                "code": 0,
                "msg": "ok",
                "tenant_access_token": "t-abc",
                "expire": 7200
            }));
        })
        .await;

    let grant = client_for(&server).exchange().await.unwrap();
    assert_eq!(grant.token, "t-abc");
    assert_eq!(grant.lifetime, Duration::from_secs(7200));
    mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn test_exchange_nonzero_code_is_rejected() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(TOKEN_PATH);
            then.status(200)
                .json_body(json!({ "code": 10014, "msg": "app secret invalid" }));
        })
        .await;

    let err = client_for(&server).exchange().await.unwrap_err();
    match err {
        CredentialError::Rejected { code, msg } => {
            assert_eq!(code, 10014);
            assert_eq!(msg, "app secret invalid");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_exchange_without_expire_is_malformed() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(TOKEN_PATH);
            then.status(200)
                .json_body(json!({ "code": 0, "msg": "ok", "tenant_access_token": "t-abc" }));
        })
        .await;

    let err = client_for(&server).exchange().await.unwrap_err();
    assert!(matches!(err, CredentialError::Malformed(_)), "{err:?}");
}

#[tokio::test]
async fn test_exchange_server_error_is_status() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(TOKEN_PATH);
            then.status(503).body("maintenance");
        })
        .await;

    let err = client_for(&server).exchange().await.unwrap_err();
    match err {
        CredentialError::Status { status, detail } => {
            assert_eq!(status, 503);
            assert_eq!(detail, "maintenance");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_send_text_posts_bearer_and_body() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(SEND_PATH)
                .header("authorization", "Bearer t-abc")
                .json_body(json!({
                    "open_chat_id": "oc_test",
                    "msg_type": "text",
                    "content": { "text": "Anonymous: hi" }
                }));
            then.status(200).json_body(json!({ "code": 0, "msg": "ok", "data": {} }));
        })
        .await;

    let message = OutboundMessage::text("oc_test", "Anonymous: hi");
    client_for(&server).send_message("t-abc", &message).await.unwrap();
    mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn test_send_image_body_shape() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path(SEND_PATH).json_body(json!({
                "open_chat_id": "oc_test",
                "msg_type": "image",
                "content": { "image_key": "img_v2_1" }
            }));
            then.status(200).json_body(json!({ "code": 0, "msg": "ok" }));
        })
        .await;

    let message = OutboundMessage::image("oc_test", &ImageKey("img_v2_1".into()));
    client_for(&server).send_message("t-abc", &message).await.unwrap();
    mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn test_send_401_is_unauthorized() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(SEND_PATH);
            then.status(401).json_body(json!({ "code": 99991663, "msg": "token expired" }));
        })
        .await;

    let message = OutboundMessage::text("oc_test", "hi");
    let err = client_for(&server).send_message("stale", &message).await.unwrap_err();
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn test_send_business_error_is_rejected() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(SEND_PATH);
            then.status(200).json_body(json!({ "code": 230002, "msg": "bot not in chat" }));
        })
        .await;

    let message = OutboundMessage::text("oc_test", "hi");
    let err = client_for(&server).send_message("t-abc", &message).await.unwrap_err();
    assert!(matches!(err, UpstreamError::Rejected { code: 230002, .. }), "{err:?}");
}

#[tokio::test]
async fn test_slow_upstream_times_out() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(SEND_PATH);
            then.status(200)
                .delay(Duration::from_millis(1500))
                .json_body(json!({ "code": 0, "msg": "ok" }));
        })
        .await;

    let message = OutboundMessage::text("oc_test", "hi");
    let err = client_for(&server).send_message("t-abc", &message).await.unwrap_err();
    assert!(matches!(err, UpstreamError::Timeout(_)), "{err:?}");
}

#[tokio::test]
async fn test_upload_returns_image_key() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(IMAGE_PATH)
                .header("authorization", "Bearer t-abc");
            then.status(200).json_body(json!({
                "code": 0,
                "msg": "success",
                "data": { "image_key": "img_v2_abc" }
            }));
        })
        .await;

    let image = ImageUpload::new("cat.png", b"\x89PNG".to_vec());
    let key = client_for(&server).upload_image("t-abc", &image).await.unwrap();
    assert_eq!(key.as_str(), "img_v2_abc");
    mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn test_upload_without_key_is_malformed() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(IMAGE_PATH);
            then.status(200).json_body(json!({ "code": 0, "msg": "success", "data": {} }));
        })
        .await;

    let image = ImageUpload::new("cat.png", b"\x89PNG".to_vec());
    let err = client_for(&server).upload_image("t-abc", &image).await.unwrap_err();
    assert!(matches!(err, UpstreamError::Malformed(_)), "{err:?}");
}
