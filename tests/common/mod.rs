//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use chat_relay::config::RelayConfig;
use chat_relay::credentials::CredentialError;
use chat_relay::lifecycle::{self, StartupError};
use chat_relay::platform::{
    ChatApi, ImageKey, ImageUpload, MessageKind, OutboundMessage, TokenGrant, TokenSource,
    UpstreamError,
};

/// In-process stand-in for the relay target.
///
/// Tokens are issued as `t-<n>`. Failure switches make individual calls fail.
#[derive(Default)]
pub struct FakePlatform {
    pub exchanges: AtomicUsize,
    pub uploads: AtomicUsize,
    pub fail_exchange: AtomicBool,
    pub fail_text: AtomicBool,
    pub fail_upload: AtomicBool,
    /// The next N sends answer 401.
    pub unauthorized_sends: AtomicUsize,
    sent: Mutex<Vec<(String, OutboundMessage)>>,
}

impl FakePlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, message)| message.clone())
            .collect()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent()
            .iter()
            .filter_map(|m| m.text_content().map(str::to_string))
            .collect()
    }

    pub fn tokens_used(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(token, _)| token.clone())
            .collect()
    }

    /// Wait until at least `count` messages were delivered.
    pub async fn wait_for_sent(&self, count: usize) -> Vec<OutboundMessage> {
        for _ in 0..200 {
            let sent = self.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {} delivered messages, got {:?}", count, self.sent());
    }
}

#[async_trait]
impl TokenSource for FakePlatform {
    async fn exchange(&self) -> Result<TokenGrant, CredentialError> {
        let n = self.exchanges.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_exchange.load(Ordering::SeqCst) {
            return Err(CredentialError::Rejected {
                code: 10003,
                msg: "invalid app_secret".into(),
            });
        }
        Ok(TokenGrant {
            token: format!("t-{}", n),
            lifetime: Duration::from_secs(7200),
        })
    }
}

#[async_trait]
impl ChatApi for FakePlatform {
    async fn send_message(&self, token: &str, message: &OutboundMessage) -> Result<(), UpstreamError> {
        let pending = self.unauthorized_sends.load(Ordering::SeqCst);
        if pending > 0 {
            self.unauthorized_sends.store(pending - 1, Ordering::SeqCst);
            return Err(UpstreamError::Unauthorized);
        }
        if message.msg_type == MessageKind::Text && self.fail_text.load(Ordering::SeqCst) {
            return Err(UpstreamError::Status {
                status: 500,
                detail: "internal error".into(),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((token.to_string(), message.clone()));
        Ok(())
    }

    async fn upload_image(&self, _token: &str, image: &ImageUpload) -> Result<ImageKey, UpstreamError> {
        let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_upload.load(Ordering::SeqCst) {
            return Err(UpstreamError::Transport("connection reset".into()));
        }
        Ok(ImageKey(format!("img-{}-{}", n, image.file_name)))
    }
}

/// Config for a relay bound to an ephemeral port with fast pacing.
pub fn test_config(upload_dir: &Path) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.platform.chat_id = "oc_test".into();
    config.dispatch.pacing_ms = 10;
    config.uploads.dir = upload_dir.display().to_string();
    config
}

/// A relay running in the background of a test.
pub struct TestRelay {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    stop: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<Result<(), StartupError>>>,
}

impl TestRelay {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Signal shutdown and wait for the relay to drain and exit.
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.await.unwrap().unwrap();
        }
    }
}

impl Drop for TestRelay {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

pub async fn spawn_relay(config: RelayConfig, platform: Arc<FakePlatform>) -> TestRelay {
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let services = lifecycle::build(config, platform).await.unwrap();

    let (tx, rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(services.serve(listener, async move {
        let _ = rx.await;
    }));

    TestRelay {
        addr,
        client: reqwest::Client::new(),
        stop: Some(tx),
        handle: Some(handle),
    }
}

/// Number of files left in the upload directory.
pub fn files_in(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| entries.filter_map(Result::ok).count())
        .unwrap_or(0)
}
