//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize all subsystems in dependency order
//! - Start background tasks (token warm-up, dispatch worker, janitor, sweeper)
//! - Bind the HTTP surface last and drain everything on stop
//!
//! # Design Decisions
//! - Fail fast: an upload directory that cannot be created is fatal
//! - A failed token warm-up is only logged; the first request retries it
//! - Listeners start last (traffic only when ready)
//! - Stop order: HTTP stops accepting, queue closes, background loops drain

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::config::{ConfigError, RelayConfig};
use crate::credentials::CredentialCache;
use crate::dispatch::{DispatchQueue, DispatchWorker};
use crate::http::HttpServer;
use crate::lifecycle::Shutdown;
use crate::platform::{ChatApi, PlatformClient, TokenSource};
use crate::relay::{Courier, RelayService};
use crate::security::{AdmissionController, AttachmentPolicy};
use crate::storage::{FileError, ResourceJanitor, UploadStore};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] FileError),

    #[error("listener error: {0}")]
    Io(#[from] std::io::Error),
}

/// Every long-lived component, wired but not yet running.
pub struct Services {
    pub config: RelayConfig,
    pub relay: Arc<RelayService>,
    pub admission: Arc<AdmissionController>,
    pub janitor: Arc<ResourceJanitor>,
    pub credentials: Arc<CredentialCache>,
    worker: DispatchWorker,
}

/// Build services against the real relay target.
pub async fn bootstrap(config: RelayConfig) -> Result<Services, StartupError> {
    let platform = Arc::new(PlatformClient::new(&config.platform)?);
    build(config, platform).await
}

/// Build services against any platform implementation.
pub async fn build<P>(config: RelayConfig, platform: Arc<P>) -> Result<Services, StartupError>
where
    P: TokenSource + ChatApi + 'static,
{
    let uploads = UploadStore::new(&config.uploads.dir);
    uploads.ensure_dir().await?;

    let credentials = Arc::new(CredentialCache::new(
        platform.clone() as Arc<dyn TokenSource>,
        config.platform.token_margin(),
        config.platform.request_timeout(),
    ));
    let courier = Courier::new(
        credentials.clone(),
        platform as Arc<dyn ChatApi>,
        config.platform.chat_id.as_str(),
        config.platform.request_timeout(),
    );

    let (queue, worker) = DispatchQueue::from_config(&config.dispatch);
    let janitor = Arc::new(ResourceJanitor::new(
        uploads.dir(),
        Duration::from_millis(config.uploads.ttl_ms),
        Duration::from_millis(config.uploads.sweep_interval_ms),
    ));
    let admission = Arc::new(AdmissionController::from_config(&config.rate_limit));

    let relay = Arc::new(RelayService::new(
        courier,
        queue,
        uploads,
        janitor.clone(),
        AttachmentPolicy::from_config(&config.uploads),
    ));

    tracing::info!(
        chat_id = %config.platform.chat_id,
        upload_dir = %config.uploads.dir,
        batch_size = config.dispatch.batch_size,
        pacing_ms = config.dispatch.pacing_ms,
        "Relay services initialized"
    );

    Ok(Services {
        config,
        relay,
        admission,
        janitor,
        credentials,
        worker,
    })
}

impl Services {
    /// Run until `signal` resolves, then stop in order and wait for the
    /// background loops to finish.
    pub async fn serve<F>(self, listener: TcpListener, signal: F) -> Result<(), StartupError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Services {
            config,
            relay,
            admission,
            janitor,
            credentials,
            worker,
        } = self;

        let shutdown = Shutdown::new();
        warm_up(credentials);

        let mut tasks: Vec<JoinHandle<()>> = Vec::with_capacity(3);
        tasks.push(tokio::spawn(worker.run(shutdown.subscribe())));
        tasks.push(tokio::spawn(janitor.run(shutdown.subscribe())));
        if config.rate_limit.enabled {
            let interval = Duration::from_secs(config.rate_limit.sweep_interval_secs);
            tasks.push(tokio::spawn(
                admission.clone().run_sweeper(interval, shutdown.subscribe()),
            ));
        }

        let queue = relay.queue().clone();
        let server = HttpServer::new(&config, relay, admission);
        let served = server.run(listener, signal).await;

        queue.shutdown();
        shutdown.trigger();
        for task in tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Background task ended abnormally");
            }
        }
        tracing::info!("Background tasks stopped");

        served.map_err(StartupError::from)
    }
}

fn warm_up(credentials: Arc<CredentialCache>) {
    tokio::spawn(async move {
        if let Err(e) = credentials.ensure().await {
            tracing::warn!(error = %e, "Initial access token fetch failed, first request will retry");
        }
    });
}
