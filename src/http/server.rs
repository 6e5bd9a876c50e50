//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, timeout, body limit, admission)
//! - Bind server to listener and stop gracefully on signal

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::RelayConfig;
use crate::http::handlers;
use crate::http::request::{make_span, propagate_request_id, set_request_id};
use crate::relay::RelayService;
use crate::security::headers::nosniff;
use crate::security::rate_limit::admission_middleware;
use crate::security::{AdmissionController, AdmissionState};

/// Multipart framing allowance on top of the attachment cap.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<RelayService>,
}

/// HTTP server for the relay.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(
        config: &RelayConfig,
        relay: Arc<RelayService>,
        admission: Arc<AdmissionController>,
    ) -> Self {
        let admission = AdmissionState {
            controller: admission,
            enabled: config.rate_limit.enabled,
            trust_forwarded_for: config.rate_limit.trust_forwarded_for,
        };
        let state = AppState { relay };

        Self {
            router: Self::build_router(config, state, admission),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &RelayConfig, state: AppState, admission: AdmissionState) -> Router {
        let submissions = Router::new()
            .route("/sendMessage", post(handlers::send_message))
            .route_layer(middleware::from_fn_with_state(admission, admission_middleware))
            .layer(DefaultBodyLimit::max(config.uploads.max_bytes + MULTIPART_OVERHEAD));

        Router::new()
            .route("/", get(handlers::alive))
            .route("/health", get(handlers::health))
            .merge(submissions)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id())
                    .layer(TraceLayer::new_for_http().make_span_with(make_span::<axum::body::Body>))
                    .layer(propagate_request_id())
                    .layer(nosniff())
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// Run the server, accepting connections on the given listener until
    /// `signal` resolves. In-flight requests are allowed to finish.
    pub async fn run<F>(self, listener: TcpListener, signal: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(signal)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
