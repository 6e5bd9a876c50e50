//! Per-client sliding-window admission control.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::time::{self, Instant};

use crate::config::RateLimitConfig;
use crate::error::RelayError;
use crate::observability::metrics;

/// Sliding-window rate limiter keyed by client.
///
/// Each key holds the timestamps of its admitted requests inside the trailing
/// window. The read-modify-write for a key happens under that key's map shard
/// lock, so two racing requests can never both take the last slot.
pub struct AdmissionController {
    windows: DashMap<String, VecDeque<Instant>>,
    window: Duration,
    max_requests: usize,
}

impl AdmissionController {
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            windows: DashMap::new(),
            window,
            max_requests,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(Duration::from_millis(config.window_ms), config.max_requests)
    }

    /// Admit or reject one request for `key`.
    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    pub fn allow_at(&self, key: &str, now: Instant) -> bool {
        let mut window = self.windows.entry(key.to_owned()).or_default();
        prune(&mut window, now, self.window);

        if window.len() < self.max_requests {
            window.push_back(now);
            true
        } else {
            false
        }
    }

    /// Time until the oldest admitted request for `key` leaves the window.
    pub fn retry_after(&self, key: &str) -> Duration {
        self.retry_after_at(key, Instant::now())
    }

    pub fn retry_after_at(&self, key: &str, now: Instant) -> Duration {
        self.windows
            .get(key)
            .and_then(|window| window.front().copied())
            .map(|oldest| (oldest + self.window).saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }

    /// Drop keys whose window has emptied. Returns the number removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, window| {
            prune(window, now, self.window);
            !window.is_empty()
        });
        before.saturating_sub(self.windows.len())
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }

    /// Periodically reclaim memory held by idle keys until shutdown.
    pub async fn run_sweeper(self: Arc<Self>, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = time::interval(interval);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.sweep();
                    if removed > 0 {
                        tracing::debug!(removed, remaining = self.tracked_keys(), "Rate limit windows swept");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Rate limit sweeper stopping");
                    break;
                }
            }
        }
    }
}

/// Keep only timestamps with `now - t < window`.
fn prune(window: &mut VecDeque<Instant>, now: Instant, span: Duration) {
    while let Some(&oldest) = window.front() {
        if now.saturating_duration_since(oldest) >= span {
            window.pop_front();
        } else {
            break;
        }
    }
}

/// State for the admission middleware.
#[derive(Clone)]
pub struct AdmissionState {
    pub controller: Arc<AdmissionController>,
    pub enabled: bool,
    pub trust_forwarded_for: bool,
}

/// Resolve the admission key for a request: the peer IP, or the first
/// `X-Forwarded-For` hop when the deployment sits behind a trusted proxy.
pub fn client_key(request: &Request<Body>, peer: SocketAddr, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(hop) = forwarded {
            return hop.to_string();
        }
    }
    peer.ip().to_string()
}

/// Middleware rejecting requests over the per-client budget with 429.
pub async fn admission_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AdmissionState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.enabled {
        return next.run(request).await;
    }

    let key = client_key(&request, addr, state.trust_forwarded_for);

    if state.controller.allow(&key) {
        next.run(request).await
    } else {
        let retry_after = state.controller.retry_after(&key);
        tracing::warn!(client = %key, retry_after_ms = retry_after.as_millis() as u64, "Rate limit exceeded");
        metrics::record_rate_limited();
        RelayError::RateLimited { retry_after }.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(60_000);

    #[test]
    fn test_allows_up_to_max_then_denies() {
        let limiter = AdmissionController::new(WINDOW, 30);
        let now = Instant::now();

        for i in 0..30 {
            assert!(limiter.allow_at("1.2.3.4", now + Duration::from_millis(i)), "request {} should pass", i);
        }
        assert!(!limiter.allow_at("1.2.3.4", now + Duration::from_millis(30)));
    }

    #[test]
    fn test_boundary_counts() {
        let limiter = AdmissionController::new(WINDOW, 2);
        let now = Instant::now();

        // count == max - 1 is allowed, count == max is denied
        assert!(limiter.allow_at("k", now));
        assert!(limiter.allow_at("k", now));
        assert!(!limiter.allow_at("k", now));
    }

    #[test]
    fn test_window_slides() {
        let limiter = AdmissionController::new(WINDOW, 2);
        let start = Instant::now();

        assert!(limiter.allow_at("k", start));
        assert!(limiter.allow_at("k", start + Duration::from_secs(30)));
        assert!(!limiter.allow_at("k", start + Duration::from_secs(59)));

        // The first request leaves the window exactly at 60s.
        assert!(limiter.allow_at("k", start + WINDOW));
        assert!(!limiter.allow_at("k", start + WINDOW + Duration::from_secs(1)));
    }

    #[test]
    fn test_denied_requests_do_not_consume_slots() {
        let limiter = AdmissionController::new(WINDOW, 1);
        let start = Instant::now();

        assert!(limiter.allow_at("k", start));
        for s in 1..10 {
            assert!(!limiter.allow_at("k", start + Duration::from_secs(s)));
        }
        assert!(limiter.allow_at("k", start + WINDOW));
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = AdmissionController::new(WINDOW, 1);
        let now = Instant::now();

        assert!(limiter.allow_at("a", now));
        assert!(limiter.allow_at("b", now));
        assert!(!limiter.allow_at("a", now));
    }

    #[test]
    fn test_retry_after_tracks_oldest_entry() {
        let limiter = AdmissionController::new(WINDOW, 1);
        let now = Instant::now();

        assert_eq!(limiter.retry_after_at("k", now), Duration::ZERO);
        limiter.allow_at("k", now);
        assert_eq!(
            limiter.retry_after_at("k", now + Duration::from_secs(20)),
            Duration::from_secs(40)
        );
    }

    #[test]
    fn test_sweep_reclaims_idle_keys() {
        let limiter = AdmissionController::new(WINDOW, 5);
        let now = Instant::now();

        limiter.allow_at("old", now);
        limiter.allow_at("fresh", now + Duration::from_secs(50));
        assert_eq!(limiter.tracked_keys(), 2);

        let removed = limiter.sweep_at(now + Duration::from_secs(61));
        assert_eq!(removed, 1);
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[test]
    fn test_concurrent_requests_never_exceed_budget() {
        let limiter = Arc::new(AdmissionController::new(WINDOW, 30));
        let now = Instant::now();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || (0..25).filter(|_| limiter.allow_at("shared", now)).count())
            })
            .collect();

        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 30);
    }

    #[test]
    fn test_client_key_prefers_forwarded_hop_only_when_trusted() {
        let peer: SocketAddr = "10.0.0.1:5555".parse().unwrap();
        let request = Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.2")
            .body(Body::empty())
            .unwrap();

        assert_eq!(client_key(&request, peer, true), "203.0.113.7");
        assert_eq!(client_key(&request, peer, false), "10.0.0.1");
    }
}
