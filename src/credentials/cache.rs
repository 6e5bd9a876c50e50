//! Tenant access token cache with single-flight refresh.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use thiserror::Error;
use tokio::time::Instant;

use crate::observability::metrics;
use crate::platform::{TokenGrant, TokenSource};
use crate::resilience::timeouts::{with_deadline, DeadlineExceeded};

/// Identity exchange failure.
#[derive(Debug, Clone, Error)]
pub enum CredentialError {
    #[error("identity exchange request failed: {0}")]
    Transport(String),

    #[error("identity exchange returned status {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("identity exchange rejected with code {code}: {msg}")]
    Rejected { code: i64, msg: String },

    #[error("identity exchange response malformed: {0}")]
    Malformed(String),

    #[error("identity exchange timed out after {0:?}")]
    Timeout(Duration),
}

impl From<DeadlineExceeded> for CredentialError {
    fn from(e: DeadlineExceeded) -> Self {
        CredentialError::Timeout(e.0)
    }
}

/// A bearer token and the instant after which it must not be handed out.
#[derive(Clone)]
pub struct Credential {
    token: String,
    expires_at: Instant,
}

impl Credential {
    /// Build a credential from a grant received at `now`, expiring `margin`
    /// before the server-declared lifetime ends.
    pub fn issue(grant: TokenGrant, margin: Duration, now: Instant) -> Self {
        Self {
            token: grant.token,
            expires_at: now + grant.lifetime.saturating_sub(margin),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    pub fn is_valid_at(&self, now: Instant) -> bool {
        !self.token.is_empty() && now < self.expires_at
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

type RefreshResult = Result<Arc<Credential>, CredentialError>;

#[derive(Clone)]
struct Flight {
    id: u64,
    future: Shared<BoxFuture<'static, RefreshResult>>,
}

enum Lookup {
    Fresh(Arc<Credential>),
    Pending(Flight),
}

/// Owns the current tenant access token.
///
/// Many concurrent readers, at most one refresh at a time.
pub struct CredentialCache {
    source: Arc<dyn TokenSource>,
    margin: Duration,
    refresh_timeout: Duration,
    current: Arc<ArcSwapOption<Credential>>,
    inflight: Mutex<Option<Flight>>,
    next_flight: AtomicU64,
}

impl CredentialCache {
    pub fn new(source: Arc<dyn TokenSource>, margin: Duration, refresh_timeout: Duration) -> Self {
        Self {
            source,
            margin,
            refresh_timeout,
            current: Arc::new(ArcSwapOption::empty()),
            inflight: Mutex::new(None),
            next_flight: AtomicU64::new(0),
        }
    }

    /// Return a credential valid at call time, refreshing at most once across
    /// all concurrent callers when none is cached or the cached one expired.
    pub async fn ensure(&self) -> Result<Arc<Credential>, CredentialError> {
        if let Some(credential) = self.fresh() {
            return Ok(credential);
        }

        let flight = match self.join_or_start() {
            Lookup::Fresh(credential) => return Ok(credential),
            Lookup::Pending(flight) => flight,
        };

        let result = flight.future.clone().await;
        self.land(flight.id);
        result
    }

    /// Drop the cached credential so the next `ensure` refreshes.
    pub fn invalidate(&self) {
        if self.current.swap(None).is_some() {
            tracing::info!("Access token invalidated");
        }
    }

    /// Drop the cached credential only if it is still the one that was
    /// rejected. A token already replaced by a concurrent refresh is kept.
    pub fn invalidate_if(&self, rejected: &str) {
        let previous = self.current.rcu(|current| match current {
            Some(credential) if credential.token == rejected => None,
            other => other.clone(),
        });
        if previous.is_some_and(|credential| credential.token == rejected) {
            tracing::info!("Rejected access token invalidated");
        }
    }

    /// Whether a currently valid credential is cached.
    pub fn has_valid(&self) -> bool {
        self.fresh().is_some()
    }

    fn fresh(&self) -> Option<Arc<Credential>> {
        self.current
            .load_full()
            .filter(|credential| credential.is_valid_at(Instant::now()))
    }

    fn join_or_start(&self) -> Lookup {
        let mut slot = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);

        // A flight may have landed between the lock-free check and here.
        if let Some(credential) = self.fresh() {
            return Lookup::Fresh(credential);
        }
        if let Some(flight) = slot.as_ref() {
            return Lookup::Pending(flight.clone());
        }

        let id = self.next_flight.fetch_add(1, Ordering::Relaxed) + 1;
        let future = refresh(
            self.source.clone(),
            self.current.clone(),
            self.margin,
            self.refresh_timeout,
        )
        .boxed()
        .shared();
        let flight = Flight { id, future };
        *slot = Some(flight.clone());
        Lookup::Pending(flight)
    }

    fn land(&self, id: u64) {
        let mut slot = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|flight| flight.id == id) {
            *slot = None;
        }
    }
}

async fn refresh(
    source: Arc<dyn TokenSource>,
    current: Arc<ArcSwapOption<Credential>>,
    margin: Duration,
    timeout: Duration,
) -> RefreshResult {
    tracing::debug!("Refreshing access token");

    match with_deadline(timeout, source.exchange()).await {
        Ok(grant) => {
            let lifetime = grant.lifetime;
            let credential = Arc::new(Credential::issue(grant, margin, Instant::now()));
            current.store(Some(credential.clone()));
            metrics::record_token_refresh(true);
            tracing::info!(
                lifetime_secs = lifetime.as_secs(),
                margin_secs = margin.as_secs(),
                "Access token refreshed"
            );
            Ok(credential)
        }
        Err(e) => {
            metrics::record_token_refresh(false);
            tracing::error!(error = %e, "Access token refresh failed");
            Err(e)
        }
    }
}
