//! Orchestration-level error taxonomy.

use std::time::Duration;

use thiserror::Error;

use crate::credentials::CredentialError;
use crate::dispatch::DispatchError;
use crate::platform::UpstreamError;
use crate::relay::ValidationError;

/// Every failure a submission can end with. Translated to an HTTP response
/// in `http::response`.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("rate limit exceeded, retry in {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// The text leg was delivered, the image leg was not.
    #[error("text delivered but image failed: {source}")]
    PartialDelivery { source: UpstreamError },

    #[error(transparent)]
    Unavailable(#[from] DispatchError),
}

impl RelayError {
    /// Short label used for metrics and logs.
    pub fn outcome(&self) -> &'static str {
        match self {
            RelayError::Validation(_) => "invalid",
            RelayError::RateLimited { .. } => "rate_limited",
            RelayError::Credential(_) => "credential_error",
            RelayError::Upstream(UpstreamError::Credential(_)) => "credential_error",
            RelayError::Upstream(_) => "upstream_error",
            RelayError::PartialDelivery { .. } => "partial",
            RelayError::Unavailable(_) => "unavailable",
        }
    }
}
