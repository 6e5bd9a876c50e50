//! Upstream (message/image API) failures.

use std::time::Duration;

use thiserror::Error;

use crate::credentials::CredentialError;
use crate::resilience::timeouts::DeadlineExceeded;

/// Failure of a message send or image upload against the relay target.
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    /// The platform rejected the bearer token (HTTP 401).
    #[error("upstream rejected the access token")]
    Unauthorized,

    /// Non-success HTTP status other than 401.
    #[error("upstream returned status {status}: {detail}")]
    Status { status: u16, detail: String },

    /// HTTP success, but the platform reported a business error code.
    #[error("upstream rejected the request with code {code}: {msg}")]
    Rejected { code: i64, msg: String },

    /// The response body did not have the expected shape.
    #[error("malformed upstream response: {0}")]
    Malformed(String),

    #[error("upstream call timed out after {0:?}")]
    Timeout(Duration),

    /// DNS, TCP, TLS or body transfer failure.
    #[error("upstream transport error: {0}")]
    Transport(String),

    /// The task running the call panicked or was cancelled.
    #[error("upstream call aborted: {0}")]
    Aborted(String),

    /// The credential step failed while preparing or retrying the call.
    #[error(transparent)]
    Credential(#[from] CredentialError),
}

impl UpstreamError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, UpstreamError::Unauthorized)
    }

    /// HTTP status reported by the platform, when there was one.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            UpstreamError::Unauthorized => Some(401),
            UpstreamError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::Unauthorized => "unauthorized",
            UpstreamError::Status { .. } => "status",
            UpstreamError::Rejected { .. } => "rejected",
            UpstreamError::Malformed(_) => "malformed",
            UpstreamError::Timeout(_) => "timeout",
            UpstreamError::Transport(_) => "transport",
            UpstreamError::Aborted(_) => "aborted",
            UpstreamError::Credential(_) => "credential",
        }
    }
}

impl From<DeadlineExceeded> for UpstreamError {
    fn from(e: DeadlineExceeded) -> Self {
        UpstreamError::Timeout(e.0)
    }
}
