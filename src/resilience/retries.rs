//! Retry logic for authorization rejections.
//!
//! # Responsibilities
//! - Attach a cached credential to an outbound call
//! - On HTTP 401, invalidate the rejected token and retry exactly once
//!
//! # Design Decisions
//! - Only authorization rejections are retried; other failures surface as-is
//! - A second consecutive 401 is returned to the caller, never looped
//! - Invalidation is keyed on the rejected token so concurrent 401s trigger
//!   one refresh, not one each

use std::future::Future;
use std::sync::Arc;

use crate::credentials::{Credential, CredentialCache};
use crate::observability::metrics;
use crate::platform::UpstreamError;

/// Run `call` with a valid credential, retrying once with a fresh one if the
/// platform rejects the token.
pub async fn retry_on_unauthorized<T, F, Fut>(
    credentials: &CredentialCache,
    operation: &'static str,
    mut call: F,
) -> Result<T, UpstreamError>
where
    F: FnMut(Arc<Credential>) -> Fut,
    Fut: Future<Output = Result<T, UpstreamError>>,
{
    let credential = credentials.ensure().await?;
    match call(credential.clone()).await {
        Err(UpstreamError::Unauthorized) => {
            tracing::warn!(operation, "Access token rejected upstream, refreshing and retrying once");
            metrics::record_auth_retry(operation);
            credentials.invalidate_if(credential.token());

            let fresh = credentials.ensure().await?;
            let result = call(fresh).await;
            if let Err(UpstreamError::Unauthorized) = &result {
                tracing::error!(operation, "Access token rejected again after refresh");
            }
            result
        }
        other => other,
    }
}
