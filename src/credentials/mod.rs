//! Shared credential lifecycle.
//!
//! # Data Flow
//! ```text
//! caller → CredentialCache::ensure
//!     → cached credential still fresh?  → return it
//!     → otherwise join (or start) the single in-flight refresh
//!         → TokenSource::exchange (bounded by refresh timeout)
//!         → store {token, expires_at = now + lifetime - margin}
//!
//! upstream 401 → CredentialCache::invalidate_if(rejected token)
//! ```
//!
//! # Design Decisions
//! - Readers never take a lock: the credential lives in an `ArcSwapOption`
//! - Exactly one refresh is in flight; every concurrent caller awaits the same
//!   shared future and receives the same result, success or failure
//! - Refresh failures are never retried internally; the next `ensure` retries

pub mod cache;

pub use cache::{Credential, CredentialCache, CredentialError};
