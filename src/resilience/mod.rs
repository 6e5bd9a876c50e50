//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound call to the relay target:
//!     → retries.rs (attach credential, on 401 invalidate + retry once)
//!     → timeouts.rs (enforce per-call deadline)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Message sends are not idempotent, so only authorization rejections
//!   (the call never took effect) are retried

pub mod retries;
pub mod timeouts;
