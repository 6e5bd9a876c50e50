//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (per-client sliding window, 429 on overflow)
//!     → limits.rs (attachment size and type)
//!     → headers.rs (response hardening headers)
//!     → Pass to relay
//! ```
//!
//! # Design Decisions
//! - Rejections happen before any upstream call or disk write
//! - No trust in client input; forwarded headers only when configured

pub mod headers;
pub mod limits;
pub mod rate_limit;

pub use limits::AttachmentPolicy;
pub use rate_limit::{AdmissionController, AdmissionState};
