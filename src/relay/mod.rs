//! Relay orchestration.
//!
//! # Data Flow
//! ```text
//! submission (fields + optional image)
//!     → message.rs (validate, render chat text)
//!     → service.rs
//!         → CredentialCache::ensure (fail fast on identity exchange errors)
//!         → text only:  DispatchQueue::enqueue → 202
//!         → with image: store upload → submit text, await it
//!                       → courier upload + image send → reclaim upload → 200
//!     → courier.rs (credential, deadline, retry once on 401)
//! ```
//!
//! # Design Decisions
//! - The image leg runs only after the text leg succeeded; an image failure
//!   after a delivered text is reported as partial delivery
//! - Upload files are reclaimed on every exit path once stored

pub mod courier;
pub mod message;
pub mod service;

pub use courier::Courier;
pub use message::{RelayRequest, ValidationError, DEFAULT_ALIAS};
pub use service::{Attachment, Delivery, RelayService};
