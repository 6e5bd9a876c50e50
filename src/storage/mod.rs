//! Ephemeral upload storage.
//!
//! # Data Flow
//! ```text
//! image attachment
//!     → uploads.rs (write to shared dir, time-prefixed name)
//!     → relay finishes (success or failure)
//!     → janitor.rs reclaim (delete now)
//!
//! timer (TTL interval)
//!     → janitor.rs sweep (delete anything older than TTL)
//! ```
//!
//! # Design Decisions
//! - No index of uploads; the directory listing and mtimes are the record
//! - The periodic sweep is the backstop for files the relay path never
//!   cleaned (crash, error mid-relay)

pub mod janitor;
pub mod uploads;

pub use janitor::{ResourceJanitor, SweepReport};
pub use uploads::{remove, FileError, TempFile, UploadStore};
