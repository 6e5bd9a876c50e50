//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Upload dir → Platform client → Credential cache (warm-up)
//!     → Dispatch worker → Janitor → Rate-limit sweeper → HTTP listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Close queue → Drain queue → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listeners
//! - Ordered shutdown: stop accept, drain, close
//! - Queue drain has a timeout: pending tasks past the deadline are dropped

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
pub use startup::{bootstrap, build, Services, StartupError};
