//! Outbound dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! request handlers (many producers)
//!     → DispatchQueue::enqueue / submit (unbounded MPSC, returns immediately)
//!     → DispatchWorker (single consumer)
//!         → take up to batch_size tasks (FIFO)
//!         → run them concurrently, each isolated on its own tokio task
//!         → wait for the whole batch, then sleep the pacing delay
//! ```
//!
//! # Design Decisions
//! - Client latency is decoupled from upstream latency; fire-and-forget
//!   callers get no delivery confirmation
//! - Bounded parallelism (batch size) plus pacing keeps upstream load flat
//! - Failed or panicking tasks are logged and never stop the worker
//! - Shutdown closes the queue, finishes the current batch, then drains the
//!   backlog within a deadline

pub mod queue;
pub mod task;

pub use queue::{DispatchError, DispatchQueue, DispatchWorker};
pub use task::{DispatchTask, TaskOutcome};
