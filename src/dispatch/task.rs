//! Units of outbound work.

use std::future::Future;

use futures_util::future::{BoxFuture, FutureExt};
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::observability::metrics;
use crate::platform::UpstreamError;

/// Result of running a task.
pub type TaskOutcome = Result<(), UpstreamError>;

type Work = Box<dyn FnOnce() -> BoxFuture<'static, TaskOutcome> + Send>;

/// An opaque outbound call plus its enqueue time.
pub struct DispatchTask {
    label: String,
    enqueued_at: Instant,
    work: Work,
    reply: Option<oneshot::Sender<TaskOutcome>>,
}

impl DispatchTask {
    pub fn new<F, Fut>(label: impl Into<String>, work: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = TaskOutcome> + Send + 'static,
    {
        Self {
            label: label.into(),
            enqueued_at: Instant::now(),
            work: Box::new(move || work().boxed()),
            reply: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn enqueued_at(&self) -> Instant {
        self.enqueued_at
    }

    pub(crate) fn with_reply(mut self, reply: oneshot::Sender<TaskOutcome>) -> Self {
        self.reply = Some(reply);
        self
    }

    /// Execute the task on its own tokio task so a panic stays contained,
    /// then report the outcome. Returns whether the call succeeded.
    pub(crate) async fn run(self, batch: u64) -> bool {
        let Self {
            label,
            enqueued_at,
            work,
            reply,
        } = self;

        let outcome = match tokio::spawn(work()).await {
            Ok(outcome) => outcome,
            Err(e) => Err(UpstreamError::Aborted(e.to_string())),
        };

        let succeeded = outcome.is_ok();
        match &outcome {
            Ok(()) => tracing::debug!(
                batch,
                task = %label,
                queued_ms = enqueued_at.elapsed().as_millis() as u64,
                "Dispatch task completed"
            ),
            Err(e) => tracing::warn!(batch, task = %label, kind = e.kind(), error = %e, "Dispatch task failed"),
        }
        metrics::record_dispatch_task(succeeded);

        if let Some(reply) = reply {
            // The submitter may have stopped waiting.
            let _ = reply.send(outcome);
        }
        succeeded
    }
}

impl std::fmt::Debug for DispatchTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchTask")
            .field("label", &self.label)
            .field("enqueued_at", &self.enqueued_at)
            .field("awaited", &self.reply.is_some())
            .finish()
    }
}
