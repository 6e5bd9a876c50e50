//! Batched, paced dispatch of outbound sends.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use futures_util::future::join_all;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{self, Instant};

use crate::config::DispatchConfig;
use crate::dispatch::task::{DispatchTask, TaskOutcome};
use crate::observability::metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The queue no longer accepts work (shutdown in progress).
    #[error("dispatch queue is closed")]
    Closed,
}

struct Shared {
    tx: ArcSwapOption<mpsc::UnboundedSender<DispatchTask>>,
    depth: AtomicUsize,
}

/// Producer handle. Cheap to clone; safe to use from many request handlers.
#[derive(Clone)]
pub struct DispatchQueue {
    shared: Arc<Shared>,
}

impl DispatchQueue {
    /// Create the queue and its single consumer.
    pub fn new(batch_size: usize, pacing: Duration, drain_timeout: Duration) -> (Self, DispatchWorker) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            tx: ArcSwapOption::from_pointee(tx),
            depth: AtomicUsize::new(0),
        });

        let worker = DispatchWorker {
            rx,
            shared: shared.clone(),
            batch_size: batch_size.max(1),
            pacing,
            drain_timeout,
            batches: 0,
        };
        (Self { shared }, worker)
    }

    pub fn from_config(config: &DispatchConfig) -> (Self, DispatchWorker) {
        Self::new(
            config.batch_size,
            Duration::from_millis(config.pacing_ms),
            Duration::from_secs(config.drain_timeout_secs),
        )
    }

    /// Append a task to the tail of the queue and return immediately.
    pub fn enqueue(&self, task: DispatchTask) -> Result<(), DispatchError> {
        let guard = self.shared.tx.load();
        let tx = match &*guard {
            Some(tx) => tx,
            None => return Err(DispatchError::Closed),
        };

        // Count before sending so the worker's decrement never runs first.
        let depth = self.shared.depth.fetch_add(1, Ordering::SeqCst) + 1;
        if tx.send(task).is_err() {
            self.shared.depth.fetch_sub(1, Ordering::SeqCst);
            return Err(DispatchError::Closed);
        }
        metrics::record_queue_depth(depth);
        Ok(())
    }

    /// Enqueue a task and get a handle resolving to its outcome.
    pub fn submit(&self, task: DispatchTask) -> Result<oneshot::Receiver<TaskOutcome>, DispatchError> {
        let (reply, outcome) = oneshot::channel();
        self.enqueue(task.with_reply(reply))?;
        Ok(outcome)
    }

    /// Number of tasks waiting to be picked up.
    pub fn depth(&self) -> usize {
        self.shared.depth.load(Ordering::SeqCst)
    }

    /// Stop accepting new tasks. Already queued tasks are still drained.
    pub fn shutdown(&self) {
        if self.shared.tx.swap(None).is_some() {
            tracing::info!(pending = self.depth(), "Dispatch queue closed to new work");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.tx.load().is_none()
    }
}

/// The single consumer draining a [`DispatchQueue`].
pub struct DispatchWorker {
    rx: mpsc::UnboundedReceiver<DispatchTask>,
    shared: Arc<Shared>,
    batch_size: usize,
    pacing: Duration,
    drain_timeout: Duration,
    batches: u64,
}

impl DispatchWorker {
    /// Drain the queue in paced batches until the queue is closed and empty,
    /// or shutdown is signalled. On shutdown the current batch completes and
    /// the remaining backlog is drained within the drain timeout.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            batch_size = self.batch_size,
            pacing_ms = self.pacing.as_millis() as u64,
            "Dispatch worker started"
        );

        loop {
            let first = tokio::select! {
                task = self.rx.recv() => match task {
                    Some(task) => task,
                    None => {
                        tracing::info!(batches = self.batches, "Dispatch queue closed and empty, worker exiting");
                        return;
                    }
                },
                _ = shutdown.recv() => break,
            };

            self.run_batch(first).await;
            time::sleep(self.pacing).await;
        }

        self.drain().await;
    }

    async fn drain(&mut self) {
        tracing::info!(pending = self.shared.depth.load(Ordering::SeqCst), "Dispatch worker draining");
        self.rx.close();

        let deadline = self.drain_timeout;
        let drained = time::timeout(deadline, async {
            while let Some(first) = self.rx.recv().await {
                self.run_batch(first).await;
                if !self.rx.is_empty() {
                    time::sleep(self.pacing).await;
                }
            }
        })
        .await;

        match drained {
            Ok(()) => tracing::info!(batches = self.batches, "Dispatch worker drained"),
            Err(_) => tracing::warn!(
                abandoned = self.shared.depth.load(Ordering::SeqCst),
                timeout_secs = deadline.as_secs(),
                "Dispatch drain timed out, abandoning queued tasks"
            ),
        }
    }

    /// Run `first` plus whatever else is already queued, up to the batch size,
    /// concurrently. Returns once every task in the batch has finished.
    async fn run_batch(&mut self, first: DispatchTask) {
        let mut batch = Vec::with_capacity(self.batch_size);
        batch.push(first);
        while batch.len() < self.batch_size {
            match self.rx.try_recv() {
                Ok(task) => batch.push(task),
                Err(_) => break,
            }
        }

        let size = batch.len();
        let depth = self.shared.depth.fetch_sub(size, Ordering::SeqCst) - size;
        metrics::record_queue_depth(depth);

        self.batches += 1;
        let id = self.batches;
        let started = Instant::now();

        let results = join_all(batch.into_iter().map(|task| task.run(id))).await;
        let failed = results.iter().filter(|ok| !**ok).count();

        metrics::record_dispatch_batch(started.elapsed());
        if failed > 0 {
            tracing::warn!(batch = id, size, failed, "Dispatch batch finished with failures");
        } else {
            tracing::debug!(batch = id, size, "Dispatch batch finished");
        }
    }
}
