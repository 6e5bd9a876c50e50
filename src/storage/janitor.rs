//! TTL sweep of the upload directory.
//!
//! # Responsibilities
//! - Periodically delete uploads older than the TTL
//! - Delete a specific upload on demand once its relay finished
//!
//! # Design Decisions
//! - Per-entry failures are logged and counted, never abort the sweep
//! - "Already gone" is success: the relay path and the sweep may race
//! - A file landing mid-sweep is simply picked up by the next cycle

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::sync::broadcast;
use tokio::time;

use crate::observability::metrics;
use crate::storage::uploads::{remove, FileError, TempFile};

/// Counters for one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub deleted: usize,
    pub errors: usize,
}

pub struct ResourceJanitor {
    dir: PathBuf,
    ttl: Duration,
    interval: Duration,
}

impl ResourceJanitor {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration, interval: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
            interval,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Delete every entry whose age exceeds the TTL.
    pub async fn sweep(&self) -> SweepReport {
        self.sweep_at(SystemTime::now()).await
    }

    /// Sweep as if the current time were `now`.
    pub async fn sweep_at(&self, now: SystemTime) -> SweepReport {
        let mut report = SweepReport::default();

        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return report,
            Err(source) => {
                let err = FileError::List {
                    path: self.dir.clone(),
                    source,
                };
                tracing::error!(error = %err, "Upload sweep could not list directory");
                report.errors += 1;
                metrics::record_janitor(&report);
                return report;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(source) => {
                    let err = FileError::List {
                        path: self.dir.clone(),
                        source,
                    };
                    tracing::warn!(error = %err, "Upload sweep stopped listing early");
                    report.errors += 1;
                    break;
                }
            };
            report.scanned += 1;

            let path = entry.path();
            match self.expire_entry(&path, now).await {
                Ok(true) => report.deleted += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Upload sweep skipped entry");
                    report.errors += 1;
                }
            }
        }

        metrics::record_janitor(&report);
        if report.deleted > 0 || report.errors > 0 {
            tracing::info!(
                scanned = report.scanned,
                deleted = report.deleted,
                errors = report.errors,
                "Upload sweep finished"
            );
        }
        report
    }

    /// Delete `path` if it is a regular file older than the TTL.
    async fn expire_entry(&self, path: &Path, now: SystemTime) -> Result<bool, FileError> {
        let meta = match tokio::fs::metadata(path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(source) => {
                return Err(FileError::Stat {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        if !meta.is_file() {
            return Ok(false);
        }

        let modified = meta.modified().map_err(|source| FileError::Stat {
            path: path.to_path_buf(),
            source,
        })?;
        let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
        if age <= self.ttl {
            return Ok(false);
        }

        remove(path).await
    }

    /// Delete one upload now. Failures are logged, never returned.
    pub async fn reclaim(&self, file: &TempFile) {
        match remove(&file.path).await {
            Ok(_) => tracing::debug!(path = %file.path.display(), "Upload reclaimed"),
            Err(e) => tracing::warn!(error = %e, "Upload reclaim failed, leaving it to the sweep"),
        }
    }

    /// Sweep on every interval tick until shutdown. The first sweep runs
    /// immediately to clear leftovers from a previous run.
    pub async fn run(self: std::sync::Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            dir = %self.dir.display(),
            ttl_secs = self.ttl.as_secs(),
            interval_secs = self.interval.as_secs(),
            "Upload janitor started"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Upload janitor stopping");
                    break;
                }
            }
        }
    }
}
