//! Background eviction of expired blobs.
//!
//! The sweeper sweeps once when spawned and then on every tick of a fixed
//! interval until its cancellation token fires. It shares the slides
//! directory with request handlers without any lock, so a read can observe
//! a blob vanish mid-request; that surfaces as an ordinary not-found.

use crate::{ContentStore, Result, ServiceOptions};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweeperState {
    Idle,
    Sweeping,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweeperStatus {
    pub state: SweeperState,
    /// Sweep cycles finished so far, including ones that aborted.
    pub completed_sweeps: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub removed: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct ExpirySweeper {
    store: Arc<ContentStore>,
    max_age: chrono::Duration,
    interval: Duration,
}

impl ExpirySweeper {
    pub fn new(store: Arc<ContentStore>, max_age: chrono::Duration, interval: Duration) -> Self {
        Self {
            store,
            max_age,
            interval: interval.max(MIN_INTERVAL),
        }
    }

    pub fn from_options(store: Arc<ContentStore>, options: &ServiceOptions) -> Self {
        Self::new(store, options.max_age(), options.sweep_interval)
    }

    pub async fn sweep(&self) -> Result<SweepReport> {
        self.sweep_at(Utc::now()).await
    }

    /// Delete every blob older than the maximum age as of `now`.
    ///
    /// Failing to list the slides directory aborts the sweep. Failing to
    /// delete a single blob is logged and the sweep moves on.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let entries = self.store.list().await?;
        let mut report = SweepReport {
            scanned: entries.len(),
            ..SweepReport::default()
        };

        for entry in entries
            .iter()
            .filter(|entry| entry.age(now) > self.max_age)
        {
            match self.store.remove(entry).await {
                Ok(()) => {
                    report.removed += 1;
                    tracing::debug!("Removed expired slide {}", entry.key);
                }
                Err(error) => {
                    report.failed += 1;
                    tracing::warn!("Failed to remove expired slide {}: {}", entry.key, error);
                }
            }
        }

        Ok(report)
    }

    pub fn spawn(self, token: CancellationToken) -> SweeperHandle {
        let (status_tx, status_rx) = watch::channel(SweeperStatus {
            state: SweeperState::Idle,
            completed_sweeps: 0,
        });

        let task_token = token.clone();
        let task = tokio::spawn(async move { self.run(task_token, status_tx).await });

        SweeperHandle {
            token,
            status: status_rx,
            task,
        }
    }

    async fn run(self, token: CancellationToken, status: watch::Sender<SweeperStatus>) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // the first tick completes immediately, which gives the startup sweep
        loop {
            tokio::select! {
                biased;
                () = token.cancelled() => break,
                _ = ticker.tick() => {
                    status.send_modify(|status| status.state = SweeperState::Sweeping);
                    self.sweep_logged().await;
                    status.send_modify(|status| {
                        status.state = SweeperState::Idle;
                        status.completed_sweeps += 1;
                    });
                }
            }
        }

        status.send_modify(|status| status.state = SweeperState::Stopped);
        tracing::debug!("Stopping expiry sweeper");
    }

    async fn sweep_logged(&self) {
        match self.sweep().await {
            Ok(report) if report.removed > 0 || report.failed > 0 => {
                tracing::info!(
                    "Expiry sweep: scanned={} removed={} failed={}",
                    report.scanned,
                    report.removed,
                    report.failed
                );
            }
            Ok(report) => {
                tracing::debug!("Expiry sweep: scanned={} nothing expired", report.scanned);
            }
            Err(error) => {
                tracing::error!("Expiry sweep aborted: {}", error);
            }
        }
    }
}

pub struct SweeperHandle {
    token: CancellationToken,
    status: watch::Receiver<SweeperStatus>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    pub fn status(&self) -> SweeperStatus {
        *self.status.borrow()
    }

    /// Wait until at least `count` sweeps have completed or the sweeper stopped.
    pub async fn wait_for_sweeps(&mut self, count: u64) -> SweeperStatus {
        let result = self
            .status
            .wait_for(|status| {
                status.completed_sweeps >= count || status.state == SweeperState::Stopped
            })
            .await
            .map(|status| *status);
        result.unwrap_or_else(|_| *self.status.borrow())
    }

    pub async fn shutdown(self) -> SweeperStatus {
        self.token.cancel();
        if let Err(error) = self.task.await {
            tracing::warn!("Expiry sweeper task failed: {}", error);
        }
        *self.status.borrow()
    }
}
