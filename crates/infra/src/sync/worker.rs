//! Sync worker that drains every offline queue in the background.
//!
//! A pass (`SyncCoordinator::drain_all_until`) runs:
//! - once when the worker starts,
//! - whenever [`SyncWorker::trigger`] is called (app returned to foreground),
//! - whenever connectivity flips from offline to online, either through a
//!   [`ConnectivityState`] notification or a poll of the oracle.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use herdsync_core::SyncCoordinator;
//! use herdsync_infra::connectivity::ConnectivityState;
//! use herdsync_infra::sync::{SyncWorker, SyncWorkerConfig};
//!
//! # async fn example(coordinator: Arc<SyncCoordinator>) -> Result<(), herdsync_infra::sync::WorkerError> {
//! let state = ConnectivityState::new(false);
//! let mut worker = SyncWorker::new(coordinator, Arc::new(state.clone()), SyncWorkerConfig::default())
//!     .with_notifications(state.clone());
//!
//! worker.start().await?;
//! state.set_connected(true); // network callback
//! worker.trigger(); // app foregrounded
//! worker.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use herdsync_core::{ConnectivityOracle, SyncCoordinator};
use herdsync_domain::SyncConfig;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::errors::WorkerError;
use crate::connectivity::ConnectivityState;

/// Configuration for the sync worker.
#[derive(Debug, Clone)]
pub struct SyncWorkerConfig {
    /// Interval between connectivity polls
    pub poll_interval: Duration,
    /// Time budget for a pass. Checked between entries, so a pass may run
    /// past it by at most one submission per kind.
    pub drain_timeout: Duration,
    /// Join timeout when stopping
    pub join_timeout: Duration,
    /// Run a pass as soon as the worker starts
    pub drain_on_start: bool,
}

impl Default for SyncWorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(herdsync_domain::constants::DEFAULT_POLL_INTERVAL_SECS),
            drain_timeout: Duration::from_secs(300),
            join_timeout: Duration::from_secs(5),
            drain_on_start: true,
        }
    }
}

impl From<&SyncConfig> for SyncWorkerConfig {
    fn from(config: &SyncConfig) -> Self {
        Self {
            poll_interval: Duration::from_secs(config.poll_interval_seconds.max(1)),
            ..Self::default()
        }
    }
}

struct LoopContext {
    coordinator: Arc<SyncCoordinator>,
    connectivity: Arc<dyn ConnectivityOracle>,
    notifications: Option<watch::Receiver<bool>>,
    trigger: Arc<Notify>,
    passes: Arc<AtomicU64>,
    config: SyncWorkerConfig,
    cancel: CancellationToken,
}

/// Background sync worker with explicit lifecycle management.
pub struct SyncWorker {
    coordinator: Arc<SyncCoordinator>,
    connectivity: Arc<dyn ConnectivityOracle>,
    notifications: Option<ConnectivityState>,
    config: SyncWorkerConfig,
    trigger: Arc<Notify>,
    passes: Arc<AtomicU64>,
    cancellation: CancellationToken,
    task_handle: Option<JoinHandle<()>>,
}

impl SyncWorker {
    pub fn new(
        coordinator: Arc<SyncCoordinator>,
        connectivity: Arc<dyn ConnectivityOracle>,
        config: SyncWorkerConfig,
    ) -> Self {
        Self {
            coordinator,
            connectivity,
            notifications: None,
            config,
            trigger: Arc::new(Notify::new()),
            passes: Arc::new(AtomicU64::new(0)),
            cancellation: CancellationToken::new(),
            task_handle: None,
        }
    }

    /// React to pushed connectivity changes in addition to polling.
    pub fn with_notifications(mut self, state: ConnectivityState) -> Self {
        self.notifications = Some(state);
        self
    }

    /// Start the worker, spawning the background task.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> Result<(), WorkerError> {
        if self.is_running() {
            return Err(WorkerError::AlreadyRunning);
        }

        info!("Starting sync worker");

        // Create fresh cancellation token
        self.cancellation = CancellationToken::new();

        let context = LoopContext {
            coordinator: Arc::clone(&self.coordinator),
            connectivity: Arc::clone(&self.connectivity),
            notifications: self.notifications.as_ref().map(ConnectivityState::subscribe),
            trigger: Arc::clone(&self.trigger),
            passes: Arc::clone(&self.passes),
            config: self.config.clone(),
            cancel: self.cancellation.clone(),
        };

        self.task_handle = Some(tokio::spawn(Self::run_loop(context)));
        info!("Sync worker started");
        Ok(())
    }

    /// Stop the worker and wait for the task to finish.
    ///
    /// A pass in flight finishes its current entry and then stops; the join
    /// is bounded by `join_timeout`.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> Result<(), WorkerError> {
        let Some(handle) = self.task_handle.take() else {
            return Err(WorkerError::NotRunning);
        };

        info!("Stopping sync worker");
        self.cancellation.cancel();

        let join_timeout = self.config.join_timeout;
        let result = match tokio::time::timeout(join_timeout, handle).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                warn!(error = %err, "Sync worker task panicked");
                Err(WorkerError::Panicked(err.to_string()))
            }
            Err(_) => {
                warn!("Sync worker task did not complete within timeout");
                Err(WorkerError::JoinTimeout(join_timeout))
            }
        };

        self.cancellation = CancellationToken::new();
        info!("Sync worker stopped");
        result
    }

    /// Returns true when a worker task is active.
    pub fn is_running(&self) -> bool {
        self.task_handle.is_some()
    }

    /// Request a drain pass as soon as the worker is idle.
    pub fn trigger(&self) {
        self.trigger.notify_one();
    }

    /// Number of drain passes finished so far.
    pub fn completed_passes(&self) -> u64 {
        self.passes.load(Ordering::Acquire)
    }

    async fn run_loop(mut ctx: LoopContext) {
        // Sampled before the start pass so a reconnect during it still
        // counts as a transition.
        let mut online = ctx.connectivity.is_connected().await;

        if ctx.config.drain_on_start {
            Self::run_pass(&ctx, "start").await;
        }

        loop {
            tokio::select! {
                _ = ctx.cancel.cancelled() => {
                    debug!("Sync worker loop cancelled");
                    break;
                }
                _ = ctx.trigger.notified() => {
                    Self::run_pass(&ctx, "trigger").await;
                }
                changed = next_change(ctx.notifications.as_mut()) => {
                    match changed {
                        Some(now_online) => {
                            if now_online && !online {
                                Self::run_pass(&ctx, "reconnected").await;
                            }
                            online = now_online;
                        }
                        None => {
                            debug!("Connectivity notifications closed; relying on polling");
                            ctx.notifications = None;
                        }
                    }
                }
                _ = tokio::time::sleep(ctx.config.poll_interval) => {
                    let now_online = ctx.connectivity.is_connected().await;
                    if now_online && !online {
                        Self::run_pass(&ctx, "reconnected").await;
                    }
                    online = now_online;
                }
            }
        }
    }

    async fn run_pass(ctx: &LoopContext, reason: &'static str) {
        let started = Instant::now();
        let drain_timeout = ctx.config.drain_timeout;
        let deadline = started + drain_timeout;
        let cancel = &ctx.cancel;

        // Checked between entries only; a submission already sent is never
        // abandoned before its queue entry is resolved.
        let stop = || cancel.is_cancelled() || Instant::now() >= deadline;
        let summary = ctx.coordinator.drain_all_until(&stop).await;

        if Instant::now() >= deadline {
            warn!(reason, timeout_secs = drain_timeout.as_secs(), "Sync pass hit its time budget");
        }
        info!(
            reason,
            delivered = summary.delivered(),
            rejected = summary.rejected(),
            retained = summary.retained(),
            failed_kinds = summary.failures.len(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Sync pass completed"
        );

        ctx.passes.fetch_add(1, Ordering::AcqRel);
    }
}

/// Next connectivity value, or `None` once the sender is gone. Pending
/// forever when there is nothing to watch.
async fn next_change(rx: Option<&mut watch::Receiver<bool>>) -> Option<bool> {
    match rx {
        Some(rx) => match rx.changed().await {
            Ok(()) => Some(*rx.borrow_and_update()),
            Err(_) => None,
        },
        None => std::future::pending().await,
    }
}

impl Drop for SyncWorker {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("SyncWorker dropped while running; cancelling task");
            self.cancellation.cancel();
        }
    }
}
