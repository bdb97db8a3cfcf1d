//! Sync coordinator
//!
//! Owns the two delivery paths: the interactive `try_submit_now` used when a
//! user saves a record, and the background `drain_queue` / `drain_all` passes
//! that replay queued submissions once the device is back online.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use herdsync_domain::{
    DrainReport, HerdSyncError, Payload, QueueReason, RecordKind, Result, SubmitOutcome,
    SyncOutcome,
};
use tracing::{debug, info, instrument, warn};

use super::dedup::derive_dedup_key;
use super::errors::SubmitError;
use super::ports::{
    ConnectivityOracle, LoggingRejectionSink, QueueStore, RejectionSink, SubmissionClient,
};

/// Aggregate result of draining every kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainSummary {
    pub reports: Vec<DrainReport>,
    /// Kinds whose pass stopped on a store error.
    pub failures: Vec<(RecordKind, HerdSyncError)>,
}

impl DrainSummary {
    pub fn delivered(&self) -> usize {
        self.reports.iter().map(|report| report.delivered).sum()
    }

    pub fn rejected(&self) -> usize {
        self.reports.iter().map(|report| report.rejected).sum()
    }

    pub fn retained(&self) -> usize {
        self.reports.iter().map(|report| report.retained).sum()
    }

    pub fn report(&self, kind: RecordKind) -> Option<&DrainReport> {
        self.reports.iter().find(|report| report.kind == kind)
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Coordinates submission, queueing, and replay across record kinds.
pub struct SyncCoordinator {
    store: Arc<dyn QueueStore>,
    client: Arc<dyn SubmissionClient>,
    connectivity: Arc<dyn ConnectivityOracle>,
    rejections: Arc<dyn RejectionSink>,
    draining: [AtomicBool; RecordKind::COUNT],
}

impl SyncCoordinator {
    pub fn new(
        store: Arc<dyn QueueStore>,
        client: Arc<dyn SubmissionClient>,
        connectivity: Arc<dyn ConnectivityOracle>,
    ) -> Self {
        Self {
            store,
            client,
            connectivity,
            rejections: Arc::new(LoggingRejectionSink),
            draining: Default::default(),
        }
    }

    /// Replace the default log-only rejection sink.
    pub fn with_rejection_sink(mut self, sink: Arc<dyn RejectionSink>) -> Self {
        self.rejections = sink;
        self
    }

    pub fn store(&self) -> &Arc<dyn QueueStore> {
        &self.store
    }

    /// Whether a drain pass for `kind` is in flight.
    pub fn is_draining(&self, kind: RecordKind) -> bool {
        self.draining[kind.index()].load(Ordering::Acquire)
    }

    /// Submit immediately when possible, otherwise queue for later delivery.
    ///
    /// # Errors
    /// - `InvalidPayload` when the dedup key cannot be derived; nothing is sent
    ///   or stored.
    /// - `Server` when the server rejects the request; nothing is queued.
    /// - Store errors from the fallback enqueue.
    #[instrument(skip(self, payload), fields(kind = %kind))]
    pub async fn try_submit_now(&self, kind: RecordKind, payload: Payload) -> Result<SubmitOutcome> {
        let dedup_key = derive_dedup_key(kind, &payload)?;

        if self.store.contains(kind, &dedup_key).await? {
            debug!(dedup_key = %dedup_key, "Submission already queued; leaving it to the next drain");
            return Ok(SubmitOutcome::Queued { dedup_key, reason: QueueReason::AlreadyQueued });
        }

        if !self.connectivity.is_connected().await {
            let receipt = self.store.enqueue(kind, payload).await?;
            info!(dedup_key = %receipt.dedup_key, "Offline; submission queued");
            return Ok(SubmitOutcome::Queued {
                dedup_key: receipt.dedup_key,
                reason: QueueReason::Offline,
            });
        }

        match self.client.submit(kind, &payload).await {
            Ok(ack) => {
                debug!(status = ack.status, "Submission acknowledged");
                Ok(SubmitOutcome::Acked(ack))
            }
            Err(SubmitError::Transport(message)) => {
                let receipt = self.store.enqueue(kind, payload).await?;
                self.store.record_attempt(kind, &receipt.dedup_key, &message).await?;
                warn!(
                    dedup_key = %receipt.dedup_key,
                    error = %message,
                    "Transport failure; submission queued"
                );
                Ok(SubmitOutcome::Queued {
                    dedup_key: receipt.dedup_key,
                    reason: QueueReason::TransportFailure,
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Replay queued entries for `kind` in FIFO order.
    ///
    /// Stops at the first transport failure or when connectivity drops. A
    /// call made while another pass for the same kind is running returns a
    /// skipped report and leaves the queue untouched.
    ///
    /// # Errors
    /// Returns the store error if listing, removing, or updating an entry
    /// fails; the pass stops at that entry.
    pub async fn drain_queue(&self, kind: RecordKind) -> Result<DrainReport> {
        self.drain_queue_until(kind, &|| false).await
    }

    /// Like [`drain_queue`](Self::drain_queue), but checks `stop` before each
    /// entry and ends the pass early once it returns true.
    ///
    /// An entry whose submission has started always runs to completion, so
    /// the queue never keeps an entry the server already accepted.
    ///
    /// # Errors
    /// Same as [`drain_queue`](Self::drain_queue).
    #[instrument(skip(self, stop), fields(kind = %kind))]
    pub async fn drain_queue_until<S>(&self, kind: RecordKind, stop: &S) -> Result<DrainReport>
    where
        S: Fn() -> bool + Sync,
    {
        let Some(_guard) = DrainGuard::acquire(&self.draining[kind.index()]) else {
            debug!("Drain already in progress; skipping");
            return Ok(DrainReport::skipped(kind));
        };

        let entries = self.store.list(kind).await?;
        let mut report = DrainReport::new(kind);
        if entries.is_empty() {
            return Ok(report);
        }

        for (position, entry) in entries.iter().enumerate() {
            if !self.connectivity.is_connected().await {
                debug!(remaining = entries.len() - position, "Offline; stopping drain");
                report.skipped = position == 0;
                break;
            }
            if stop() {
                debug!(remaining = entries.len() - position, "Stop requested; ending drain early");
                break;
            }

            match self.client.submit(kind, &entry.payload).await {
                Ok(_) => {
                    self.store.remove(kind, &entry.dedup_key).await?;
                    debug!(dedup_key = %entry.dedup_key, "Queued submission delivered");
                    report.record(SyncOutcome::Delivered);
                }
                Err(SubmitError::Server { status, message }) => {
                    self.store.remove(kind, &entry.dedup_key).await?;
                    self.rejections.record_rejection(entry, status, &message);
                    report.record(SyncOutcome::Rejected);
                }
                Err(SubmitError::Transport(message)) => {
                    self.store.record_attempt(kind, &entry.dedup_key, &message).await?;
                    warn!(
                        dedup_key = %entry.dedup_key,
                        attempts = entry.attempts.saturating_add(1),
                        error = %message,
                        "Transport failure; halting drain for this kind"
                    );
                    break;
                }
            }
        }

        report.retained = entries.len().saturating_sub(report.resolved());
        info!(
            delivered = report.delivered,
            rejected = report.rejected,
            retained = report.retained,
            "Drain pass finished"
        );
        Ok(report)
    }

    /// Drain every kind concurrently.
    pub async fn drain_all(&self) -> DrainSummary {
        self.drain_all_until(&|| false).await
    }

    /// Drain every kind concurrently, ending each pass between entries once
    /// `stop` returns true.
    pub async fn drain_all_until<S>(&self, stop: &S) -> DrainSummary
    where
        S: Fn() -> bool + Sync,
    {
        let passes = RecordKind::ALL
            .iter()
            .map(|&kind| async move { (kind, self.drain_queue_until(kind, stop).await) });

        let mut summary = DrainSummary::default();
        for (kind, result) in join_all(passes).await {
            match result {
                Ok(report) => summary.reports.push(report),
                Err(err) => {
                    warn!(kind = %kind, error = %err, "Drain pass failed");
                    summary.failures.push((kind, err));
                }
            }
        }
        summary
    }
}

/// Claims a per-kind drain slot; releases it on drop.
struct DrainGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> DrainGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
