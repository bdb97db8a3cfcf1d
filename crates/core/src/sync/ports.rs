//! Port interfaces for offline sync

use async_trait::async_trait;
use herdsync_domain::{
    DedupKey, EnqueueReceipt, Payload, PendingSubmission, RecordKind, RemotePendingPayment,
    Result, ServerAck,
};
use tracing::error;

use super::errors::SubmitError;

/// Durable, per-kind FIFO of pending submissions.
///
/// Implementations derive the dedup key on enqueue and must make every
/// mutation a complete read-modify-write with no interleaved writer.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Queue a payload; a no-op if an entry with the same key exists.
    async fn enqueue(&self, kind: RecordKind, payload: Payload) -> Result<EnqueueReceipt>;

    /// Entries for `kind` in enqueue order.
    async fn list(&self, kind: RecordKind) -> Result<Vec<PendingSubmission>>;

    /// Remove the entry with `key`; returns whether one was removed.
    async fn remove(&self, kind: RecordKind, key: &DedupKey) -> Result<bool>;

    /// Bump the attempt count and store the last transport error.
    async fn record_attempt(&self, kind: RecordKind, key: &DedupKey, error: &str) -> Result<()>;

    /// Drop every entry for `kind`.
    async fn clear(&self, kind: RecordKind) -> Result<()>;

    /// Whether an entry with `key` is queued for `kind`.
    async fn contains(&self, kind: RecordKind, key: &DedupKey) -> Result<bool> {
        Ok(self.list(kind).await?.iter().any(|entry| &entry.dedup_key == key))
    }
}

/// Performs the remote call for a record kind.
#[async_trait]
pub trait SubmissionClient: Send + Sync {
    async fn submit(
        &self,
        kind: RecordKind,
        payload: &Payload,
    ) -> std::result::Result<ServerAck, SubmitError>;
}

/// Reports current reachability of the remote service.
#[async_trait]
pub trait ConnectivityOracle: Send + Sync {
    async fn is_connected(&self) -> bool;
}

/// Pending payments known to the server.
#[async_trait]
pub trait RemotePendingPayments: Send + Sync {
    async fn fetch_pending_payments(
        &self,
        animal_id: &str,
        action_type: Option<&str>,
    ) -> std::result::Result<Vec<RemotePendingPayment>, SubmitError>;
}

/// Receives entries the server rejected during a drain.
pub trait RejectionSink: Send + Sync {
    fn record_rejection(&self, entry: &PendingSubmission, status: u16, message: &str);
}

/// Default sink: writes rejections to the error log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingRejectionSink;

impl RejectionSink for LoggingRejectionSink {
    fn record_rejection(&self, entry: &PendingSubmission, status: u16, message: &str) {
        error!(
            kind = %entry.kind,
            dedup_key = %entry.dedup_key,
            attempts = entry.attempts,
            status,
            reason = %message,
            "Queued submission rejected by server; dropped from queue"
        );
    }
}
