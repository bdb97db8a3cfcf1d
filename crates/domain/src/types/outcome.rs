//! Results of submit and drain operations.

use serde::{Deserialize, Serialize};

use super::ack::ServerAck;
use super::record::RecordKind;
use super::submission::DedupKey;
use crate::impl_label_conversions;

/// Why a foreground submission ended up in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueReason {
    /// The device reported no connectivity.
    Offline,
    /// The send was attempted and failed in transit.
    TransportFailure,
    /// An identical submission is already waiting in the queue.
    AlreadyQueued,
}

impl_label_conversions!(QueueReason {
    Offline => "offline",
    TransportFailure => "transport_failure",
    AlreadyQueued => "already_queued",
});

impl QueueReason {
    /// Short user-facing notice for this reason.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Offline => "Saved offline, will sync when online",
            Self::TransportFailure => "Saved offline due to network error, will sync automatically",
            Self::AlreadyQueued => "Already saved offline, will sync when online",
        }
    }
}

/// Outcome of the interactive submit path.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Acked(ServerAck),
    Queued { dedup_key: DedupKey, reason: QueueReason },
}

impl SubmitOutcome {
    pub fn is_queued(&self) -> bool {
        matches!(self, Self::Queued { .. })
    }
}

/// Per-entry result of a drain pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    Delivered,
    Rejected,
    Retained,
}

/// Summary of one drain pass over a kind's queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainReport {
    pub kind: RecordKind,
    pub delivered: usize,
    pub rejected: usize,
    pub retained: usize,
    /// The pass did nothing: a drain was already running or the device was
    /// offline before the first entry.
    pub skipped: bool,
}

impl DrainReport {
    pub fn new(kind: RecordKind) -> Self {
        Self { kind, delivered: 0, rejected: 0, retained: 0, skipped: false }
    }

    pub fn skipped(kind: RecordKind) -> Self {
        Self { skipped: true, ..Self::new(kind) }
    }

    pub fn record(&mut self, outcome: SyncOutcome) {
        match outcome {
            SyncOutcome::Delivered => self.delivered = self.delivered.saturating_add(1),
            SyncOutcome::Rejected => self.rejected = self.rejected.saturating_add(1),
            SyncOutcome::Retained => self.retained = self.retained.saturating_add(1),
        }
    }

    /// Number of entries resolved (delivered or rejected) in the pass.
    pub fn resolved(&self) -> usize {
        self.delivered.saturating_add(self.rejected)
    }
}

/// Whether a new payment may be started for an animal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "count", rename_all = "snake_case")]
pub enum PaymentGate {
    Clear,
    PendingLocal(usize),
    PendingRemote(usize),
}

impl PaymentGate {
    pub fn is_blocked(&self) -> bool {
        !matches!(self, Self::Clear)
    }
}
