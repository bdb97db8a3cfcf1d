//! Offline sync: dedup keys, queue bookkeeping, delivery, and pending state.

pub mod coordinator;
pub mod dedup;
pub mod errors;
pub mod pending;
pub mod ports;
pub mod queue;

pub use coordinator::{DrainSummary, SyncCoordinator};
pub use dedup::{derive_dedup_key, entity_id};
pub use errors::SubmitError;
pub use pending::PendingStateReader;
pub use ports::{
    ConnectivityOracle, LoggingRejectionSink, QueueStore, RejectionSink, RemotePendingPayments,
    SubmissionClient,
};
pub use queue::QueueEntries;
