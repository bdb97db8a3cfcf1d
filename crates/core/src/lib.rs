//! # HerdSync Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits) for the queue store, submission
//!   client, connectivity, and rejection reporting
//! - Dedup key derivation and queue bookkeeping
//! - The sync coordinator and pending-state reader
//!
//! ## Architecture Principles
//! - Only depends on `herdsync-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits

pub mod sync;

pub use sync::{
    derive_dedup_key, entity_id, ConnectivityOracle, DrainSummary, LoggingRejectionSink,
    PendingStateReader, QueueEntries, QueueStore, RejectionSink, RemotePendingPayments,
    SubmissionClient, SubmitError, SyncCoordinator,
};
