//! Background synchronization
//!
//! The [`SyncWorker`] replays queued submissions on app start, when
//! connectivity returns, and on explicit foreground triggers. It follows the
//! runtime rules used across the crate: join handles are tracked,
//! cancellation is explicit, and every drain pass runs under a timeout.

mod errors;
pub mod worker;

pub use errors::WorkerError;
pub use worker::{SyncWorker, SyncWorkerConfig};
