//! Sync worker lifecycle errors

use std::time::Duration;

use herdsync_domain::HerdSyncError;
use thiserror::Error;

/// Failures of the background worker's start/stop lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkerError {
    #[error("Worker already running")]
    AlreadyRunning,

    #[error("Worker not running")]
    NotRunning,

    #[error("Worker task panicked: {0}")]
    Panicked(String),

    #[error("Worker task did not finish within {0:?}")]
    JoinTimeout(Duration),
}

impl From<WorkerError> for HerdSyncError {
    fn from(err: WorkerError) -> Self {
        Self::Internal(err.to_string())
    }
}
