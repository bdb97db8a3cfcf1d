//! Submission error classification
//!
//! The Submission Client reports every failure as one of two categories. The
//! category decides whether an entry stays queued or is dropped.

use herdsync_domain::HerdSyncError;
use thiserror::Error;

/// Failure of a single remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// Network unreachable, timeout, 5xx. Retried on a later drain.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Explicit business rejection. Never retried.
    #[error("Server rejected submission ({status}): {message}")]
    Server { status: u16, message: String },
}

impl SubmitError {
    /// Retryable failure carrying `message`.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Business rejection with the HTTP `status`.
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server { status, message: message.into() }
    }

    /// True when the entry should stay queued.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<SubmitError> for HerdSyncError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Transport(message) => Self::Transport(message),
            SubmitError::Server { status, message } => Self::Server { status, message },
        }
    }
}
