//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for HerdSync
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum HerdSyncError {
    /// The payload lacks the fields needed to identify it. Fatal to the
    /// enqueue attempt; the caller must show this to the user.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Network unreachable, timeout, or 5xx. Recoverable on the next drain.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Business rejection from the remote service. Never retried.
    #[error("Server rejected submission ({status}): {message}")]
    Server { status: u16, message: String },

    /// A persisted queue could not be read back.
    #[error("Store corruption: {0}")]
    StoreCorruption(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HerdSyncError {
    /// Stable label suitable for structured logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::InvalidPayload(_) => "invalid_payload",
            Self::Transport(_) => "transport",
            Self::Server { .. } => "server",
            Self::StoreCorruption(_) => "store_corruption",
            Self::Database(_) => "database",
            Self::Config(_) => "config",
            Self::Internal(_) => "internal",
        }
    }

    /// True when the failure should leave the record queued for a later
    /// attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Result type alias for HerdSync operations
pub type Result<T> = std::result::Result<T, HerdSyncError>;
