//! Queued submissions and their identities.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::payload::Payload;
use super::record::RecordKind;
use crate::constants::{ERROR_TRUNCATE_SUFFIX, MAX_ERROR_LENGTH};

/// Stable identity of a submission's real-world intent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DedupKey(String);

impl DedupKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A persisted, not-yet-resolved request awaiting delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingSubmission {
    pub kind: RecordKind,
    pub payload: Payload,
    pub dedup_key: DedupKey,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub last_error: Option<String>,
}

impl PendingSubmission {
    pub fn new(kind: RecordKind, payload: Payload, dedup_key: DedupKey) -> Self {
        Self { kind, payload, dedup_key, created_at: Utc::now(), attempts: 0, last_error: None }
    }

    /// Note a failed delivery attempt.
    pub fn record_failure(&mut self, error: &str) {
        self.attempts = self.attempts.saturating_add(1);
        self.last_error = Some(truncate_error(error));
    }
}

/// Result of an enqueue call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnqueueReceipt {
    pub dedup_key: DedupKey,
    /// True when an entry with the same key was already queued and nothing
    /// was written.
    pub duplicate: bool,
}

/// Truncate an error message to the persisted maximum.
pub fn truncate_error(reason: &str) -> String {
    if reason.chars().count() <= MAX_ERROR_LENGTH {
        return reason.to_string();
    }

    let keep = MAX_ERROR_LENGTH.saturating_sub(ERROR_TRUNCATE_SUFFIX.len());
    let mut truncated = reason.chars().take(keep).collect::<String>();
    truncated.push_str(ERROR_TRUNCATE_SUFFIX);
    truncated
}
