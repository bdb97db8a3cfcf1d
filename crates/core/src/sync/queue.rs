//! In-memory bookkeeping for one kind's queue.
//!
//! Store implementations load the persisted list, apply one of these
//! operations, and write the result back inside a single critical section.

use herdsync_domain::{DedupKey, Payload, PendingSubmission, RecordKind, Result};

use super::dedup::derive_dedup_key;

/// Ordered entries for a single record kind, unique by dedup key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueEntries {
    entries: Vec<PendingSubmission>,
}

impl QueueEntries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a loaded list. Later duplicates of an earlier key are dropped so
    /// the uniqueness invariant holds even for hand-edited storage.
    pub fn from_vec(entries: Vec<PendingSubmission>) -> Self {
        let mut queue = Self::new();
        for entry in entries {
            queue.insert(entry);
        }
        queue
    }

    pub fn contains(&self, key: &DedupKey) -> bool {
        self.entries.iter().any(|entry| &entry.dedup_key == key)
    }

    /// Append `entry` unless its key is already present. Returns whether the
    /// entry was added.
    pub fn insert(&mut self, entry: PendingSubmission) -> bool {
        if self.contains(&entry.dedup_key) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    /// Derive the key for `payload` and append it as a fresh entry.
    ///
    /// Returns the key and whether anything was added.
    ///
    /// # Errors
    /// Returns `InvalidPayload` when the key cannot be derived.
    pub fn push_payload(&mut self, kind: RecordKind, payload: Payload) -> Result<(DedupKey, bool)> {
        let key = derive_dedup_key(kind, &payload)?;
        if self.contains(&key) {
            return Ok((key, false));
        }
        self.entries.push(PendingSubmission::new(kind, payload, key.clone()));
        Ok((key, true))
    }

    pub fn remove(&mut self, key: &DedupKey) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| &entry.dedup_key != key);
        self.entries.len() != before
    }

    /// Returns false when no entry has `key`.
    pub fn record_failure(&mut self, key: &DedupKey, error: &str) -> bool {
        match self.entries.iter_mut().find(|entry| &entry.dedup_key == key) {
            Some(entry) => {
                entry.record_failure(error);
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingSubmission> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[PendingSubmission] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<PendingSubmission> {
        self.entries
    }
}
