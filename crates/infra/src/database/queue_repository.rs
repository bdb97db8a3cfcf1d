//! SQLite-backed implementation of the queue store port.
//!
//! Each record kind owns one row in `offline_queues`. A mutation loads the
//! row, applies the change in memory, and writes the whole list back in one
//! UPSERT. The load and the write share a `BEGIN IMMEDIATE` transaction, and
//! in-process callers are additionally serialized per kind.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use herdsync_core::{QueueEntries, QueueStore};
use herdsync_domain::{
    DedupKey, EnqueueReceipt, HerdSyncError, Payload, PendingSubmission, RecordKind,
    Result as DomainResult,
};
use rusqlite::types::{Type, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tokio::sync::Mutex as TokioMutex;
use tokio::task;
use tracing::{debug, info, warn};

use super::manager::{map_sql_error, DbManager};

const SELECT_QUEUE_SQL: &str = "SELECT entries_json FROM offline_queues WHERE name = ?1";

const UPSERT_QUEUE_SQL: &str = "INSERT INTO offline_queues (name, entries_json, updated_at)
    VALUES (?1, ?2, ?3)
    ON CONFLICT(name) DO UPDATE SET
        entries_json = excluded.entries_json,
        updated_at = excluded.updated_at";

/// Durable per-kind queues stored in SQLite.
pub struct SqliteQueueStore {
    db: Arc<DbManager>,
    locks: [TokioMutex<()>; RecordKind::COUNT],
}

impl SqliteQueueStore {
    /// Construct a store backed by the shared manager. The schema must
    /// already exist (see [`DbManager::run_migrations`]).
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db, locks: Default::default() }
    }

    /// Run `op` against the loaded entries of `kind` inside one transaction.
    ///
    /// `op` returns its result plus whether the entries changed; the row is
    /// rewritten only when they did (or when the stored row was unreadable).
    async fn with_queue<R, F>(&self, kind: RecordKind, op: F) -> DomainResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut QueueEntries) -> DomainResult<(R, bool)> + Send + 'static,
    {
        let _guard = self.locks[kind.index()].lock().await;
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<R> {
            let mut conn = db.get_connection()?;
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(map_sql_error)?;

            let loaded = load_entries(&tx, kind)?;
            let mut entries = QueueEntries::from_vec(loaded.entries);
            let (result, changed) = op(&mut entries)?;

            if changed || loaded.corrupt {
                write_entries(&tx, kind, entries.as_slice())?;
            }
            tx.commit().map_err(map_sql_error)?;
            Ok(result)
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl QueueStore for SqliteQueueStore {
    async fn enqueue(&self, kind: RecordKind, payload: Payload) -> DomainResult<EnqueueReceipt> {
        let receipt = self
            .with_queue(kind, move |entries| {
                let (dedup_key, added) = entries.push_payload(kind, payload)?;
                Ok((EnqueueReceipt { dedup_key, duplicate: !added }, added))
            })
            .await?;

        if receipt.duplicate {
            debug!(kind = %kind, dedup_key = %receipt.dedup_key, "duplicate enqueue ignored");
        } else {
            info!(kind = %kind, dedup_key = %receipt.dedup_key, "submission queued");
        }
        Ok(receipt)
    }

    async fn list(&self, kind: RecordKind) -> DomainResult<Vec<PendingSubmission>> {
        self.with_queue(kind, |entries| Ok((entries.as_slice().to_vec(), false))).await
    }

    async fn remove(&self, kind: RecordKind, key: &DedupKey) -> DomainResult<bool> {
        let key = key.clone();
        self.with_queue(kind, move |entries| {
            let removed = entries.remove(&key);
            Ok((removed, removed))
        })
        .await
    }

    async fn record_attempt(
        &self,
        kind: RecordKind,
        key: &DedupKey,
        error: &str,
    ) -> DomainResult<()> {
        let key = key.clone();
        let error = error.to_string();
        let found = self
            .with_queue(kind, move |entries| {
                let found = entries.record_failure(&key, &error);
                Ok((found, found))
            })
            .await?;

        if !found {
            debug!(kind = %kind, "attempt recorded for entry no longer queued");
        }
        Ok(())
    }

    async fn clear(&self, kind: RecordKind) -> DomainResult<()> {
        let cleared = self
            .with_queue(kind, |entries| {
                let count = entries.len();
                *entries = QueueEntries::new();
                Ok((count, count > 0))
            })
            .await?;

        info!(kind = %kind, cleared, "queue cleared");
        Ok(())
    }
}

struct Loaded {
    entries: Vec<PendingSubmission>,
    corrupt: bool,
}

/// Stored column contents before decoding.
enum RawQueue {
    Text(Vec<u8>),
    NotText(Type),
}

fn load_entries(conn: &Connection, kind: RecordKind) -> DomainResult<Loaded> {
    let raw = conn
        .query_row(SELECT_QUEUE_SQL, params![kind.queue_name()], |row| {
            Ok(match row.get_ref(0)? {
                ValueRef::Text(bytes) => RawQueue::Text(bytes.to_vec()),
                other => RawQueue::NotText(other.data_type()),
            })
        })
        .optional()
        .map_err(map_sql_error)?;

    let corrupt = |reason: &str| -> DomainResult<Loaded> {
        report_corruption(kind, reason);
        Ok(Loaded { entries: Vec::new(), corrupt: true })
    };

    let bytes = match raw {
        None => return Ok(Loaded { entries: Vec::new(), corrupt: false }),
        Some(RawQueue::NotText(data_type)) => {
            return corrupt(&format!("stored as {data_type}, expected text"));
        }
        Some(RawQueue::Text(bytes)) => bytes,
    };

    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => return corrupt(&err.to_string()),
    };

    match serde_json::from_str::<Vec<PendingSubmission>>(&text) {
        Ok(entries) if entries.iter().all(|entry| entry.kind == kind) => {
            Ok(Loaded { entries, corrupt: false })
        }
        Ok(_) => corrupt("entries belong to a different kind"),
        Err(err) => corrupt(&err.to_string()),
    }
}

fn report_corruption(kind: RecordKind, reason: &str) {
    let err = HerdSyncError::StoreCorruption(format!("{}: {reason}", kind.queue_name()));
    warn!(
        kind = %kind,
        error = %err,
        error_type = err.label(),
        "stored queue unreadable; resetting to empty"
    );
}

fn write_entries(
    conn: &Connection,
    kind: RecordKind,
    entries: &[PendingSubmission],
) -> DomainResult<()> {
    let json = serde_json::to_string(entries)
        .map_err(|err| HerdSyncError::from(crate::errors::InfraError::from(err)))?;
    conn.execute(
        UPSERT_QUEUE_SQL,
        params![kind.queue_name(), json, Utc::now().timestamp_millis()],
    )
    .map_err(map_sql_error)?;
    Ok(())
}

fn map_join_error(err: task::JoinError) -> HerdSyncError {
    if err.is_cancelled() {
        HerdSyncError::Internal("queue store task cancelled".into())
    } else {
        HerdSyncError::Internal(format!("queue store task panic: {err}"))
    }
}
