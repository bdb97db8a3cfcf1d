//! In-memory mocks for the sync ports.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use herdsync_core::{
    entity_id, ConnectivityOracle, QueueEntries, QueueStore, RejectionSink, RemotePendingPayments,
    SubmissionClient, SubmitError,
};
use herdsync_domain::{
    DedupKey, EnqueueReceipt, HerdSyncError, Payload, PendingSubmission, RecordKind,
    RemotePendingPayment, Result as DomainResult, ServerAck,
};
use serde_json::json;
use tokio::sync::{Mutex as TokioMutex, Notify};

/// Queue store backed by per-kind in-memory entries.
#[derive(Default)]
pub struct MemoryQueueStore {
    queues: TokioMutex<HashMap<RecordKind, QueueEntries>>,
    fail_removals: AtomicBool,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `remove` fail with a database error.
    pub fn fail_removals(&self) {
        self.fail_removals.store(true, Ordering::SeqCst);
    }

    pub async fn len(&self, kind: RecordKind) -> usize {
        self.queues.lock().await.get(&kind).map_or(0, QueueEntries::len)
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn enqueue(&self, kind: RecordKind, payload: Payload) -> DomainResult<EnqueueReceipt> {
        let mut queues = self.queues.lock().await;
        let (dedup_key, added) = queues.entry(kind).or_default().push_payload(kind, payload)?;
        Ok(EnqueueReceipt { dedup_key, duplicate: !added })
    }

    async fn list(&self, kind: RecordKind) -> DomainResult<Vec<PendingSubmission>> {
        Ok(self.queues.lock().await.get(&kind).map(|q| q.as_slice().to_vec()).unwrap_or_default())
    }

    async fn remove(&self, kind: RecordKind, key: &DedupKey) -> DomainResult<bool> {
        if self.fail_removals.load(Ordering::SeqCst) {
            return Err(HerdSyncError::Database("disk I/O error".into()));
        }
        Ok(self.queues.lock().await.get_mut(&kind).is_some_and(|q| q.remove(key)))
    }

    async fn record_attempt(
        &self,
        kind: RecordKind,
        key: &DedupKey,
        error: &str,
    ) -> DomainResult<()> {
        if let Some(queue) = self.queues.lock().await.get_mut(&kind) {
            queue.record_failure(key, error);
        }
        Ok(())
    }

    async fn clear(&self, kind: RecordKind) -> DomainResult<()> {
        self.queues.lock().await.remove(&kind);
        Ok(())
    }
}

type Response = Result<ServerAck, SubmitError>;

/// Submission client with scripted responses.
///
/// Responses registered for an entity id win; otherwise the next value from
/// the script queue is used; otherwise the call succeeds.
#[derive(Default)]
pub struct ScriptedClient {
    script: Mutex<VecDeque<Response>>,
    by_entity: Mutex<HashMap<String, Response>>,
    calls: Mutex<Vec<(RecordKind, Payload)>>,
    hold: AtomicBool,
    entered: Notify,
    release: Notify,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, response: Response) {
        self.script.lock().unwrap().push_back(response);
    }

    pub fn respond_for(&self, entity: &str, response: Response) {
        self.by_entity.lock().unwrap().insert(entity.to_string(), response);
    }

    /// Park every call until [`Self::release`] is called once per call.
    pub fn hold_calls(&self) {
        self.hold.store(true, Ordering::SeqCst);
    }

    pub async fn wait_until_called(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.hold.store(false, Ordering::SeqCst);
        self.release.notify_one();
    }

    pub fn calls(&self) -> Vec<(RecordKind, Payload)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Entity ids in call order.
    pub fn called_entities(&self) -> Vec<String> {
        self.calls()
            .iter()
            .filter_map(|(kind, payload)| entity_id(*kind, payload))
            .collect()
    }
}

#[async_trait]
impl SubmissionClient for ScriptedClient {
    async fn submit(&self, kind: RecordKind, payload: &Payload) -> Result<ServerAck, SubmitError> {
        self.calls.lock().unwrap().push((kind, payload.clone()));

        if self.hold.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }

        let by_entity = entity_id(kind, payload)
            .and_then(|entity| self.by_entity.lock().unwrap().get(&entity).cloned());
        if let Some(response) = by_entity {
            return response;
        }

        let scripted = self.script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(ServerAck::new(kind, 200, json!({ "success": true }))))
    }
}

/// Connectivity flag with an optional budget of online answers.
pub struct ToggleConnectivity {
    online: AtomicBool,
    online_budget: AtomicI64,
    checks: AtomicUsize,
}

impl ToggleConnectivity {
    pub fn online() -> Self {
        Self { online: AtomicBool::new(true), online_budget: AtomicI64::new(-1), checks: AtomicUsize::new(0) }
    }

    pub fn offline() -> Self {
        let oracle = Self::online();
        oracle.set(false);
        oracle
    }

    pub fn set(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Report online for the next `checks` queries, then offline.
    pub fn drop_after(&self, checks: i64) {
        self.online_budget.store(checks, Ordering::SeqCst);
    }

    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectivityOracle for ToggleConnectivity {
    async fn is_connected(&self) -> bool {
        self.checks.fetch_add(1, Ordering::SeqCst);
        if !self.online.load(Ordering::SeqCst) {
            return false;
        }

        let budget = self.online_budget.load(Ordering::SeqCst);
        if budget == 0 {
            self.set(false);
            return false;
        }
        if budget > 0 {
            self.online_budget.fetch_sub(1, Ordering::SeqCst);
        }
        true
    }
}

/// Rejection sink that remembers what it was given.
#[derive(Default)]
pub struct RecordingSink {
    rejections: Mutex<Vec<(DedupKey, u16, String)>>,
}

impl RecordingSink {
    pub fn rejections(&self) -> Vec<(DedupKey, u16, String)> {
        self.rejections.lock().unwrap().clone()
    }
}

impl RejectionSink for RecordingSink {
    fn record_rejection(&self, entry: &PendingSubmission, status: u16, message: &str) {
        self.rejections.lock().unwrap().push((entry.dedup_key.clone(), status, message.to_string()));
    }
}

/// Remote pending-payment lookup with a fixed answer.
pub struct FixedRemotePayments {
    answer: Mutex<Result<Vec<RemotePendingPayment>, SubmitError>>,
    calls: AtomicUsize,
}

impl FixedRemotePayments {
    pub fn pending(animal_ids: &[&str]) -> Arc<Self> {
        let payments = animal_ids
            .iter()
            .map(|id| RemotePendingPayment {
                animal_id: (*id).to_string(),
                amount: Some(500.0),
                action_type: Some("ownership".into()),
                extra: serde_json::Map::new(),
            })
            .collect();
        Arc::new(Self { answer: Mutex::new(Ok(payments)), calls: AtomicUsize::new(0) })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            answer: Mutex::new(Err(SubmitError::transport("connection refused"))),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemotePendingPayments for FixedRemotePayments {
    async fn fetch_pending_payments(
        &self,
        _animal_id: &str,
        _action_type: Option<&str>,
    ) -> Result<Vec<RemotePendingPayment>, SubmitError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.lock().unwrap().clone()
    }
}
