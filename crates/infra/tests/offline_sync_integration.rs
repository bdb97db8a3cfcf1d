//! End-to-end offline sync against SQLite and a stubbed livestock API.

#[path = "support.rs"]
mod support;

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use herdsync_core::{PendingStateReader, QueueStore, SyncCoordinator};
use herdsync_domain::{PaymentGate, QueueReason, RecordKind, SubmitOutcome, SyncConfig};
use herdsync_infra::connectivity::ConnectivityState;
use herdsync_infra::sync::{SyncWorker, SyncWorkerConfig};
use serde_json::json;
use support::{client_for, ownership_change, payment, TestDatabase};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_payment_ack(server: &MockServer, expected: u64) {
    Mock::given(method("POST"))
        .and(path("/payment/process"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(expected)
        .mount(server)
        .await;
}

async fn wait_until<F>(mut condition: F)
where
    F: FnMut() -> futures::future::BoxFuture<'static, bool>,
{
    for _ in 0..100 {
        if condition().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test(flavor = "multi_thread")]
async fn offline_payment_is_queued_once_and_delivered_after_reconnect() {
    let db = TestDatabase::new();
    let server = MockServer::start().await;
    mount_payment_ack(&server, 1).await;

    let state = ConnectivityState::new(false);
    let store = db.store();
    let coordinator =
        SyncCoordinator::new(store.clone(), client_for(&server), Arc::new(state.clone()));

    let first = coordinator.try_submit_now(RecordKind::Payment, payment("A1")).await.unwrap();
    let second = coordinator.try_submit_now(RecordKind::Payment, payment("A1")).await.unwrap();

    assert!(matches!(first, SubmitOutcome::Queued { reason: QueueReason::Offline, .. }));
    assert!(matches!(second, SubmitOutcome::Queued { reason: QueueReason::AlreadyQueued, .. }));
    assert_eq!(store.list(RecordKind::Payment).await.unwrap().len(), 1);

    state.set_connected(true);
    let report = coordinator.drain_queue(RecordKind::Payment).await.unwrap();

    assert_eq!(report.delivered, 1);
    assert!(store.list(RecordKind::Payment).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn queued_entries_survive_a_restart_and_drain() {
    let db = TestDatabase::new();
    let server = MockServer::start().await;
    mount_payment_ack(&server, 2).await;

    {
        let store = db.store();
        store.enqueue(RecordKind::Payment, payment("A1")).await.unwrap();
        store.enqueue(RecordKind::Payment, payment("A2")).await.unwrap();
    }

    let reopened = db.reopen();
    let coordinator = SyncCoordinator::new(
        reopened.clone(),
        client_for(&server),
        Arc::new(ConnectivityState::new(true)),
    );

    let summary = coordinator.drain_all().await;

    assert!(summary.is_clean());
    assert_eq!(summary.delivered(), 2);
    assert!(reopened.list(RecordKind::Payment).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn transport_failure_is_retained_with_attempt_recorded() {
    let db = TestDatabase::new();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/payment/process"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({ "message": "maintenance" })))
        .mount(&server)
        .await;

    let store = db.store();
    store.enqueue(RecordKind::Payment, payment("A1")).await.unwrap();
    store.enqueue(RecordKind::Payment, payment("A2")).await.unwrap();
    let coordinator = SyncCoordinator::new(
        store.clone(),
        client_for(&server),
        Arc::new(ConnectivityState::new(true)),
    );

    let report = coordinator.drain_queue(RecordKind::Payment).await.unwrap();

    assert_eq!(report.delivered, 0);
    assert_eq!(report.retained, 2);
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1, "the failing head must stop the pass");

    let entries = store.list(RecordKind::Payment).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].attempts, 1);
    assert_eq!(entries[0].last_error.as_deref(), Some("HTTP 503: maintenance"));
    assert_eq!(entries[1].attempts, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn rejected_entry_is_dropped_and_later_entries_still_deliver() {
    let db = TestDatabase::new();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ownership/change"))
        .and(body_partial_json(json!({ "animalId": "A1" })))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "error": "animal not found" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/ownership/change"))
        .and(body_partial_json(json!({ "animalId": "A2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let store = db.store();
    store.enqueue(RecordKind::OwnershipChange, ownership_change("A1", "O9")).await.unwrap();
    store.enqueue(RecordKind::OwnershipChange, ownership_change("A2", "O9")).await.unwrap();
    let coordinator = SyncCoordinator::new(
        store.clone(),
        client_for(&server),
        Arc::new(ConnectivityState::new(true)),
    );

    let report = coordinator.drain_queue(RecordKind::OwnershipChange).await.unwrap();

    assert_eq!((report.delivered, report.rejected, report.retained), (1, 1, 0));
    assert!(store.list(RecordKind::OwnershipChange).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn reconnect_order_blocks_behind_a_failing_payment() {
    let db = TestDatabase::new();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/payment/process"))
        .and(body_partial_json(json!({ "animalId": "A1" })))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/payment/process"))
        .and(body_partial_json(json!({ "animalId": "A2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let store = db.store();
    store.enqueue(RecordKind::Payment, payment("A2")).await.unwrap();
    store.enqueue(RecordKind::Payment, payment("A1")).await.unwrap();
    let coordinator = SyncCoordinator::new(
        store.clone(),
        client_for(&server),
        Arc::new(ConnectivityState::new(true)),
    );

    let report = coordinator.drain_queue(RecordKind::Payment).await.unwrap();

    assert_eq!((report.delivered, report.retained), (1, 1));
    let remaining: Vec<_> = store
        .list(RecordKind::Payment)
        .await
        .unwrap()
        .iter()
        .filter_map(|entry| entry.payload.text(&["animalId"]))
        .collect();
    assert_eq!(remaining, vec!["A1"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_enqueues_lose_no_updates() {
    let db = TestDatabase::new();
    let store = db.store();

    let tasks = (0..32).map(|i| {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            store.enqueue(RecordKind::Payment, payment(&format!("A{i}"))).await.unwrap()
        })
    });
    for joined in join_all(tasks).await {
        assert!(!joined.unwrap().duplicate);
    }

    assert_eq!(store.list(RecordKind::Payment).await.unwrap().len(), 32);
}

#[tokio::test(flavor = "multi_thread")]
async fn two_stores_on_one_file_lose_no_updates() {
    let db = TestDatabase::new();
    let left = db.store();
    let right = db.reopen();

    let tasks = (0..20).map(|i| {
        let store = if i % 2 == 0 { Arc::clone(&left) } else { Arc::clone(&right) };
        tokio::spawn(async move {
            store.enqueue(RecordKind::Payment, payment(&format!("A{i}"))).await.unwrap()
        })
    });
    for joined in join_all(tasks).await {
        joined.unwrap();
    }

    assert_eq!(left.list(RecordKind::Payment).await.unwrap().len(), 20);
}

#[tokio::test(flavor = "multi_thread")]
async fn corrupt_queue_reads_empty_and_accepts_new_entries() {
    let db = TestDatabase::new();
    db.execute(
        "INSERT INTO offline_queues (name, entries_json, updated_at) VALUES (?1, ?2, 0)",
        &[&"offlinePaymentQueue", &"[{\"broken\": true"],
    );
    let store = db.store();

    assert!(store.list(RecordKind::Payment).await.unwrap().is_empty());
    assert_eq!(db.raw_queue("offlinePaymentQueue").as_deref(), Some("[]"));

    store.enqueue(RecordKind::Payment, payment("A1")).await.unwrap();
    assert_eq!(store.list(RecordKind::Payment).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn binary_queue_row_does_not_block_offline_capture() {
    let db = TestDatabase::new();
    db.execute(
        "INSERT INTO offline_queues (name, entries_json, updated_at) VALUES (?1, X'FFFE00', 0)",
        &[&"offlinePaymentQueue"],
    );
    let store = db.store();
    let coordinator = SyncCoordinator::new(
        store.clone(),
        client_for(&MockServer::start().await),
        Arc::new(ConnectivityState::new(false)),
    );

    let outcome = coordinator.try_submit_now(RecordKind::Payment, payment("A1")).await.unwrap();

    assert!(matches!(outcome, SubmitOutcome::Queued { reason: QueueReason::Offline, .. }));
    assert_eq!(store.list(RecordKind::Payment).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn payment_gate_checks_local_queue_then_server() {
    let db = TestDatabase::new();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/payment/pending"))
        .and(query_param("animal_id", "A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "pending": [{ "animal_id": "A2", "amount": 500.0, "action_type": "ownership" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = db.store();
    store.enqueue(RecordKind::Payment, payment("A1")).await.unwrap();
    let reader = PendingStateReader::new(store)
        .with_remote(client_for(&server), Arc::new(ConnectivityState::new(true)));

    assert_eq!(reader.payment_gate("A1", None).await.unwrap(), PaymentGate::PendingLocal(1));
    assert_eq!(reader.payment_gate("A2", None).await.unwrap(), PaymentGate::PendingRemote(1));
}

#[tokio::test(flavor = "multi_thread")]
async fn worker_drains_when_connectivity_returns() {
    let db = TestDatabase::new();
    let server = MockServer::start().await;
    mount_payment_ack(&server, 1).await;

    let state = ConnectivityState::new(false);
    let store = db.store();
    let coordinator = Arc::new(SyncCoordinator::new(
        store.clone(),
        client_for(&server),
        Arc::new(state.clone()),
    ));
    coordinator.try_submit_now(RecordKind::Payment, payment("A1")).await.unwrap();

    let sync = SyncConfig { poll_interval_seconds: 3600, ..SyncConfig::default() };
    let config = SyncWorkerConfig::from(&sync);
    let mut worker = SyncWorker::new(coordinator, Arc::new(state.clone()), config)
        .with_notifications(state.clone());
    worker.start().await.unwrap();

    state.set_connected(true);
    wait_until(|| {
        let store = Arc::clone(&store);
        Box::pin(async move { store.list(RecordKind::Payment).await.unwrap().is_empty() })
    })
    .await;

    worker.stop().await.unwrap();
    assert!(!worker.is_running());
}

async fn wait_for_passes(worker: &SyncWorker, passes: u64) {
    for _ in 0..100 {
        if worker.completed_passes() >= passes {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("worker never reached {passes} passes");
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.map_or(0, |requests| requests.len())
}

#[tokio::test(flavor = "multi_thread")]
async fn slow_ack_is_never_resent_after_the_pass_budget() {
    let db = TestDatabase::new();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/payment/process"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": true }))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let state = ConnectivityState::new(true);
    let store = db.store();
    store.enqueue(RecordKind::Payment, payment("A1")).await.unwrap();
    store.enqueue(RecordKind::Payment, payment("A2")).await.unwrap();
    let coordinator =
        Arc::new(SyncCoordinator::new(store.clone(), client_for(&server), Arc::new(state.clone())));

    let config = SyncWorkerConfig {
        poll_interval: Duration::from_secs(3600),
        drain_timeout: Duration::from_millis(100),
        join_timeout: Duration::from_secs(2),
        drain_on_start: false,
    };
    let mut worker = SyncWorker::new(coordinator, Arc::new(state), config);
    worker.start().await.unwrap();

    worker.trigger();
    wait_for_passes(&worker, 1).await;
    assert_eq!(request_count(&server).await, 1);
    let remaining = store.list(RecordKind::Payment).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].payload.text(&["animalId"]).as_deref(), Some("A2"));

    worker.trigger();
    wait_for_passes(&worker, 2).await;
    assert_eq!(request_count(&server).await, 2);
    assert!(store.list(RecordKind::Payment).await.unwrap().is_empty());

    worker.stop().await.unwrap();
}
