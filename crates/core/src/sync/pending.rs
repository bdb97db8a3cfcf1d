//! Pending-state queries over the local queue.

use std::sync::Arc;

use herdsync_domain::{PaymentGate, PendingSubmission, RecordKind, Result};
use tracing::{debug, warn};

use super::dedup::{action_type, entity_id};
use super::ports::{ConnectivityOracle, QueueStore, RemotePendingPayments};

struct RemoteCheck {
    payments: Arc<dyn RemotePendingPayments>,
    connectivity: Arc<dyn ConnectivityOracle>,
}

/// Answers whether an entity already has unresolved submissions.
pub struct PendingStateReader {
    store: Arc<dyn QueueStore>,
    remote: Option<RemoteCheck>,
}

impl PendingStateReader {
    pub fn new(store: Arc<dyn QueueStore>) -> Self {
        Self { store, remote: None }
    }

    /// Also consult server-side pending payments in [`Self::payment_gate`].
    pub fn with_remote(
        mut self,
        payments: Arc<dyn RemotePendingPayments>,
        connectivity: Arc<dyn ConnectivityOracle>,
    ) -> Self {
        self.remote = Some(RemoteCheck { payments, connectivity });
        self
    }

    pub async fn has_pending(&self, kind: RecordKind, entity: &str) -> Result<bool> {
        Ok(!self.list_pending(kind, entity).await?.is_empty())
    }

    /// Queued entries for `entity`, oldest first.
    pub async fn list_pending(
        &self,
        kind: RecordKind,
        entity: &str,
    ) -> Result<Vec<PendingSubmission>> {
        let entries = self.store.list(kind).await?;
        Ok(entries
            .into_iter()
            .filter(|entry| entity_id(kind, &entry.payload).as_deref() == Some(entity))
            .collect())
    }

    /// Whether a new payment may be started for `animal_id`.
    ///
    /// A locally queued payment always blocks. The server is asked only when
    /// the local queue is clear and the device is online; if that call fails
    /// the gate stays clear.
    pub async fn payment_gate(
        &self,
        animal_id: &str,
        action: Option<&str>,
    ) -> Result<PaymentGate> {
        let local = self
            .list_pending(RecordKind::Payment, animal_id)
            .await?
            .into_iter()
            .filter(|entry| match action {
                Some(wanted) => action_type(&entry.payload).as_deref() == Some(wanted),
                None => true,
            })
            .count();
        if local > 0 {
            return Ok(PaymentGate::PendingLocal(local));
        }

        let Some(remote) = &self.remote else {
            return Ok(PaymentGate::Clear);
        };
        if !remote.connectivity.is_connected().await {
            return Ok(PaymentGate::Clear);
        }

        match remote.payments.fetch_pending_payments(animal_id, action).await {
            Ok(pending) if pending.is_empty() => Ok(PaymentGate::Clear),
            Ok(pending) => {
                debug!(count = pending.len(), "Server reports pending payments");
                Ok(PaymentGate::PendingRemote(pending.len()))
            }
            Err(err) => {
                warn!(error = %err, "Pending payment lookup failed; using local state");
                Ok(PaymentGate::Clear)
            }
        }
    }
}
