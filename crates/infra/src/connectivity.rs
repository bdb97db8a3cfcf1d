//! Connectivity oracles
//!
//! [`ConnectivityState`] holds the flag set by platform network callbacks and
//! lets the sync worker subscribe to changes. [`HttpProbeConnectivity`]
//! answers by sending a short `HEAD` request to the API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use herdsync_core::ConnectivityOracle;
use herdsync_domain::{ApiConfig, HerdSyncError, SyncConfig};
use reqwest::Method;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::http::HttpClient;

/// Shared connectivity flag with change notification.
#[derive(Clone)]
pub struct ConnectivityState {
    tx: Arc<watch::Sender<bool>>,
}

impl ConnectivityState {
    pub fn new(connected: bool) -> Self {
        let (tx, _rx) = watch::channel(connected);
        Self { tx: Arc::new(tx) }
    }

    /// Record the latest reachability. Returns the previous value.
    pub fn set_connected(&self, connected: bool) -> bool {
        let previous = self.tx.send_replace(connected);
        if previous != connected {
            info!(connected, "connectivity changed");
        }
        previous
    }

    pub fn current(&self) -> bool {
        *self.tx.borrow()
    }

    /// Receiver that wakes on every change.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for ConnectivityState {
    fn default() -> Self {
        Self::new(false)
    }
}

#[async_trait]
impl ConnectivityOracle for ConnectivityState {
    async fn is_connected(&self) -> bool {
        self.current()
    }
}

/// Probes the API with a `HEAD` request. Any HTTP response counts as online.
pub struct HttpProbeConnectivity {
    http: HttpClient,
    url: String,
    state: Option<ConnectivityState>,
}

impl HttpProbeConnectivity {
    /// # Errors
    ///
    /// Returns `Config` if the probe client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, HerdSyncError> {
        let http = HttpClient::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .max_attempts(1)
            .build()
            .map_err(|err| HerdSyncError::Config(format!("failed to build probe client: {err}")))?;

        Ok(Self { http, url: url.into(), state: None })
    }

    pub fn from_config(api: &ApiConfig, sync: &SyncConfig) -> Result<Self, HerdSyncError> {
        Self::new(api.base_url.clone(), Duration::from_secs(sync.probe_timeout_secs))
    }

    /// Publish every probe result to `state`.
    pub fn with_state(mut self, state: ConnectivityState) -> Self {
        self.state = Some(state);
        self
    }

    pub async fn probe(&self) -> bool {
        let connected = match self.http.send(self.http.request(Method::HEAD, &self.url)).await {
            Ok(response) => {
                debug!(status = %response.status(), "connectivity probe answered");
                true
            }
            Err(err) => {
                debug!(error = %err, "connectivity probe failed");
                false
            }
        };

        if let Some(state) = &self.state {
            state.set_connected(connected);
        }
        connected
    }
}

#[async_trait]
impl ConnectivityOracle for HttpProbeConnectivity {
    async fn is_connected(&self) -> bool {
        self.probe().await
    }
}
