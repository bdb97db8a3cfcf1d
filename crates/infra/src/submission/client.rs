//! HTTP submission client for the livestock API
//!
//! Maps each record kind to its endpoint and request shape, then folds the
//! response into the two-way transport/server classification the
//! coordinator acts on.
//!
//! | Response                           | Result                    |
//! |------------------------------------|---------------------------|
//! | connect error, timeout, send error | `Transport`               |
//! | 5xx, 408, 429                      | `Transport`               |
//! | other 4xx                          | `Server`                  |
//! | 2xx with `"success": false`        | `Server`                  |
//! | other 2xx                          | `ServerAck`               |
//!
//! Payloads with attachments go out as multipart forms, the rest as JSON.
//! Payload contents are never logged.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use herdsync_core::{RemotePendingPayments, SubmissionClient, SubmitError};
use herdsync_domain::constants::PAYMENT_PENDING_PATH;
use herdsync_domain::{
    ApiConfig, Attachment, HerdSyncError, Payload, RecordKind, RemotePendingPayment, ServerAck,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::http::client::is_retryable_status;
use crate::http::HttpClient;

/// Configuration for [`HttpSubmissionClient`].
#[derive(Debug, Clone)]
pub struct SubmissionClientConfig {
    /// Base URL of the API, e.g. `http://10.0.2.2:5000`.
    pub base_url: String,
    /// Bound on every request.
    pub timeout: Duration,
    /// Total attempts per call, including the first.
    pub max_attempts: usize,
}

impl Default for SubmissionClientConfig {
    fn default() -> Self {
        Self::from(&ApiConfig::default())
    }
}

impl From<&ApiConfig> for SubmissionClientConfig {
    fn from(config: &ApiConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
            max_attempts: config.max_attempts,
        }
    }
}

/// reqwest-backed implementation of the submission and pending-payment
/// ports.
pub struct HttpSubmissionClient {
    http: Arc<HttpClient>,
    config: SubmissionClientConfig,
}

impl HttpSubmissionClient {
    /// # Errors
    ///
    /// Returns `Config` if the underlying HTTP client cannot be built.
    pub fn new(config: SubmissionClientConfig) -> Result<Self, HerdSyncError> {
        let http = HttpClient::builder()
            .timeout(config.timeout)
            .max_attempts(config.max_attempts)
            .build()
            .map_err(|err| HerdSyncError::Config(format!("failed to build HTTP client: {err}")))?;

        Ok(Self { http: Arc::new(http), config })
    }

    pub fn config(&self) -> &SubmissionClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn send(&self, kind: RecordKind, payload: &Payload) -> Result<Response, SubmitError> {
        let url = self.url(kind.endpoint());

        let result = if payload.has_attachments() {
            self.http.send_with(|http| multipart_request(http, &url, payload)).await
        } else {
            let body = Value::Object(payload.to_json_object());
            self.http.send(self.http.request(Method::POST, &url).json(&body)).await
        };

        result.map_err(into_submit_error)
    }
}

#[async_trait]
impl SubmissionClient for HttpSubmissionClient {
    #[instrument(skip(self, payload), fields(kind = %kind))]
    async fn submit(&self, kind: RecordKind, payload: &Payload) -> Result<ServerAck, SubmitError> {
        let response = self.send(kind, payload).await?;
        let (status, body) = read_body(response).await?;
        let outcome = classify_response(kind, status, body);

        match &outcome {
            Ok(ack) => debug!(status = ack.status, "submission accepted"),
            Err(err) => debug!(error = %err, "submission failed"),
        }
        outcome
    }
}

#[async_trait]
impl RemotePendingPayments for HttpSubmissionClient {
    #[instrument(skip(self))]
    async fn fetch_pending_payments(
        &self,
        animal_id: &str,
        action_type: Option<&str>,
    ) -> Result<Vec<RemotePendingPayment>, SubmitError> {
        let mut query = vec![("animal_id", animal_id)];
        if let Some(action) = action_type {
            query.push(("action_type", action));
        }

        let builder = self.http.request(Method::GET, self.url(PAYMENT_PENDING_PATH)).query(&query);
        let response = self.http.send(builder).await.map_err(into_submit_error)?;
        let (status, body) = read_body(response).await?;
        let ack = classify_response(RecordKind::Payment, status, body)?;

        match ack.body.get("pending") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(pending) => serde_json::from_value(pending.clone()).map_err(|err| {
                warn!(error = %err, "unexpected pending payments body");
                SubmitError::transport(format!("unexpected pending payments body: {err}"))
            }),
        }
    }
}

fn multipart_request(http: &ReqwestClient, url: &str, payload: &Payload) -> RequestBuilder {
    let mut form = Form::new();
    for (name, value) in payload.fields() {
        if let Some(text) = form_text(value) {
            form = form.text(name.to_string(), text);
        }
    }
    for (name, attachment) in payload.attachments() {
        form = form.part(name.to_string(), file_part(attachment));
    }
    http.post(url).multipart(form)
}

fn form_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn file_part(attachment: &Attachment) -> Part {
    let part = || Part::bytes(attachment.bytes.clone()).file_name(attachment.file_name.clone());
    part().mime_str(&attachment.content_type).unwrap_or_else(|_| part())
}

async fn read_body(response: Response) -> Result<(StatusCode, Value), SubmitError> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|err| SubmitError::transport(format!("failed to read response body: {err}")))?;

    let body = if text.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::Null)
    };
    Ok((status, body))
}

/// Fold an HTTP status and parsed body into the submission outcome.
pub(crate) fn classify_response(
    kind: RecordKind,
    status: StatusCode,
    body: Value,
) -> Result<ServerAck, SubmitError> {
    let code = status.as_u16();

    if is_retryable_status(status) {
        let detail = body_message(&body).map(|message| format!(": {message}")).unwrap_or_default();
        return Err(SubmitError::transport(format!("HTTP {code}{detail}")));
    }

    if status.is_client_error() {
        return Err(SubmitError::server(code, message_or_reason(&body, status)));
    }

    if !status.is_success() {
        return Err(SubmitError::transport(format!("unexpected HTTP status {code}")));
    }

    if body.get("success").and_then(Value::as_bool) == Some(false) {
        return Err(SubmitError::server(code, message_or_reason(&body, status)));
    }

    Ok(ServerAck::new(kind, code, body))
}

fn body_message(body: &Value) -> Option<String> {
    ["message", "error"]
        .iter()
        .find_map(|key| body.get(key).and_then(Value::as_str))
        .map(ToOwned::to_owned)
}

fn message_or_reason(body: &Value, status: StatusCode) -> String {
    body_message(body)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request rejected").to_string())
}

fn into_submit_error(err: HerdSyncError) -> SubmitError {
    match err {
        HerdSyncError::Server { status, message } => SubmitError::Server { status, message },
        HerdSyncError::Transport(message) => SubmitError::Transport(message),
        other => SubmitError::Transport(other.to_string()),
    }
}
