//! Server acknowledgements and response bodies.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::record::RecordKind;
use crate::errors::{HerdSyncError, Result};

/// Accepted submission as reported by the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerAck {
    pub kind: RecordKind,
    pub status: u16,
    pub message: Option<String>,
    /// Parsed JSON body, `Null` when the body was empty or not JSON.
    pub body: Value,
}

impl ServerAck {
    pub fn new(kind: RecordKind, status: u16, body: Value) -> Self {
        let message = body.get("message").and_then(Value::as_str).map(ToOwned::to_owned);
        Self { kind, status, message, body }
    }

    /// Decode the body into a typed receipt.
    ///
    /// # Errors
    /// Returns `Internal` if the body does not have the expected shape.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.body.clone()).map_err(|err| {
            HerdSyncError::Internal(format!("unexpected {} response body: {err}", self.kind))
        })
    }
}

/// Body of a successful `POST /register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationReceipt {
    pub animal_id: String,
    pub owner_id: String,
}

/// Body of a successful `POST /verify`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VerificationReceipt {
    #[serde(default)]
    pub match_found: bool,
    pub animal_id: Option<String>,
    pub owner_id: Option<String>,
    pub owner_name: Option<String>,
    pub owner_phone: Option<String>,
    pub owner_location: Option<String>,
    #[serde(default)]
    pub hints: Vec<String>,
    pub verification_id: Option<String>,
}

/// Payment awaiting completion on the server side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemotePendingPayment {
    pub animal_id: String,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub action_type: Option<String>,
    /// Remaining fields the server sent along.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}
