//! Opaque submission payloads.
//!
//! A payload is a sorted key→value map. Values are plain JSON fields or named
//! binary attachments (captured images). Attachments carry their bytes so the
//! request can be rebuilt after a restart; nothing transient is stored.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{HerdSyncError, Result};

/// Binary attachment such as a side image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// JPEG image named after the side it shows (`front.jpg`, ...).
    pub fn jpeg(side: &str, bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(format!("{side}.jpg"), "image/jpeg", bytes)
    }
}

/// A single payload value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadValue {
    Field(Value),
    Attachment(Attachment),
}

/// Opaque key→value submission payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(BTreeMap<String, PayloadValue>);

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a payload from a JSON object; every member becomes a field.
    ///
    /// # Errors
    /// Returns `InvalidPayload` if `value` is not an object.
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(map.into()),
            other => Err(HerdSyncError::InvalidPayload(format!(
                "payload must be a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Builder form of [`insert_field`](Self::insert_field).
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert_field(key, value);
        self
    }

    /// Builder form of [`insert_attachment`](Self::insert_attachment).
    pub fn with_attachment(mut self, key: impl Into<String>, attachment: Attachment) -> Self {
        self.insert_attachment(key, attachment);
        self
    }

    /// Set a plain field, replacing any value under the same key.
    pub fn insert_field(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), PayloadValue::Field(value.into()));
    }

    /// Set a binary attachment, replacing any value under the same key.
    pub fn insert_attachment(&mut self, key: impl Into<String>, attachment: Attachment) {
        self.0.insert(key.into(), PayloadValue::Attachment(attachment));
    }

    /// Raw value for `key`.
    pub fn get(&self, key: &str) -> Option<&PayloadValue> {
        self.0.get(key)
    }

    /// Plain field value for `key`, ignoring attachments.
    pub fn field(&self, key: &str) -> Option<&Value> {
        match self.0.get(key) {
            Some(PayloadValue::Field(value)) => Some(value),
            _ => None,
        }
    }

    /// Canonical text of the first present, non-empty field among `aliases`.
    pub fn text(&self, aliases: &[&str]) -> Option<String> {
        aliases.iter().find_map(|key| self.field(key).and_then(canonical_text))
    }

    /// True when the payload must be sent as multipart.
    pub fn has_attachments(&self) -> bool {
        self.0.values().any(|value| matches!(value, PayloadValue::Attachment(_)))
    }

    /// Plain fields in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().filter_map(|(key, value)| match value {
            PayloadValue::Field(field) => Some((key.as_str(), field)),
            PayloadValue::Attachment(_) => None,
        })
    }

    /// Attachments in insertion order.
    pub fn attachments(&self) -> impl Iterator<Item = (&str, &Attachment)> {
        self.0.iter().filter_map(|(key, value)| match value {
            PayloadValue::Attachment(attachment) => Some((key.as_str(), attachment)),
            PayloadValue::Field(_) => None,
        })
    }

    /// JSON object holding the plain fields. Attachments are left out.
    pub fn to_json_object(&self) -> Map<String, Value> {
        self.fields().map(|(key, value)| (key.to_string(), value.clone())).collect()
    }

    /// Number of fields and attachments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the payload has no members.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Payload {
    fn from(map: Map<String, Value>) -> Self {
        Self(map.into_iter().map(|(key, value)| (key, PayloadValue::Field(value))).collect())
    }
}

/// Canonical text form of a field value.
///
/// Null and blank strings have no canonical form.
pub fn canonical_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) if text.trim().is_empty() => None,
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        other => serde_json::to_string(other).ok(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded.as_bytes()).map_err(serde::de::Error::custom)
    }
}
