//! Trigger event parsing.

use serde_json::Value;
use thiserror::Error;

/// Errors raised while interpreting a trigger event.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("Object event carries no object key")]
    MissingObjectKey,

    #[error("Object key is not valid UTF-8 after decoding: {0}")]
    InvalidObjectKey(String),
}

/// What woke the reconciler up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerEvent {
    /// A new analysis document was stored under `document_key`.
    ObjectCreated { document_key: String },
    /// Periodic retry sweep.
    Scheduled,
}

impl TriggerEvent {
    /// Interpret a raw event document.
    ///
    /// Documents with a `Records` array are storage notifications; the key of
    /// the first record is form-decoded. Anything else is a scheduled trigger.
    pub fn from_value(event: &Value) -> Result<Self, EventError> {
        let Some(records) = event.get("Records") else {
            return Ok(TriggerEvent::Scheduled);
        };

        let raw_key = records
            .get(0)
            .and_then(|r| r.pointer("/s3/object/key"))
            .and_then(Value::as_str)
            .ok_or(EventError::MissingObjectKey)?;

        Ok(TriggerEvent::ObjectCreated {
            document_key: decode_object_key(raw_key)?,
        })
    }
}

/// Object keys arrive form-encoded: `+` is a space, the rest percent-encoded.
fn decode_object_key(raw: &str) -> Result<String, EventError> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|key| key.into_owned())
        .map_err(|_| EventError::InvalidObjectKey(raw.to_string()))
}
