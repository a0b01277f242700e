//! Message Envelopes
//!
//! The two message shapes delivered by the broker:
//!
//! ```text
//! push: { "body": <json>, "routing_path": "/push/..." }
//! pull: { "id": "<tp id>", "request_args": { "method", "url", "headers"?, "params"?, "json"?, "data"? } }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::error::DecodeError;

/// Data pushed by the counterparty to our sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushEnvelope {
    pub body: serde_json::Value,
    /// Request path the counterparty called on the consumer backend
    pub routing_path: String,
}

/// Parameters of the downstream HTTP call, taken verbatim from the counterparty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestArgs {
    pub method: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
    /// JSON request body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<serde_json::Value>,
    /// Raw request body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl RequestArgs {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            headers: BTreeMap::new(),
            params: BTreeMap::new(),
            json: None,
            data: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Access parameters for data the consumer must fetch itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullEnvelope {
    /// Opaque correlation token; compared, never interpreted
    pub id: String,
    pub request_args: RequestArgs,
}

/// A decoded broker message
#[derive(Debug, Clone, PartialEq)]
pub enum MessageEnvelope {
    Push(PushEnvelope),
    Pull(PullEnvelope),
}

impl MessageEnvelope {
    /// Correlation identifier, when the shape carries one
    pub fn id(&self) -> Option<&str> {
        match self {
            MessageEnvelope::Push(_) => None,
            MessageEnvelope::Pull(pull) => Some(&pull.id),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MessageEnvelope::Push(_) => "push",
            MessageEnvelope::Pull(_) => "pull",
        }
    }
}

impl PushEnvelope {
    /// Decode from a broker field mapping
    pub fn decode(fields: serde_json::Value) -> Result<Self, DecodeError> {
        decode_fields(fields, "push")
    }
}

impl PullEnvelope {
    /// Decode from a broker field mapping
    pub fn decode(fields: serde_json::Value) -> Result<Self, DecodeError> {
        decode_fields(fields, "pull")
    }
}

fn decode_fields<T: serde::de::DeserializeOwned>(
    fields: serde_json::Value,
    kind: &'static str,
) -> Result<T, DecodeError> {
    if !fields.is_object() {
        return Err(DecodeError::NotAMapping { kind });
    }
    serde_json::from_value(fields).map_err(|e| DecodeError::Malformed {
        kind,
        reason: e.to_string(),
    })
}
