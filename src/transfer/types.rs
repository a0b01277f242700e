//! Transfer Types
//!
//! Inputs and outputs of a single request session.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What the caller asks for. Read-only once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferQuery {
    /// DSP protocol endpoint of the counterparty connector
    pub counterparty_protocol_url: String,
    /// Counterparty connector identifier
    pub counterparty_connector_id: String,
    /// Asset selector forwarded to the catalog query
    pub asset_query: String,
}

impl TransferQuery {
    pub fn new(
        counterparty_protocol_url: impl Into<String>,
        counterparty_connector_id: impl Into<String>,
        asset_query: impl Into<String>,
    ) -> Self {
        Self {
            counterparty_protocol_url: counterparty_protocol_url.into(),
            counterparty_connector_id: counterparty_connector_id.into(),
            asset_query: asset_query.into(),
        }
    }
}

/// Negotiation result. Opaque to the orchestrator; handed to transfer initiation as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferDetails(pub serde_json::Value);

/// Transfer process identifier minted by the counterparty. The correlation key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferProcessId(String);

impl TransferProcessId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransferProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TransferProcessId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Where the counterparty should deliver pushed data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSink {
    pub base_url: String,
    pub path: String,
    pub method: String,
}

impl PushSink {
    pub fn new(
        base_url: impl Into<String>,
        path: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            path: path.into(),
            method: method.into(),
        }
    }

    /// Fully qualified sink URL
    pub fn url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.path.trim_start_matches('/')
        )
    }
}

/// How the payload reaches us
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Counterparty sends the data to `sink`
    Push { sink: PushSink },
    /// Counterparty sends access parameters; we fetch
    Pull,
}

impl DeliveryMode {
    #[inline]
    pub fn is_provider_push(&self) -> bool {
        matches!(self, DeliveryMode::Push { .. })
    }

    pub fn sink(&self) -> Option<&PushSink> {
        match self {
            DeliveryMode::Push { sink } => Some(sink),
            DeliveryMode::Pull => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryMode::Push { .. } => "push",
            DeliveryMode::Pull => "pull",
        }
    }
}

/// Response captured from a pull-mode fetch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchedResponse {
    pub status: u16,
    /// Decoded JSON body, or the raw text as a JSON string when it isn't JSON
    pub body: serde_json::Value,
}

/// Result handed back to the caller when a session reaches `Done`
#[derive(Debug, Clone, PartialEq)]
pub enum TransferOutcome {
    /// Body of the pushed envelope, unchanged
    Pushed(serde_json::Value),
    /// Response of the downstream call described by the pull envelope
    Pulled(FetchedResponse),
}

impl TransferOutcome {
    /// The payload regardless of mode
    pub fn payload(&self) -> &serde_json::Value {
        match self {
            TransferOutcome::Pushed(body) => body,
            TransferOutcome::Pulled(resp) => &resp.body,
        }
    }
}
