//! Transfer Error Types
//!
//! Every session failure is terminal; nothing here is retried internally.
//! Callers pick their own re-entry point from the variant.

use std::time::Duration;

use thiserror::Error;

use super::types::TransferProcessId;
use crate::broker::BrokerError;

/// Broker payload did not match the expected envelope shape
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("{kind} message is not a field mapping")]
    NotAMapping { kind: &'static str },

    #[error("malformed {kind} message: {reason}")]
    Malformed { kind: &'static str, reason: String },
}

/// Handler-side delivery failure, reported back to the broker
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("session consumer is gone")]
    SessionClosed,
}

/// Negotiation collaborator failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NegotiationError {
    #[error("counterparty unreachable: {0}")]
    Unreachable(String),

    #[error("contract refused: {0}")]
    Refused(String),

    #[error("negotiation timed out: {0}")]
    Timeout(String),
}

/// Transfer-initiation collaborator failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("transfer initiation failed: {0}")]
pub struct TransferError(pub String);

/// Outbound pull call failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("request to {url} failed: {reason}")]
    Network { url: String, reason: String },

    /// Non-2xx answer; `body` is the response text as received
    #[error("{url} answered with status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
}

/// Channel-level wait failure
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DequeueError {
    #[error("no message within {elapsed:?}")]
    Timeout { elapsed: Duration },

    #[error("all producers are gone")]
    Closed,
}

/// Session-level failure surfaced to the caller
#[derive(Error, Debug, Clone)]
pub enum SessionError {
    #[error(transparent)]
    Negotiation(#[from] NegotiationError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error("correlation mismatch: expected {expected}, received {received}")]
    Correlation {
        expected: TransferProcessId,
        /// Identifier (or envelope kind when it carries none) that arrived
        received: String,
    },

    #[error("no message for transfer process {transfer_process_id} after {elapsed:?}")]
    Timeout {
        elapsed: Duration,
        transfer_process_id: TransferProcessId,
    },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error("correlation channel closed while waiting for {transfer_process_id}")]
    ChannelClosed {
        transfer_process_id: TransferProcessId,
    },

    #[error("orchestrator already used (state {0})")]
    AlreadyUsed(&'static str),
}

impl SessionError {
    /// Stable error code for logs and API responses
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::Negotiation(_) => "NEGOTIATION_ERROR",
            SessionError::Transfer(_) => "TRANSFER_ERROR",
            SessionError::Correlation { .. } => "CORRELATION_ERROR",
            SessionError::Timeout { .. } => "TIMEOUT_ERROR",
            SessionError::Fetch(_) => "FETCH_ERROR",
            SessionError::Broker(_) => "BROKER_ERROR",
            SessionError::ChannelClosed { .. } => "CHANNEL_CLOSED",
            SessionError::AlreadyUsed(_) => "ALREADY_USED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            SessionError::from(NegotiationError::Refused("policy".into())).code(),
            "NEGOTIATION_ERROR"
        );
        assert_eq!(
            SessionError::from(TransferError("boom".into())).code(),
            "TRANSFER_ERROR"
        );
        assert_eq!(
            SessionError::Timeout {
                elapsed: Duration::from_secs(30),
                transfer_process_id: "tp-1".into(),
            }
            .code(),
            "TIMEOUT_ERROR"
        );
    }

    #[test]
    fn test_display_carries_context() {
        let err = SessionError::Correlation {
            expected: "tp-3".into(),
            received: "tp-9".into(),
        };
        assert_eq!(
            err.to_string(),
            "correlation mismatch: expected tp-3, received tp-9"
        );

        let err = SessionError::Timeout {
            elapsed: Duration::from_secs(60),
            transfer_process_id: "tp-4".into(),
        };
        assert!(err.to_string().contains("tp-4"));
        assert!(err.to_string().contains("60s"));
    }

    #[test]
    fn test_decode_wraps_into_dispatch() {
        let err: DispatchError = DecodeError::NotAMapping { kind: "push" }.into();
        assert_eq!(err.to_string(), "push message is not a field mapping");
    }
}
