//! Message Dispatcher
//!
//! Broker callback for one session: decode, then enqueue exactly once.
//! No ack/retry here; a returned error is the broker's failed delivery.
//!
//! The dispatcher is bound to the session's delivery mode. It ignores the
//! other channel, owns pushes sent to its sink path, and owns pulls carrying
//! the transfer process id its channel has claimed. Anything else on its
//! channel is only taken when no other session owns it.

use serde_json::Value;
use tracing::{debug, warn};

use super::channel::CorrelationSender;
use super::envelope::{MessageEnvelope, PullEnvelope, PushEnvelope};
use super::error::{DecodeError, DispatchError};
use super::types::DeliveryMode;
use crate::broker::{DeliveryKind, Interest, MessageHandler};

enum Route {
    Push { path: String },
    Pull,
}

pub struct MessageDispatcher {
    sender: CorrelationSender,
    route: Route,
}

impl MessageDispatcher {
    pub fn new(sender: CorrelationSender, mode: &DeliveryMode) -> Self {
        let route = match mode {
            DeliveryMode::Push { sink } => Route::Push {
                path: sink.path.clone(),
            },
            DeliveryMode::Pull => Route::Pull,
        };
        Self { sender, route }
    }

    /// Decode a raw field mapping into the envelope for its channel
    pub fn decode(
        kind: DeliveryKind,
        fields: serde_json::Value,
    ) -> Result<MessageEnvelope, DecodeError> {
        match kind {
            DeliveryKind::Push => PushEnvelope::decode(fields).map(MessageEnvelope::Push),
            DeliveryKind::Pull => PullEnvelope::decode(fields).map(MessageEnvelope::Pull),
        }
    }

    pub fn dispatch(
        &self,
        kind: DeliveryKind,
        fields: serde_json::Value,
    ) -> Result<(), DispatchError> {
        let envelope = Self::decode(kind, fields).inspect_err(|e| {
            warn!(kind = %kind, error = %e, "Rejecting malformed message");
        })?;

        match &envelope {
            MessageEnvelope::Push(push) => {
                debug!(routing_path = %push.routing_path, "Enqueueing push message");
            }
            MessageEnvelope::Pull(pull) => {
                debug!(id = %pull.id, url = %pull.request_args.url, "Enqueueing pull message");
            }
        }

        self.sender
            .enqueue(envelope)
            .map_err(|_| DispatchError::SessionClosed)
    }
}

impl MessageHandler for MessageDispatcher {
    fn interest(&self, kind: DeliveryKind, fields: &Value) -> Interest {
        match (&self.route, kind) {
            (Route::Push { path }, DeliveryKind::Push) => {
                match fields.get("routing_path").and_then(Value::as_str) {
                    Some(routing_path) if routing_path == path.as_str() => Interest::Owned,
                    _ => Interest::Open,
                }
            }
            (Route::Pull, DeliveryKind::Pull) => {
                match (fields.get("id").and_then(Value::as_str), self.sender.claimed()) {
                    (Some(id), Some(claimed)) if id == claimed.as_str() => Interest::Owned,
                    _ => Interest::Open,
                }
            }
            _ => Interest::Ignored,
        }
    }

    fn handle(&self, kind: DeliveryKind, fields: serde_json::Value) -> Result<(), DispatchError> {
        self.dispatch(kind, fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::channel::correlation_channel;
    use crate::transfer::types::{PushSink, TransferProcessId};
    use serde_json::json;
    use std::time::Duration;

    fn push_mode() -> DeliveryMode {
        DeliveryMode::Push {
            sink: PushSink::new("http://backend", "/push/key-a", "POST"),
        }
    }

    #[tokio::test]
    async fn test_push_is_enqueued() {
        let (tx, mut rx) = correlation_channel();
        let dispatcher = MessageDispatcher::new(tx, &push_mode());

        dispatcher
            .dispatch(
                DeliveryKind::Push,
                json!({"body": {"temp": 21.5}, "routing_path": "/push"}),
            )
            .unwrap();

        let env = rx.dequeue(Duration::from_secs(1)).await.unwrap();
        match env {
            MessageEnvelope::Push(push) => assert_eq!(push.body, json!({"temp": 21.5})),
            other => panic!("unexpected envelope {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_pull_missing_id_never_reaches_channel() {
        let (tx, rx) = correlation_channel();
        let dispatcher = MessageDispatcher::new(tx, &DeliveryMode::Pull);

        let err = dispatcher
            .dispatch(
                DeliveryKind::Pull,
                json!({"request_args": {"method": "GET", "url": "http://mock/api"}}),
            )
            .unwrap_err();

        assert!(matches!(err, DispatchError::Decode(_)));
        assert!(rx.is_empty());
    }

    #[tokio::test]
    async fn test_payload_decoded_per_channel() {
        // A pull-shaped payload on the push channel is malformed
        let (tx, rx) = correlation_channel();
        let dispatcher = MessageDispatcher::new(tx, &push_mode());

        let err = dispatcher
            .dispatch(
                DeliveryKind::Push,
                json!({"id": "tp-1", "request_args": {"method": "GET", "url": "http://x"}}),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Decode(DecodeError::Malformed { kind: "push", .. })
        ));
        assert!(rx.is_empty());
    }

    #[test]
    fn test_dispatch_after_session_end() {
        let (tx, rx) = correlation_channel();
        let dispatcher = MessageDispatcher::new(tx, &push_mode());
        drop(rx);

        let err = dispatcher
            .dispatch(DeliveryKind::Push, json!({"body": 1, "routing_path": "/push"}))
            .unwrap_err();
        assert_eq!(err, DispatchError::SessionClosed);
    }

    #[test]
    fn test_push_dispatcher_owns_its_sink_path_and_ignores_pulls() {
        let (tx, _rx) = correlation_channel();
        let dispatcher = MessageDispatcher::new(tx, &push_mode());

        let own = json!({"body": 1, "routing_path": "/push/key-a"});
        let other = json!({"body": 1, "routing_path": "/push/key-b"});
        let edr = json!({"id": "tp-1", "request_args": {"method": "GET", "url": "http://x"}});

        assert_eq!(dispatcher.interest(DeliveryKind::Push, &own), Interest::Owned);
        assert_eq!(dispatcher.interest(DeliveryKind::Push, &other), Interest::Open);
        assert_eq!(dispatcher.interest(DeliveryKind::Pull, &edr), Interest::Ignored);
    }

    #[test]
    fn test_pull_dispatcher_owns_claimed_id_once_known() {
        let (tx, rx) = correlation_channel();
        let dispatcher = MessageDispatcher::new(tx, &DeliveryMode::Pull);
        let edr = |id: &str| json!({"id": id, "request_args": {"method": "GET", "url": "http://x"}});

        // Before initiation nothing is owned yet
        assert_eq!(dispatcher.interest(DeliveryKind::Pull, &edr("tp-1")), Interest::Open);

        rx.claim(TransferProcessId::new("tp-1"));
        assert_eq!(dispatcher.interest(DeliveryKind::Pull, &edr("tp-1")), Interest::Owned);
        assert_eq!(dispatcher.interest(DeliveryKind::Pull, &edr("tp-2")), Interest::Open);
        assert_eq!(
            dispatcher.interest(DeliveryKind::Push, &json!({"body": 1, "routing_path": "/push"})),
            Interest::Ignored
        );
    }
}
