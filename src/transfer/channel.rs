//! Correlation Channel
//!
//! Hands envelopes from the broker's delivery task to the one request
//! waiting for them. Unbounded, FIFO, many producers, single consumer.
//! One channel per session; never shared. The receiver records which
//! transfer process it waits for so the dispatcher can claim its messages.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

use super::envelope::MessageEnvelope;
use super::error::DequeueError;
use super::types::TransferProcessId;

// ============================================================================
// Correlation Channel
// ============================================================================

/// Producer side (held by the dispatcher)
#[derive(Clone)]
pub struct CorrelationSender {
    tx: mpsc::UnboundedSender<MessageEnvelope>,
    claim: Arc<OnceLock<TransferProcessId>>,
}

impl CorrelationSender {
    /// Enqueue without blocking.
    ///
    /// Fails only once the consumer has been dropped, handing the envelope back.
    pub fn enqueue(&self, envelope: MessageEnvelope) -> Result<(), MessageEnvelope> {
        self.tx.send(envelope).map_err(|e| e.0)
    }

    /// True once the session consumer is gone
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Transfer process the consumer waits for, once known
    pub fn claimed(&self) -> Option<&TransferProcessId> {
        self.claim.get()
    }
}

/// Consumer side (held by the orchestrator)
pub struct CorrelationReceiver {
    rx: mpsc::UnboundedReceiver<MessageEnvelope>,
    claim: Arc<OnceLock<TransferProcessId>>,
}

impl CorrelationReceiver {
    /// Record the transfer process this channel waits for. The first claim sticks.
    pub fn claim(&self, transfer_process_id: TransferProcessId) {
        if let Err(rejected) = self.claim.set(transfer_process_id) {
            debug!(rejected = %rejected, "Channel already claimed");
        }
    }

    /// Wait up to `deadline` for the next envelope.
    ///
    /// `&mut self` makes a second outstanding dequeue impossible.
    pub async fn dequeue(&mut self, deadline: Duration) -> Result<MessageEnvelope, DequeueError> {
        let started = Instant::now();

        match tokio::time::timeout(deadline, self.rx.recv()).await {
            Ok(Some(envelope)) => {
                debug!(
                    kind = envelope.kind(),
                    waited = ?started.elapsed(),
                    "Envelope dequeued"
                );
                Ok(envelope)
            }
            Ok(None) => Err(DequeueError::Closed),
            Err(_) => Err(DequeueError::Timeout {
                elapsed: started.elapsed(),
            }),
        }
    }

    /// Number of envelopes waiting
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

/// Create a fresh channel pair for one session
pub fn correlation_channel() -> (CorrelationSender, CorrelationReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let claim = Arc::new(OnceLock::new());
    (
        CorrelationSender {
            tx,
            claim: claim.clone(),
        },
        CorrelationReceiver { rx, claim },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::envelope::PushEnvelope;
    use serde_json::json;

    fn push(n: u64) -> MessageEnvelope {
        MessageEnvelope::Push(PushEnvelope {
            body: json!({ "seq": n }),
            routing_path: "/push".to_string(),
        })
    }

    #[tokio::test]
    async fn test_dequeue_preserves_fifo_order() {
        let (tx, mut rx) = correlation_channel();
        for n in 0..5 {
            tx.enqueue(push(n)).unwrap();
        }
        assert_eq!(rx.len(), 5);

        for n in 0..5 {
            let env = rx.dequeue(Duration::from_secs(1)).await.unwrap();
            assert_eq!(env, push(n));
        }
        assert!(rx.is_empty());
    }

    #[tokio::test]
    async fn test_dequeue_wakes_on_concurrent_enqueue() {
        let (tx, mut rx) = correlation_channel();

        let producer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            tx.enqueue(push(7)).unwrap();
        });

        let env = rx.dequeue(Duration::from_secs(5)).await.unwrap();
        assert_eq!(env, push(7));
        producer.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_dequeue_times_out_after_deadline() {
        let (_tx, mut rx) = correlation_channel();
        let deadline = Duration::from_secs(30);

        let err = rx.dequeue(deadline).await.unwrap_err();
        match err {
            DequeueError::Timeout { elapsed } => {
                assert!(elapsed >= deadline);
                assert!(elapsed < deadline + Duration::from_millis(50));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dequeue_reports_closed_when_producers_dropped() {
        let (tx, mut rx) = correlation_channel();
        drop(tx);
        assert_eq!(
            rx.dequeue(Duration::from_secs(1)).await.unwrap_err(),
            DequeueError::Closed
        );
    }

    #[test]
    fn test_claim_is_visible_to_every_sender_and_sticks() {
        let (tx, rx) = correlation_channel();
        let other = tx.clone();
        assert!(tx.claimed().is_none());

        rx.claim(TransferProcessId::new("tp-1"));
        rx.claim(TransferProcessId::new("tp-2"));

        assert_eq!(tx.claimed().map(|id| id.as_str()), Some("tp-1"));
        assert_eq!(other.claimed().map(|id| id.as_str()), Some("tp-1"));
    }

    #[tokio::test]
    async fn test_enqueue_after_consumer_dropped_returns_envelope() {
        let (tx, rx) = correlation_channel();
        drop(rx);
        assert!(tx.is_closed());
        let back = tx.enqueue(push(1)).unwrap_err();
        assert_eq!(back, push(1));
    }
}
