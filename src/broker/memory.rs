//! In-process broker
//!
//! Routed delivery in publish order: a message goes to every subscription
//! that owns it, or, when none does, to every subscription open to it.
//! Failed deliveries land in a bounded dead-letter list.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{BrokerError, DeliveryKind, Interest, MessageBroker, MessageHandler, Subscription};

const MAX_DEAD_LETTERS: usize = 1024;

/// Message that no handler accepted
#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub kind: DeliveryKind,
    pub subscription: Uuid,
    pub fields: serde_json::Value,
    pub reason: String,
}

/// Outcome of one publish
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

impl DeliveryReport {
    /// At least one subscriber took the message
    pub fn is_delivered(&self) -> bool {
        self.delivered > 0
    }
}

#[derive(Default)]
struct Inner {
    connected: bool,
    // Ordered by subscription time so delivery order is stable
    subscribers: BTreeMap<u64, (Uuid, Arc<dyn MessageHandler>)>,
    next_seq: u64,
    dead_letters: VecDeque<DeadLetter>,
}

/// Shared in-process broker. Clones share state.
#[derive(Clone)]
pub struct InMemoryBroker {
    inner: Arc<Mutex<Inner>>,
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                connected: true,
                ..Inner::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliver `fields` on `kind` to the subscriptions it routes to
    pub fn publish(&self, kind: DeliveryKind, fields: serde_json::Value) -> DeliveryReport {
        // Snapshot handlers; never call out while holding the lock
        let subscribers: Vec<(Uuid, Arc<dyn MessageHandler>)> = {
            let inner = self.lock();
            if !inner.connected {
                warn!(kind = %kind, "Publish on disconnected broker dropped");
                return DeliveryReport::default();
            }
            inner.subscribers.values().cloned().collect()
        };
        let targets = route(subscribers, kind, &fields);
        if targets.is_empty() {
            debug!(kind = %kind, "No subscription takes this message");
        }

        let mut report = DeliveryReport::default();
        for (subscription, handler) in targets {
            match handler.handle(kind, fields.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        kind = %kind,
                        subscription = %subscription,
                        error = %e,
                        "Delivery failed, dead-lettering"
                    );
                    self.dead_letter(DeadLetter {
                        kind,
                        subscription,
                        fields: fields.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        debug!(
            kind = %kind,
            delivered = report.delivered,
            failed = report.failed,
            "Message published"
        );
        report
    }

    fn dead_letter(&self, letter: DeadLetter) {
        let mut inner = self.lock();
        if inner.dead_letters.len() == MAX_DEAD_LETTERS {
            inner.dead_letters.pop_front();
        }
        inner.dead_letters.push_back(letter);
    }

    /// Failed deliveries, oldest first
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.lock().dead_letters.iter().cloned().collect()
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// Drop every subscription and refuse new ones
    pub fn disconnect(&self) {
        let mut inner = self.lock();
        inner.connected = false;
        inner.subscribers.clear();
        info!("Broker disconnected");
    }
}

/// Owners if any, otherwise open handlers, in subscription order
fn route(
    subscribers: Vec<(Uuid, Arc<dyn MessageHandler>)>,
    kind: DeliveryKind,
    fields: &serde_json::Value,
) -> Vec<(Uuid, Arc<dyn MessageHandler>)> {
    let mut owners = Vec::new();
    let mut open = Vec::new();
    for (id, handler) in subscribers {
        match handler.interest(kind, fields) {
            Interest::Owned => owners.push((id, handler)),
            Interest::Open => open.push((id, handler)),
            Interest::Ignored => {}
        }
    }
    if owners.is_empty() { open } else { owners }
}

#[async_trait]
impl MessageBroker for InMemoryBroker {
    async fn subscribe(
        &self,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<Subscription, BrokerError> {
        let id = Uuid::new_v4();
        let seq = {
            let mut inner = self.lock();
            if !inner.connected {
                return Err(BrokerError::NotConnected);
            }
            let seq = inner.next_seq;
            inner.next_seq += 1;
            inner.subscribers.insert(seq, (id, handler));
            seq
        };
        debug!(subscription = %id, "Subscription opened");

        let inner = Arc::downgrade(&self.inner);
        Ok(Subscription::new(id, move |id| {
            if let Some(inner) = inner.upgrade() {
                let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
                inner.subscribers.remove(&seq);
            }
            debug!(subscription = %id, "Subscription closed");
        }))
    }
}
