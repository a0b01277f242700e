//! Broker Seam
//!
//! The consumer side of the message broker: a scoped subscription that
//! feeds delivered messages to a handler supplied by the session.
//! Two logical channels, push and pull, share one handler; the handler's
//! [`Interest`] decides which messages it is offered.

pub mod memory;

pub use memory::{DeadLetter, DeliveryReport, InMemoryBroker};

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::transfer::error::DispatchError;

/// Logical channel a message arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryKind {
    Push,
    Pull,
}

impl DeliveryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryKind::Push => "push",
            DeliveryKind::Pull => "pull",
        }
    }
}

impl fmt::Display for DeliveryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    #[error("broker is not connected")]
    NotConnected,
}

/// Routing claim a handler makes on one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interest {
    /// Addressed to this handler (routing path or transfer process id)
    Owned,
    /// Taken only when no live handler owns the message
    Open,
    /// Never offered
    Ignored,
}

/// Invoked once per delivered message.
///
/// An `Err` is a failed delivery; the broker applies its own
/// redelivery/dead-letter policy.
pub trait MessageHandler: Send + Sync {
    /// Consulted before `handle`. Owners win over open handlers.
    fn interest(&self, _kind: DeliveryKind, _fields: &serde_json::Value) -> Interest {
        Interest::Open
    }

    fn handle(&self, kind: DeliveryKind, fields: serde_json::Value) -> Result<(), DispatchError>;
}

/// Process-wide broker connection
#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// Open a messaging session. Deliveries stop when the returned guard drops.
    async fn subscribe(&self, handler: Arc<dyn MessageHandler>)
    -> Result<Subscription, BrokerError>;
}

/// Live subscription. Unbinds its handler on drop.
pub struct Subscription {
    id: Uuid,
    release: Option<Box<dyn FnOnce(Uuid) + Send>>,
}

impl Subscription {
    pub fn new(id: Uuid, release: impl FnOnce(Uuid) + Send + 'static) -> Self {
        Self {
            id,
            release: Some(Box::new(release)),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release(self.id);
        }
    }
}
