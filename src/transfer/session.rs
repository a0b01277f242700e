//! Session Bootstrap
//!
//! Binds a broker subscription to one orchestrator run. The subscription
//! opens before negotiation starts and is released on every exit path
//! (success, timeout, error, or the future being dropped).

use std::sync::Arc;
use std::time::Duration;

use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use super::adapters::ConnectorController;
use super::channel::correlation_channel;
use super::coordinator::{DEFAULT_PULL_DEADLINE, DEFAULT_PUSH_DEADLINE, RequestOrchestrator};
use super::dispatcher::MessageDispatcher;
use super::error::SessionError;
use super::fetch::PullFetcher;
use super::types::{DeliveryMode, TransferOutcome, TransferQuery};
use crate::broker::MessageBroker;

/// Per-mode wait on the correlation channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionDeadlines {
    pub push: Duration,
    pub pull: Duration,
}

impl Default for SessionDeadlines {
    fn default() -> Self {
        Self {
            push: DEFAULT_PUSH_DEADLINE,
            pull: DEFAULT_PULL_DEADLINE,
        }
    }
}

impl SessionDeadlines {
    pub fn for_mode(&self, mode: &DeliveryMode) -> Duration {
        match mode {
            DeliveryMode::Push { .. } => self.push,
            DeliveryMode::Pull => self.pull,
        }
    }
}

/// Runs request sessions over a shared broker connection.
///
/// Each `run` gets its own channel and subscription. Concurrent sessions on
/// one broker are kept apart by routing: a push session owns its sink path,
/// a pull session owns its transfer process id once initiation returns.
#[derive(Clone)]
pub struct TransferSession {
    broker: Arc<dyn MessageBroker>,
    connector: Arc<dyn ConnectorController>,
    fetcher: Arc<dyn PullFetcher>,
    deadlines: SessionDeadlines,
}

impl TransferSession {
    pub fn new(
        broker: Arc<dyn MessageBroker>,
        connector: Arc<dyn ConnectorController>,
        fetcher: Arc<dyn PullFetcher>,
    ) -> Self {
        Self {
            broker,
            connector,
            fetcher,
            deadlines: SessionDeadlines::default(),
        }
    }

    pub fn with_deadlines(mut self, deadlines: SessionDeadlines) -> Self {
        self.deadlines = deadlines;
        self
    }

    /// Execute one full request
    pub async fn run(
        &self,
        query: &TransferQuery,
        mode: &DeliveryMode,
    ) -> Result<TransferOutcome, SessionError> {
        let session_id = Uuid::new_v4();
        let span = info_span!("session", id = %session_id, mode = mode.as_str());
        self.run_inner(query, mode).instrument(span).await
    }

    async fn run_inner(
        &self,
        query: &TransferQuery,
        mode: &DeliveryMode,
    ) -> Result<TransferOutcome, SessionError> {
        let (sender, mut receiver) = correlation_channel();
        let dispatcher = Arc::new(MessageDispatcher::new(sender, mode));

        let subscription = self.broker.subscribe(dispatcher).await?;
        info!(subscription = %subscription.id(), "Messaging session open");

        let mut orchestrator =
            RequestOrchestrator::new(self.connector.clone(), self.fetcher.clone());
        let result = orchestrator
            .run(query, mode, &mut receiver, self.deadlines.for_mode(mode))
            .await;

        drop(subscription);
        info!(state = %orchestrator.state(), "Messaging session closed");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::types::PushSink;

    #[test]
    fn test_default_deadlines() {
        let deadlines = SessionDeadlines::default();
        let push = DeliveryMode::Push {
            sink: PushSink::new("http://b", "/push", "POST"),
        };
        assert_eq!(deadlines.for_mode(&push), Duration::from_secs(60));
        assert_eq!(deadlines.for_mode(&DeliveryMode::Pull), Duration::from_secs(30));
    }
}
