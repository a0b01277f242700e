//! Request Orchestrator
//!
//! Drives one request session through the FSM: negotiation, transfer
//! initiation, bounded wait on the correlation channel, correlation check,
//! and (pull mode) the downstream fetch.
//!
//! One instance is one attempt. Retrying means a new instance.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::adapters::ConnectorController;
use super::channel::CorrelationReceiver;
use super::envelope::{MessageEnvelope, PullEnvelope, PushEnvelope};
use super::error::{DequeueError, SessionError};
use super::fetch::PullFetcher;
use super::state::SessionState;
use super::types::{DeliveryMode, TransferOutcome, TransferProcessId, TransferQuery};

/// Default wait for a pushed payload
pub const DEFAULT_PUSH_DEADLINE: Duration = Duration::from_secs(60);
/// Default wait for pull access parameters
pub const DEFAULT_PULL_DEADLINE: Duration = Duration::from_secs(30);

/// Envelope accepted for this session
enum Matched {
    Push(PushEnvelope),
    Pull(PullEnvelope),
}

/// Check a dequeued envelope against the session.
///
/// Push: first arrival wins, no id check. Pull: id must equal the transfer process id.
fn correlate(
    mode: &DeliveryMode,
    expected: &TransferProcessId,
    envelope: MessageEnvelope,
) -> Result<Matched, SessionError> {
    match (mode, envelope) {
        (DeliveryMode::Push { .. }, MessageEnvelope::Push(push)) => Ok(Matched::Push(push)),
        (DeliveryMode::Pull, MessageEnvelope::Pull(pull)) => {
            if pull.id == expected.as_str() {
                Ok(Matched::Pull(pull))
            } else {
                Err(SessionError::Correlation {
                    expected: expected.clone(),
                    received: pull.id,
                })
            }
        }
        (_, other) => Err(SessionError::Correlation {
            expected: expected.clone(),
            received: format!("<{} envelope>", other.kind()),
        }),
    }
}

pub struct RequestOrchestrator {
    connector: Arc<dyn ConnectorController>,
    fetcher: Arc<dyn PullFetcher>,
    state: SessionState,
    transfer_process_id: Option<TransferProcessId>,
}

impl RequestOrchestrator {
    pub fn new(connector: Arc<dyn ConnectorController>, fetcher: Arc<dyn PullFetcher>) -> Self {
        Self {
            connector,
            fetcher,
            state: SessionState::Idle,
            transfer_process_id: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Set once transfer initiation succeeds
    pub fn transfer_process_id(&self) -> Option<&TransferProcessId> {
        self.transfer_process_id.as_ref()
    }

    fn transition(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        debug!(from = %self.state, to = %next, "Session transition");
        self.state = next;
    }

    /// Run the session to a terminal state.
    ///
    /// The broker subscription feeding `receiver` must already be open.
    pub async fn run(
        &mut self,
        query: &TransferQuery,
        mode: &DeliveryMode,
        receiver: &mut CorrelationReceiver,
        deadline: Duration,
    ) -> Result<TransferOutcome, SessionError> {
        if self.state != SessionState::Idle {
            return Err(SessionError::AlreadyUsed(self.state.as_str()));
        }

        let result = self.drive(query, mode, receiver, deadline).await;

        match &result {
            Ok(_) => info!(
                transfer_process_id = ?self.transfer_process_id.as_ref().map(|id| id.as_str()),
                mode = mode.as_str(),
                "Session done"
            ),
            Err(e) => {
                if !self.state.is_terminal() {
                    self.transition(SessionState::Failed);
                }
                warn!(
                    code = e.code(),
                    state = %self.state,
                    error = %e,
                    "Session failed"
                );
            }
        }
        result
    }

    async fn drive(
        &mut self,
        query: &TransferQuery,
        mode: &DeliveryMode,
        receiver: &mut CorrelationReceiver,
        deadline: Duration,
    ) -> Result<TransferOutcome, SessionError> {
        // 1-2. Negotiation
        self.transition(SessionState::Negotiating);
        info!(
            connector = self.connector.name(),
            counterparty = %query.counterparty_connector_id,
            asset = %query.asset_query,
            "Negotiating"
        );
        let details = self.connector.negotiate(query).await?;
        self.transition(SessionState::Negotiated);

        // 3. Transfer initiation
        let transfer_process_id = self
            .connector
            .initiate_transfer(&details, mode.is_provider_push(), mode.sink())
            .await?;
        info!(
            transfer_process_id = %transfer_process_id,
            mode = mode.as_str(),
            "Transfer initiated"
        );
        receiver.claim(transfer_process_id.clone());
        self.transfer_process_id = Some(transfer_process_id.clone());
        self.transition(SessionState::TransferInitiated);

        // 4-6. Bounded wait
        self.transition(SessionState::AwaitingMessage);
        let envelope = match receiver.dequeue(deadline).await {
            Ok(envelope) => envelope,
            Err(DequeueError::Timeout { elapsed }) => {
                self.transition(SessionState::TimedOut);
                return Err(SessionError::Timeout {
                    elapsed,
                    transfer_process_id,
                });
            }
            Err(DequeueError::Closed) => {
                return Err(SessionError::ChannelClosed {
                    transfer_process_id,
                });
            }
        };

        let matched = correlate(mode, &transfer_process_id, envelope)?;
        self.transition(SessionState::Matched);

        match matched {
            Matched::Push(push) => {
                debug!(routing_path = %push.routing_path, "Push payload accepted");
                self.transition(SessionState::Done);
                Ok(TransferOutcome::Pushed(push.body))
            }
            // 7-8. Fetch
            Matched::Pull(pull) => {
                self.transition(SessionState::Fetching);
                debug!(
                    method = %pull.request_args.method,
                    url = %pull.request_args.url,
                    "Fetching pulled payload"
                );
                let response = self.fetcher.fetch(&pull.request_args).await?;
                self.transition(SessionState::Fetched);
                self.transition(SessionState::Done);
                Ok(TransferOutcome::Pulled(response))
            }
        }
    }
}
