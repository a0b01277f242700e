//! Transfer Session
//!
//! Requests an asset from a counterparty and correlates the asynchronously
//! delivered result back to the waiting request.
//!
//! # Architecture
//!
//! ```text
//! caller → TransferSession → RequestOrchestrator → ConnectorController (negotiate, initiate)
//!                                   ↑ dequeue(deadline)
//! broker → MessageDispatcher → CorrelationChannel
//!                                   ↓ (pull)
//!                              PullFetcher → downstream HTTP call
//! ```
//!
//! # State Machine
//!
//! ```text
//! IDLE → NEGOTIATING → NEGOTIATED → TRANSFER_INITIATED → AWAITING_MESSAGE
//!      → MATCHED | TIMED_OUT → (pull: FETCHING → FETCHED) → DONE
//! ```
//!
//! # Invariants
//!
//! 1. **One session, one channel**: channels and subscriptions are never shared
//! 2. **Pull correlation**: a pull envelope is accepted only if its id equals the transfer process id
//! 3. **Bounded wait**: the only suspension point with a deadline is the channel dequeue
//! 4. **No internal retry**: every failure is terminal to the session
//! 5. **Mode binding**: a session is only offered messages of its own delivery kind

pub mod adapters;
pub mod channel;
pub mod coordinator;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod fetch;
pub mod session;
pub mod state;
pub mod types;


// Re-exports for convenience
pub use adapters::{ConnectorController, SimulatedCounterparty};
pub use channel::{CorrelationReceiver, CorrelationSender, correlation_channel};
pub use coordinator::{DEFAULT_PULL_DEADLINE, DEFAULT_PUSH_DEADLINE, RequestOrchestrator};
pub use dispatcher::MessageDispatcher;
pub use envelope::{MessageEnvelope, PullEnvelope, PushEnvelope, RequestArgs};
pub use error::{
    DecodeError, DequeueError, DispatchError, FetchError, NegotiationError, SessionError,
    TransferError,
};
pub use fetch::{HttpFetcher, PullFetcher};
pub use session::{SessionDeadlines, TransferSession};
pub use state::SessionState;
pub use types::{
    DeliveryMode, FetchedResponse, PushSink, TransferDetails, TransferOutcome, TransferProcessId,
    TransferQuery,
};
