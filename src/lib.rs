//! Dataspace Consumer
//!
//! Requests an asset from a counterparty connector and receives the data
//! asynchronously, pushed to us or pulled with access parameters that arrive
//! over the message broker.
//!
//! # Modules
//!
//! - [`transfer`] - Request sessions: orchestrator FSM, correlation channel, dispatcher
//! - [`broker`] - Broker seam and the in-process broker
//! - [`gateway`] - Consumer backend HTTP receiver (push sink, EDR intake)
//! - [`config`] - YAML configuration
//! - [`logging`] - tracing subscriber setup

pub mod broker;
pub mod config;
pub mod gateway;
pub mod logging;
pub mod transfer;

// Convenient re-exports at crate root
pub use broker::{
    DeliveryKind, InMemoryBroker, Interest, MessageBroker, MessageHandler, Subscription,
};
pub use config::AppConfig;
pub use transfer::{
    ConnectorController, DeliveryMode, HttpFetcher, MessageEnvelope, PullFetcher, PushSink,
    SessionError, SessionState, TransferOutcome, TransferQuery, TransferSession,
};
