//! Connector Adapters
//!
//! The connector collaborator runs contract negotiation and transfer
//! initiation against the counterparty. The orchestrator only sees this trait.

pub mod simulated;

pub use simulated::SimulatedCounterparty;

use async_trait::async_trait;

use super::error::{NegotiationError, TransferError};
use super::types::{PushSink, TransferDetails, TransferProcessId, TransferQuery};

/// Connector control-plane operations
#[async_trait]
pub trait ConnectorController: Send + Sync {
    /// Adapter name for logging
    fn name(&self) -> &'static str;

    /// Negotiate a contract for the queried asset
    async fn negotiate(&self, query: &TransferQuery) -> Result<TransferDetails, NegotiationError>;

    /// Start the transfer process.
    ///
    /// `sink` is `Some` exactly when `is_provider_push` is true.
    async fn initiate_transfer(
        &self,
        details: &TransferDetails,
        is_provider_push: bool,
        sink: Option<&PushSink>,
    ) -> Result<TransferProcessId, TransferError>;
}

/// Mock connector for testing
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Hook run after a successful `initiate_transfer`, with the minted id
    type OnInitiate = Box<dyn Fn(&TransferProcessId) + Send + Sync>;

    pub struct MockConnector {
        transfer_process_id: TransferProcessId,
        negotiate_count: AtomicUsize,
        initiate_count: AtomicUsize,
        /// Arguments seen by initiate_transfer
        last_initiate: Mutex<Option<(TransferDetails, bool, Option<PushSink>)>>,
        last_query: Mutex<Option<TransferQuery>>,
        fail_negotiate: Mutex<Option<NegotiationError>>,
        fail_initiate: Mutex<Option<TransferError>>,
        on_initiate: Mutex<Option<OnInitiate>>,
    }

    impl MockConnector {
        pub fn new(transfer_process_id: &str) -> Self {
            Self {
                transfer_process_id: TransferProcessId::new(transfer_process_id),
                negotiate_count: AtomicUsize::new(0),
                initiate_count: AtomicUsize::new(0),
                last_initiate: Mutex::new(None),
                last_query: Mutex::new(None),
                fail_negotiate: Mutex::new(None),
                fail_initiate: Mutex::new(None),
                on_initiate: Mutex::new(None),
            }
        }

        pub fn set_fail_negotiate(&self, err: NegotiationError) {
            *self.fail_negotiate.lock().unwrap() = Some(err);
        }

        pub fn set_fail_initiate(&self, err: TransferError) {
            *self.fail_initiate.lock().unwrap() = Some(err);
        }

        pub fn on_initiate(&self, hook: impl Fn(&TransferProcessId) + Send + Sync + 'static) {
            *self.on_initiate.lock().unwrap() = Some(Box::new(hook));
        }

        pub fn negotiate_count(&self) -> usize {
            self.negotiate_count.load(Ordering::SeqCst)
        }

        pub fn initiate_count(&self) -> usize {
            self.initiate_count.load(Ordering::SeqCst)
        }

        pub fn last_initiate(&self) -> Option<(TransferDetails, bool, Option<PushSink>)> {
            self.last_initiate.lock().unwrap().clone()
        }

        pub fn last_query(&self) -> Option<TransferQuery> {
            self.last_query.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ConnectorController for MockConnector {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn negotiate(
            &self,
            query: &TransferQuery,
        ) -> Result<TransferDetails, NegotiationError> {
            self.negotiate_count.fetch_add(1, Ordering::SeqCst);
            *self.last_query.lock().unwrap() = Some(query.clone());

            if let Some(err) = self.fail_negotiate.lock().unwrap().clone() {
                return Err(err);
            }
            Ok(TransferDetails(serde_json::json!({
                "contract_agreement_id": format!("agreement-{}", query.asset_query),
                "counterparty": query.counterparty_connector_id,
            })))
        }

        async fn initiate_transfer(
            &self,
            details: &TransferDetails,
            is_provider_push: bool,
            sink: Option<&PushSink>,
        ) -> Result<TransferProcessId, TransferError> {
            self.initiate_count.fetch_add(1, Ordering::SeqCst);
            *self.last_initiate.lock().unwrap() =
                Some((details.clone(), is_provider_push, sink.cloned()));

            if let Some(err) = self.fail_initiate.lock().unwrap().clone() {
                return Err(err);
            }
            if let Some(hook) = self.on_initiate.lock().unwrap().as_ref() {
                hook(&self.transfer_process_id);
            }
            Ok(self.transfer_process_id.clone())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_connector_success() {
            let connector = MockConnector::new("tp-1");
            let query = TransferQuery::new("http://provider/api/dsp", "provider", "my-asset");

            let details = connector.negotiate(&query).await.unwrap();
            assert_eq!(connector.negotiate_count(), 1);

            let id = connector
                .initiate_transfer(&details, false, None)
                .await
                .unwrap();
            assert_eq!(id.as_str(), "tp-1");
            assert_eq!(connector.initiate_count(), 1);
        }

        #[tokio::test]
        async fn test_mock_connector_failure() {
            let connector = MockConnector::new("tp-1");
            connector.set_fail_negotiate(NegotiationError::Refused("policy".into()));

            let query = TransferQuery::new("http://provider/api/dsp", "provider", "my-asset");
            let err = connector.negotiate(&query).await.unwrap_err();
            assert_eq!(err, NegotiationError::Refused("policy".into()));
        }
    }
}

#[cfg(test)]
pub use mock::MockConnector;
