//! Simulated counterparty
//!
//! Stands in for a provider connector: negotiation always agrees (for the
//! configured connector id), and after transfer initiation the provider side
//! calls back into the consumer backend over HTTP, either pushing the payload
//! to the sink or posting an endpoint data reference for a pull.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::ConnectorController;
use crate::transfer::error::{NegotiationError, TransferError};
use crate::transfer::types::{PushSink, TransferDetails, TransferProcessId, TransferQuery};

pub struct SimulatedCounterparty {
    client: reqwest::Client,
    connector_id: String,
    /// Consumer backend base URL, target of the pull EDR callback
    backend_url: String,
    /// Data served in push mode
    push_payload: serde_json::Value,
    /// URL the EDR points at in pull mode
    asset_endpoint: String,
    auth_code: String,
    delay: Duration,
}

impl SimulatedCounterparty {
    pub fn new(connector_id: impl Into<String>, backend_url: impl Into<String>) -> Self {
        let backend_url = backend_url.into();
        Self {
            client: reqwest::Client::new(),
            connector_id: connector_id.into(),
            asset_endpoint: format!("{}/mock/asset", backend_url.trim_end_matches('/')),
            backend_url,
            push_payload: json!({ "temp": 21.5 }),
            auth_code: Uuid::new_v4().to_string(),
            delay: Duration::from_millis(100),
        }
    }

    pub fn with_push_payload(mut self, payload: serde_json::Value) -> Self {
        self.push_payload = payload;
        self
    }

    pub fn with_asset_endpoint(mut self, url: impl Into<String>) -> Self {
        self.asset_endpoint = url.into();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn spawn_push(&self, id: &TransferProcessId, sink: &PushSink) -> Result<(), TransferError> {
        let method = reqwest::Method::from_bytes(sink.method.to_ascii_uppercase().as_bytes())
            .map_err(|_| TransferError(format!("invalid sink method {}", sink.method)))?;
        let request = self
            .client
            .request(method, sink.url())
            .json(&self.push_payload);
        let delay = self.delay;
        let id = id.clone();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match request.send().await {
                Ok(resp) => debug!(transfer_process_id = %id, status = resp.status().as_u16(), "Provider push sent"),
                Err(e) => warn!(transfer_process_id = %id, error = %e, "Provider push failed"),
            }
        });
        Ok(())
    }

    fn spawn_pull_callback(&self, id: &TransferProcessId) {
        let url = format!("{}/pull", self.backend_url.trim_end_matches('/'));
        let edr = json!({
            "id": id.as_str(),
            "endpoint": self.asset_endpoint,
            "authKey": "Authorization",
            "authCode": self.auth_code,
        });
        let request = self.client.post(url).json(&edr);
        let delay = self.delay;
        let id = id.clone();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match request.send().await {
                Ok(resp) => debug!(transfer_process_id = %id, status = resp.status().as_u16(), "Provider EDR sent"),
                Err(e) => warn!(transfer_process_id = %id, error = %e, "Provider EDR failed"),
            }
        });
    }
}

#[async_trait]
impl ConnectorController for SimulatedCounterparty {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn negotiate(&self, query: &TransferQuery) -> Result<TransferDetails, NegotiationError> {
        if query.counterparty_connector_id != self.connector_id {
            return Err(NegotiationError::Unreachable(format!(
                "no connector {} at {}",
                query.counterparty_connector_id, query.counterparty_protocol_url
            )));
        }

        let agreement = Uuid::new_v4();
        info!(asset = %query.asset_query, agreement = %agreement, "Contract agreed");
        Ok(TransferDetails(json!({
            "contract_agreement_id": agreement.to_string(),
            "asset_id": query.asset_query,
            "counterparty_protocol_url": query.counterparty_protocol_url,
        })))
    }

    async fn initiate_transfer(
        &self,
        details: &TransferDetails,
        is_provider_push: bool,
        sink: Option<&PushSink>,
    ) -> Result<TransferProcessId, TransferError> {
        if details.0.get("contract_agreement_id").is_none() {
            return Err(TransferError("missing contract agreement".to_string()));
        }

        let id = TransferProcessId::new(format!("tp-{}", Uuid::new_v4()));
        if is_provider_push {
            let sink = sink.ok_or_else(|| TransferError("push transfer without sink".to_string()))?;
            self.spawn_push(&id, sink)?;
        } else {
            self.spawn_pull_callback(&id);
        }
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_negotiate_refuses_unknown_connector() {
        let counterparty = SimulatedCounterparty::new("provider", "http://127.0.0.1:1");
        let query = TransferQuery::new("http://provider/api/dsp", "someone-else", "my-asset");

        let err = counterparty.negotiate(&query).await.unwrap_err();
        assert!(matches!(err, NegotiationError::Unreachable(_)));
    }

    #[tokio::test]
    async fn test_push_transfer_requires_sink() {
        let counterparty = SimulatedCounterparty::new("provider", "http://127.0.0.1:1");
        let query = TransferQuery::new("http://provider/api/dsp", "provider", "my-asset");
        let details = counterparty.negotiate(&query).await.unwrap();

        let err = counterparty
            .initiate_transfer(&details, true, None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("sink"));
    }

    #[tokio::test]
    async fn test_initiate_rejects_foreign_details() {
        let counterparty = SimulatedCounterparty::new("provider", "http://127.0.0.1:1");
        let err = counterparty
            .initiate_transfer(&TransferDetails(json!({})), false, None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("agreement"));
    }
}
