//! Pull-mode fetch
//!
//! Executes the downstream call exactly as the pull envelope describes it.
//! Target is not validated: it comes from the authenticated counterparty channel.

use async_trait::async_trait;
use tracing::debug;

use super::envelope::RequestArgs;
use super::error::FetchError;
use super::types::FetchedResponse;

#[async_trait]
pub trait PullFetcher: Send + Sync {
    async fn fetch(&self, args: &RequestArgs) -> Result<FetchedResponse, FetchError>;
}

/// reqwest-backed fetcher
#[derive(Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PullFetcher for HttpFetcher {
    async fn fetch(&self, args: &RequestArgs) -> Result<FetchedResponse, FetchError> {
        let method = reqwest::Method::from_bytes(args.method.to_ascii_uppercase().as_bytes())
            .map_err(|_| FetchError::InvalidMethod(args.method.clone()))?;

        let network = |e: reqwest::Error| FetchError::Network {
            url: args.url.clone(),
            reason: e.to_string(),
        };

        let mut request = self.client.request(method, &args.url);
        for (name, value) in &args.headers {
            request = request.header(name, value);
        }
        if !args.params.is_empty() {
            request = request.query(&args.params);
        }
        if let Some(json) = &args.json {
            request = request.json(json);
        } else if let Some(data) = &args.data {
            request = request.body(data.clone());
        }

        let response = request.send().await.map_err(network)?;
        let status = response.status();
        let text = response.text().await.map_err(network)?;

        debug!(
            url = %args.url,
            status = status.as_u16(),
            bytes = text.len(),
            "Pull fetch completed"
        );

        if !status.is_success() {
            return Err(FetchError::Status {
                url: args.url.clone(),
                status: status.as_u16(),
                body: text,
            });
        }

        let body = serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text));
        Ok(FetchedResponse {
            status: status.as_u16(),
            body,
        })
    }
}

/// Recording fetcher for testing
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    pub struct RecordingFetcher {
        calls: Mutex<Vec<RequestArgs>>,
        response: Mutex<Result<FetchedResponse, FetchError>>,
    }

    impl RecordingFetcher {
        pub fn returning(body: serde_json::Value) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                response: Mutex::new(Ok(FetchedResponse { status: 200, body })),
            }
        }

        pub fn failing(err: FetchError) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                response: Mutex::new(Err(err)),
            }
        }

        pub fn calls(&self) -> Vec<RequestArgs> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PullFetcher for RecordingFetcher {
        async fn fetch(&self, args: &RequestArgs) -> Result<FetchedResponse, FetchError> {
            self.calls.lock().unwrap().push(args.clone());
            self.response.lock().unwrap().clone()
        }
    }
}

#[cfg(test)]
pub use mock::RecordingFetcher;
