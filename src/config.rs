use axum::http::Method;
use axum::routing::MethodFilter;
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;
use thiserror::Error;

use crate::transfer::session::SessionDeadlines;
use crate::transfer::types::{PushSink, TransferQuery};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config yaml: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub counterparty: CounterpartyConfig,
    pub consumer_backend: ConsumerBackendConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

/// Provider connector and the asset we ask it for
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CounterpartyConfig {
    pub protocol_url: String,
    pub connector_id: String,
    pub asset: String,
}

impl CounterpartyConfig {
    pub fn query(&self) -> TransferQuery {
        TransferQuery::new(&self.protocol_url, &self.connector_id, &self.asset)
    }
}

/// HTTP receiver the provider delivers into
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ConsumerBackendConfig {
    pub host: String,
    pub port: u16,
    /// Address the provider uses to reach us
    pub base_url: String,
    #[serde(default = "default_push_path")]
    pub push_path: String,
    #[serde(default = "default_push_method")]
    pub push_method: String,
}

fn default_push_path() -> String {
    "/push".to_string()
}

fn default_push_method() -> String {
    "POST".to_string()
}

impl ConsumerBackendConfig {
    /// Push sink; `routing_key` segments are appended to the push path
    pub fn push_sink(&self, routing_key: &str) -> PushSink {
        let path = if routing_key.is_empty() {
            self.push_path.clone()
        } else {
            format!(
                "{}/{}",
                self.push_path.trim_end_matches('/'),
                routing_key.trim_start_matches('/')
            )
        };
        PushSink::new(&self.base_url, path, &self.push_method)
    }

    /// Route filter for the push sink. Only methods axum can route on are accepted.
    pub fn push_method_filter(&self) -> Result<MethodFilter, ConfigError> {
        Method::from_bytes(self.push_method.to_ascii_uppercase().as_bytes())
            .ok()
            .and_then(|method| MethodFilter::try_from(method).ok())
            .ok_or_else(|| {
                ConfigError::Invalid(format!("unsupported push_method {:?}", self.push_method))
            })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct TimeoutConfig {
    pub push_secs: u64,
    pub pull_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            push_secs: 60,
            pull_secs: 30,
        }
    }
}

impl From<TimeoutConfig> for SessionDeadlines {
    fn from(t: TimeoutConfig) -> Self {
        SessionDeadlines {
            push: Duration::from_secs(t.push_secs),
            pull: Duration::from_secs(t.pull_secs),
        }
    }
}

impl AppConfig {
    /// Load `config/<env>.yaml`
    pub fn load(env: &str) -> Result<Self, ConfigError> {
        Self::from_file(&format!("config/{}.yaml", env))
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        let config: AppConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.consumer_backend.push_method_filter()?;
        Ok(())
    }
}
