//! Consumer backend types
//!
//! ## Input Types
//! - [`EndpointDataReference`]: access parameters posted by the provider for a pull
//!
//! ## Output Types
//! - [`ApiResponse<T>`]: Unified API response wrapper

pub mod response;

pub use response::{ApiError, ApiResponse, ApiResult, PublishResponseData, error_codes, ok};

use serde::Deserialize;
use serde_json::json;

/// EDR posted by the provider connector when a pull transfer starts
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointDataReference {
    /// Transfer process id
    pub id: String,
    pub endpoint: String,
    #[serde(rename = "authKey", default)]
    pub auth_key: Option<String>,
    #[serde(rename = "authCode", default)]
    pub auth_code: Option<String>,
}

impl EndpointDataReference {
    /// Broker field mapping of the pull message this EDR turns into
    pub fn to_pull_fields(&self) -> serde_json::Value {
        let mut headers = serde_json::Map::new();
        if let (Some(key), Some(code)) = (&self.auth_key, &self.auth_code) {
            headers.insert(key.clone(), json!(code));
        }
        json!({
            "id": self.id,
            "request_args": {
                "method": "GET",
                "url": self.endpoint,
                "headers": headers,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::envelope::PullEnvelope;

    #[test]
    fn test_edr_becomes_pull_message() {
        let edr: EndpointDataReference = serde_json::from_value(json!({
            "id": "tp-2",
            "endpoint": "http://provider:19291/public",
            "authKey": "Authorization",
            "authCode": "eyJ.token"
        }))
        .unwrap();

        let pull = PullEnvelope::decode(edr.to_pull_fields()).unwrap();
        assert_eq!(pull.id, "tp-2");
        assert_eq!(pull.request_args.method, "GET");
        assert_eq!(pull.request_args.url, "http://provider:19291/public");
        assert_eq!(pull.request_args.headers["Authorization"], "eyJ.token");
    }

    #[test]
    fn test_edr_without_auth_has_no_headers() {
        let edr: EndpointDataReference =
            serde_json::from_value(json!({"id": "tp-2", "endpoint": "http://p/public"})).unwrap();

        let pull = PullEnvelope::decode(edr.to_pull_fields()).unwrap();
        assert!(pull.request_args.headers.is_empty());
    }
}
