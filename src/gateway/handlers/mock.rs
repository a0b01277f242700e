//! Mock asset endpoint (mock-api feature)
//!
//! Stands in for a provider data plane so pull transfers can run locally.

use axum::{
    Json,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
};
use serde_json::json;

/// GET /mock/asset
///
/// Requires an Authorization header, like a provider public API would.
pub async fn mock_asset(headers: HeaderMap) -> Result<Json<serde_json::Value>, StatusCode> {
    if !headers.contains_key(AUTHORIZATION) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(json!({
        "asset": "my-asset",
        "readings": [
            { "sensor": "t-1", "temp": 21.5 },
            { "sensor": "t-2", "temp": 19.0 }
        ]
    })))
}
