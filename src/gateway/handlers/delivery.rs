//! Provider delivery handlers
//!
//! Turn provider HTTP calls into broker messages. Correlation happens on the
//! session side; these handlers only publish.

use std::sync::Arc;

use axum::{Json, extract::State, http::Uri};
use serde_json::json;
use tracing::{debug, warn};

use super::super::state::AppState;
use super::super::types::{
    ApiError, ApiResult, EndpointDataReference, PublishResponseData, ok,
};
use crate::broker::{DeliveryKind, DeliveryReport};

fn publish_result(kind: DeliveryKind, report: DeliveryReport) -> ApiResult<PublishResponseData> {
    if !report.is_delivered() {
        warn!(kind = %kind, failed = report.failed, "No session accepted delivery");
        return Err(ApiError::undeliverable(format!(
            "no open session accepted the {} message",
            kind
        )));
    }
    ok(PublishResponseData {
        delivered: report.delivered,
        failed: report.failed,
    })
}

/// {push_method} {push_path}/{*routing}
///
/// The request path is kept as routing metadata.
pub async fn receive_push(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    Json(body): Json<serde_json::Value>,
) -> ApiResult<PublishResponseData> {
    debug!(path = %uri.path(), "Push received");
    let report = state.broker.publish(
        DeliveryKind::Push,
        json!({
            "body": body,
            "routing_path": uri.path(),
        }),
    );
    publish_result(DeliveryKind::Push, report)
}

/// POST /pull
pub async fn receive_pull(
    State(state): State<Arc<AppState>>,
    Json(raw): Json<serde_json::Value>,
) -> ApiResult<PublishResponseData> {
    let edr: EndpointDataReference = serde_json::from_value(raw)
        .map_err(|e| ApiError::bad_request(format!("invalid endpoint data reference: {}", e)))?;
    debug!(id = %edr.id, endpoint = %edr.endpoint, "EDR received");

    let report = state.broker.publish(DeliveryKind::Pull, edr.to_pull_fields());
    publish_result(DeliveryKind::Pull, report)
}
