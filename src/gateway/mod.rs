//! Consumer Backend
//!
//! HTTP receiver the provider calls back into. Every accepted call is
//! published on the broker; request sessions pick it up from there.
//!
//! ```text
//! provider ──push──▶ {push_path}/{*routing} ─┐
//! provider ──EDR───▶ /pull ──────────────────┼─▶ InMemoryBroker ─▶ session dispatchers
//! ```

pub mod handlers;
pub mod state;
pub mod types;

use axum::{
    Router,
    routing::{get, on, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::broker::InMemoryBroker;
use crate::config::{ConfigError, ConsumerBackendConfig};
use state::AppState;

/// Build the consumer backend router. Fails on a push method axum cannot route.
pub fn router(
    broker: InMemoryBroker,
    config: &ConsumerBackendConfig,
) -> Result<Router, ConfigError> {
    let state = Arc::new(AppState::new(broker));
    let push_path = format!("/{}", config.push_path.trim_matches('/'));
    let push_filter = config.push_method_filter()?;

    let router = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/pull", post(handlers::receive_pull))
        .route(&push_path, on(push_filter, handlers::receive_push))
        .route(
            &format!("{}/{{*routing}}", push_path),
            on(push_filter, handlers::receive_push),
        );

    #[cfg(feature = "mock-api")]
    let router = router.route("/mock/asset", get(handlers::mock_asset));

    Ok(router.with_state(state))
}

/// Serve on an already-bound listener until the task is dropped
pub async fn serve(
    listener: TcpListener,
    broker: InMemoryBroker,
    config: &ConsumerBackendConfig,
) -> std::io::Result<()> {
    let app = router(broker, config)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    info!(addr = %listener.local_addr()?, "Consumer backend listening");
    axum::serve(listener, app).await
}
