//! Dataspace Consumer
//!
//! Runs one request session end to end:
//!
//! ```text
//! ┌──────────┐    ┌────────────┐    ┌──────────────┐    ┌──────────┐
//! │  Config  │───▶│  Session   │───▶│ Counterparty │───▶│ Backend  │
//! │  (YAML)  │    │(negotiate) │    │  (provider)  │    │ (axum)   │
//! └──────────┘    └────────────┘    └──────────────┘    └────┬─────┘
//!                       ▲                                    │
//!                       └────────── broker ◀─────────────────┘
//! ```
//!
//! Usage: `dataspace_consumer [--env dev] [--pull] [--routing-key <key>]`

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use dataspace_consumer::config::AppConfig;
use dataspace_consumer::gateway;
use dataspace_consumer::transfer::{
    DeliveryMode, HttpFetcher, SessionDeadlines, SimulatedCounterparty, TransferOutcome,
    TransferSession,
};
use dataspace_consumer::{InMemoryBroker, logging};

fn get_arg(name: &str) -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1).cloned())
}

fn get_env() -> String {
    get_arg("--env")
        .or_else(|| get_arg("-e"))
        .unwrap_or_else(|| "dev".to_string())
}

fn use_pull_mode() -> bool {
    std::env::args().any(|a| a == "--pull")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let app_config = AppConfig::load(&env).with_context(|| format!("loading {} config", env))?;
    let _log_guard = logging::init_logging(&app_config);

    tracing::info!("Starting dataspace consumer in {} mode", env);

    // Broker and consumer backend share the process
    let broker = InMemoryBroker::new();
    let backend = &app_config.consumer_backend;
    let listener = TcpListener::bind((backend.host.as_str(), backend.port))
        .await
        .with_context(|| format!("binding {}:{}", backend.host, backend.port))?;
    let server = {
        let broker = broker.clone();
        let backend = backend.clone();
        tokio::spawn(async move {
            if let Err(e) = gateway::serve(listener, broker, &backend).await {
                tracing::error!(error = %e, "Consumer backend stopped");
            }
        })
    };

    let counterparty = SimulatedCounterparty::new(
        &app_config.counterparty.connector_id,
        &app_config.consumer_backend.base_url,
    );
    let session = TransferSession::new(
        Arc::new(broker.clone()),
        Arc::new(counterparty),
        Arc::new(HttpFetcher::new()),
    )
    .with_deadlines(SessionDeadlines::from(app_config.timeouts));

    let mode = if use_pull_mode() {
        DeliveryMode::Pull
    } else {
        let routing_key = get_arg("--routing-key").unwrap_or_else(|| "specific/routing/key".into());
        DeliveryMode::Push {
            sink: app_config.consumer_backend.push_sink(&routing_key),
        }
    };

    let result = session.run(&app_config.counterparty.query(), &mode).await;
    server.abort();
    broker.disconnect();

    match result {
        Ok(TransferOutcome::Pushed(body)) => {
            tracing::info!(body = %body, "Received pushed data");
            Ok(())
        }
        Ok(TransferOutcome::Pulled(resp)) => {
            tracing::info!(status = resp.status, body = %resp.body, "Fetched pulled data");
            Ok(())
        }
        Err(e) => {
            tracing::error!(code = e.code(), error = %e, "Request failed");
            Err(e.into())
        }
    }
}
