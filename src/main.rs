use lockpulse::api::{build_router, AppState};
use lockpulse::config::load_config;
use lockpulse::contract::LockClient;
use lockpulse::metrics::{start_metrics_server, Metrics};
use lockpulse::registry::{ProviderRegistry, ProviderSettings};
use lockpulse::resolver::ActivityResolver;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config();

    // Logging
    tracing_subscriber::fmt().json().with_level(true).init();

    let settings = ProviderSettings {
        explorer_api_key: config.explorer_api_key.clone(),
        transfer_api_key: config.transfer_api_key.clone(),
        http_timeout: Duration::from_secs(config.http_timeout_secs),
    };
    let registry = ProviderRegistry::from_settings(&settings)?;
    info!(
        "Provider registry ready, {} chain/network pairs",
        registry.len()
    );
    let resolver = Arc::new(ActivityResolver::new(registry));

    let locks = match (&config.lock_rpc_url, &config.lock_contract_address) {
        (Some(rpc_url), Some(address)) => {
            let client =
                LockClient::connect(rpc_url, address, config.lock_signer_key.as_deref()).await?;
            info!(
                "Lock contract client connected to {} (writes {})",
                address,
                if client.can_write() {
                    "enabled"
                } else {
                    "disabled"
                }
            );
            Some(Arc::new(client))
        }
        _ => {
            info!("Lock contract not configured, serving activity lookups only");
            None
        }
    };

    let metrics = Arc::new(Metrics::new());
    start_metrics_server(Arc::clone(&metrics), config.metrics_port);

    let state = AppState {
        resolver,
        locks,
        metrics,
    };
    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("HTTP server on {}", addr);

    let shutdown_tx = broadcast::channel::<()>(1).0;
    let shutdown_tx_ctrl = shutdown_tx.clone();
    tokio::spawn(async move {
        let _ = signal::ctrl_c().await;
        let _ = shutdown_tx_ctrl.send(());
    });
    let mut shutdown_rx = shutdown_tx.subscribe();

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
        })
        .await?;

    Ok(())
}
