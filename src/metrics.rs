use axum::Router;
use prometheus::{IntCounter, Registry, TextEncoder};
use std::sync::Arc;
use tracing::{info, warn};

pub struct Metrics {
    registry: Registry,
    resolves_total: IntCounter,
    resolve_misses_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();
        let resolves_total = prometheus::register_int_counter_with_registry!(
            "activity_resolves_total",
            "Total activity resolve calls",
            registry
        )
        .unwrap();
        let resolve_misses_total = prometheus::register_int_counter_with_registry!(
            "activity_resolve_misses_total",
            "Resolve calls that found no usable activity",
            registry
        )
        .unwrap();
        Self {
            registry,
            resolves_total,
            resolve_misses_total,
        }
    }

    pub fn increment_resolves(&self) {
        self.resolves_total.inc();
    }

    pub fn increment_misses(&self) {
        self.resolve_misses_total.inc();
    }

    pub fn export(&self) -> String {
        let mut out = String::new();
        if let Err(e) = TextEncoder::new().encode_utf8(&self.registry.gather(), &mut out) {
            warn!("Failed to encode metrics: {}", e);
        }
        out
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

pub fn start_metrics_server(metrics: Arc<Metrics>, port: u16) {
    tokio::spawn(async move {
        let app = Router::new().route(
            "/metrics",
            axum::routing::get(move || {
                let metrics = Arc::clone(&metrics);
                async move { metrics.export() }
            }),
        );
        let addr = format!("0.0.0.0:{}", port);
        match tokio::net::TcpListener::bind(&addr).await {
            Ok(listener) => {
                info!("Metrics server on {}", addr);
                if let Err(e) = axum::serve(listener, app).await {
                    warn!("Metrics server error: {}", e);
                }
            }
            Err(e) => warn!("Failed to bind metrics server on {}: {}", addr, e),
        }
    });
}
