//! Prism HTTP service.
//!
//! Thin glue over the answering engine: request routing, health/metrics
//! endpoints, and feedback submission. All pipeline behavior lives in
//! `prism-engine`; this crate only wires it to HTTP and durable logs.

pub mod metrics;
pub mod routes;

pub use metrics::{HealthCheck, HealthReport, MetricsCollector, MetricsSnapshot};
pub use routes::{router, AppState};

use prism_core::{PrismError, PrismResult};

/// Bind and serve the API until the process is stopped.
pub async fn serve(bind: &str, state: AppState) -> PrismResult<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| PrismError::Server(format!("Failed to bind {}: {}", bind, e)))?;

    tracing::info!("Prism API listening on {}", bind);

    axum::serve(listener, router(state))
        .await
        .map_err(|e| PrismError::Server(format!("Server error: {}", e)))
}
