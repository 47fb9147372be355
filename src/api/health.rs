//! Health check endpoints with component-level diagnostics.
//!
//! Provides:
//! - `/health` — simple "healthy" + version (for load balancers)
//! - `/health/detailed` — per-component status (database, registry)

use axum::extract::Extension;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use pulse_core::SubscriptionRegistry;
use pulse_store::EventStore;
use serde::Serialize;
use std::sync::Arc;

/// Simple health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Detailed health response with per-component checks
#[derive(Debug, Serialize)]
pub struct DetailedHealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub checks: HealthChecks,
}

/// All component health checks
#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub database: ComponentHealth,
    pub registry: ComponentHealth,
}

/// Individual component health status
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ComponentHealth {
    fn healthy_with_details(latency_ms: u64, details: serde_json::Value) -> Self {
        Self {
            status: "healthy",
            latency_ms: Some(latency_ms),
            error: None,
            details: Some(details),
        }
    }

    fn unhealthy(error: String) -> Self {
        Self {
            status: "unhealthy",
            latency_ms: None,
            error: Some(error),
            details: None,
        }
    }
}

/// Simple health check (GET /health)
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Detailed health check (GET /health/detailed)
///
/// A storage outage degrades the response but the endpoint itself stays up,
/// as do open streaming connections.
async fn detailed_health_check(
    Extension(store): Extension<Arc<EventStore>>,
    Extension(registry): Extension<Arc<SubscriptionRegistry>>,
) -> Json<DetailedHealthResponse> {
    let started = std::time::Instant::now();
    let database = match store.count().await {
        Ok(count) => ComponentHealth::healthy_with_details(
            started.elapsed().as_millis() as u64,
            serde_json::json!({"events": count}),
        ),
        Err(e) => ComponentHealth::unhealthy(e.to_string()),
    };

    let started = std::time::Instant::now();
    let connections = registry.connection_count().await;
    let registry_check = ComponentHealth::healthy_with_details(
        started.elapsed().as_millis() as u64,
        serde_json::json!({"connections": connections}),
    );

    let status = if database.status == "healthy" {
        "healthy"
    } else {
        "degraded"
    };

    Json(DetailedHealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        checks: HealthChecks {
            database,
            registry: registry_check,
        },
    })
}

/// Create health routes
pub fn health_routes() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/detailed", get(detailed_health_check))
}
