//! Web API module for Pulse
//!
//! Provides REST API endpoints for:
//! - Publishing events
//! - Retrieving the durable event log
//! - Health checks

pub mod events;
pub mod health;

use axum::Router;
use serde::Serialize;

pub use events::events_routes;
pub use health::health_routes;

/// Standard response envelope shared by every REST endpoint.
#[derive(Debug, Serialize)]
pub struct ApiEnvelope<T: Serialize> {
    /// "ok" or "error"
    pub status: &'static str,
    /// Human-readable outcome
    pub message: String,
    /// Endpoint-specific payload
    pub data: Option<T>,
}

impl<T: Serialize> ApiEnvelope<T> {
    /// Success envelope with payload.
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            status: "ok",
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiEnvelope<serde_json::Value> {
    /// Success envelope without payload.
    pub fn ok_empty(message: impl Into<String>) -> Self {
        Self {
            status: "ok",
            message: message.into(),
            data: None,
        }
    }

    /// Error envelope (data is always null).
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: message.into(),
            data: None,
        }
    }
}

/// Create the API router with all endpoints
pub fn api_router() -> Router {
    Router::new().merge(events_routes()).merge(health_routes())
}
