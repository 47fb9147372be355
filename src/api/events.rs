//! Event publish and retrieval endpoints.
//!
//! The HTTP surface of the bus: publish goes through the full pipeline
//! (validate → durable append → fan-out), retrieval reads the log directly.
//! Subscribe/unsubscribe exist as stubs for HTTP clients; live
//! subscriptions go through the WebSocket stream.

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use pulse_core::{Error, EventBus};
use pulse_store::EventStore;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use super::ApiEnvelope;
use crate::middleware::auth::Principal;

/// Publish request body
#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    /// Event class used for routing; absence is reported in the envelope
    /// rather than as an extractor rejection
    #[serde(default)]
    pub event_name: Option<String>,
    /// Opaque payload; defaults to an empty object
    #[serde(default = "default_payload")]
    pub payload: serde_json::Value,
    /// Origin override; the HTTP path defaults to "api"
    #[serde(default)]
    pub source: Option<String>,
}

fn default_payload() -> serde_json::Value {
    serde_json::json!({})
}

/// Retrieval query
#[derive(Debug, Deserialize)]
pub struct ListEventsQuery {
    /// Restrict to a single event name
    pub event_name: Option<String>,
}

/// Publish an event (POST /api/events/publish)
async fn publish_event(
    Principal(principal): Principal,
    Extension(bus): Extension<Arc<EventBus>>,
    Json(request): Json<PublishRequest>,
) -> Response {
    let Some(event_name) = request.event_name else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiEnvelope::error("Missing event_name")),
        )
            .into_response();
    };
    debug!("Publish '{}' from principal {:?}", event_name, principal);

    let source = request.source.as_deref().unwrap_or("api");
    match bus.publish(&event_name, request.payload, source).await {
        Ok(event) => (
            StatusCode::OK,
            Json(ApiEnvelope::ok_empty(format!(
                "Event '{}' published.",
                event.event_name
            ))),
        )
            .into_response(),
        Err(Error::Validation(msg)) => {
            (StatusCode::BAD_REQUEST, Json(ApiEnvelope::error(msg))).into_response()
        }
        Err(e) => {
            warn!("Publish failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiEnvelope::error(format!("Event not recorded: {}", e))),
            )
                .into_response()
        }
    }
}

/// Retrieve persisted events (GET /api/events)
async fn list_events(
    Principal(_principal): Principal,
    Extension(store): Extension<Arc<EventStore>>,
    Query(query): Query<ListEventsQuery>,
) -> Response {
    match store.list(query.event_name.as_deref()).await {
        Ok(events) => {
            let message = format!("{} event(s)", events.len());
            (StatusCode::OK, Json(ApiEnvelope::ok(message, events))).into_response()
        }
        Err(e) => {
            warn!("Event retrieval failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiEnvelope::error(format!("Retrieval failed: {}", e))),
            )
                .into_response()
        }
    }
}

/// HTTP subscribe stub (POST /api/events/subscribe)
async fn subscribe_stub() -> Json<ApiEnvelope<serde_json::Value>> {
    Json(ApiEnvelope::ok_empty(
        "Use the /ws/events stream for real-time subscriptions.",
    ))
}

/// HTTP unsubscribe stub (POST /api/events/unsubscribe)
async fn unsubscribe_stub() -> Json<ApiEnvelope<serde_json::Value>> {
    Json(ApiEnvelope::ok_empty(
        "Use the /ws/events stream for real-time subscriptions.",
    ))
}

/// Create event routes
pub fn events_routes() -> Router {
    Router::new()
        .route("/api/events/publish", post(publish_event))
        .route("/api/events", get(list_events))
        .route("/api/events/subscribe", post(subscribe_stub))
        .route("/api/events/unsubscribe", post(unsubscribe_stub))
}
