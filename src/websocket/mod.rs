//! WebSocket module for Pulse
//!
//! Provides the real-time streaming endpoint:
//! - /ws/events - subscribe/unsubscribe control frames in, event frames out

pub mod protocol;
pub mod stream;

pub use stream::stream_handler;

use axum::{routing::get, Router};

/// Create the WebSocket router
pub fn websocket_router() -> Router {
    Router::new().route("/ws/events", get(stream_handler))
}
