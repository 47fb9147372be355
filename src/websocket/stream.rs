//! Event stream WebSocket handler
//!
//! Accepts long-lived connections, registers them with the subscription
//! registry, applies subscribe/unsubscribe control frames in the order
//! received, and pushes matched event frames. Every exit path deregisters
//! the connection before the handler returns.

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
    Extension,
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use pulse_core::SubscriptionRegistry;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::protocol::{ControlFrame, ServerFrame};
use crate::middleware::auth::Principal;
use crate::server::GatewaySettings;

/// WebSocket upgrade handler
pub async fn stream_handler(
    Principal(principal): Principal,
    ws: WebSocketUpgrade,
    Extension(registry): Extension<Arc<SubscriptionRegistry>>,
    Extension(settings): Extension<GatewaySettings>,
) -> impl IntoResponse {
    debug!("Event stream upgrade from principal {:?}", principal);
    ws.on_upgrade(move |socket| handle_socket(socket, registry, settings))
}

/// Per-connection control-frame state.
///
/// Applies subscribe/unsubscribe frames against the registry and tracks how
/// many malformed frames the connection has sent. Once the count exceeds
/// `max_protocol_errors` the session asks the caller to close.
struct ControlSession {
    connection_id: Uuid,
    registry: Arc<SubscriptionRegistry>,
    protocol_errors: u32,
    max_protocol_errors: u32,
}

impl ControlSession {
    fn new(
        connection_id: Uuid,
        registry: Arc<SubscriptionRegistry>,
        max_protocol_errors: u32,
    ) -> Self {
        Self {
            connection_id,
            registry,
            protocol_errors: 0,
            max_protocol_errors,
        }
    }

    /// Apply one inbound text frame. Returns the reply and whether the
    /// connection has exhausted its malformed-frame allowance.
    async fn apply(&mut self, text: &str) -> (ServerFrame, bool) {
        let reply = match serde_json::from_str::<ControlFrame>(text) {
            Ok(ControlFrame::Subscribe { event_name }) => {
                if event_name.trim().is_empty() {
                    ServerFrame::Error {
                        error: "event_name must not be empty".to_string(),
                    }
                } else {
                    self.registry.subscribe(self.connection_id, &event_name).await;
                    ServerFrame::Subscribed {
                        subscribed: event_name,
                    }
                }
            }
            Ok(ControlFrame::Unsubscribe { event_name }) => {
                if event_name.trim().is_empty() {
                    ServerFrame::Error {
                        error: "event_name must not be empty".to_string(),
                    }
                } else {
                    self.registry
                        .unsubscribe(self.connection_id, &event_name)
                        .await;
                    ServerFrame::Unsubscribed {
                        unsubscribed: event_name,
                    }
                }
            }
            Err(e) => ServerFrame::Error {
                error: format!("Invalid control frame: {}", e),
            },
        };
        let close = self.record(&reply);
        (reply, close)
    }

    /// Reject an inbound frame that is not a text control frame. Counts
    /// against the malformed-frame allowance like any other bad frame.
    fn reject_unsupported(&mut self) -> (ServerFrame, bool) {
        let reply = ServerFrame::Error {
            error: "only text control frames are supported".to_string(),
        };
        let close = self.record(&reply);
        (reply, close)
    }

    fn record(&mut self, reply: &ServerFrame) -> bool {
        if matches!(reply, ServerFrame::Error { .. }) {
            self.protocol_errors += 1;
        }
        self.protocol_errors > self.max_protocol_errors
    }
}

/// Handle one streaming connection
async fn handle_socket(
    socket: WebSocket,
    registry: Arc<SubscriptionRegistry>,
    settings: GatewaySettings,
) {
    let connection_id = Uuid::new_v4();
    info!("Event stream connection established: {}", connection_id);

    // Registered before the first frame is read, so a publish racing with
    // the handshake can already match this connection.
    let (outbound_tx, mut outbound_rx) = mpsc::channel(settings.channel_capacity);
    registry.register(connection_id, outbound_tx).await;

    let (mut sender, mut receiver) = socket.split();
    let mut session = ControlSession::new(
        connection_id,
        Arc::clone(&registry),
        settings.max_protocol_errors,
    );

    loop {
        tokio::select! {
            // Event frames fanned out by the publish pipeline
            frame = outbound_rx.recv() => {
                match frame {
                    Some(frame) => match serde_json::to_string(&frame) {
                        Ok(json) => {
                            if sender.send(Message::Text(json)).await.is_err() {
                                warn!("Push failed for connection {}, closing", connection_id);
                                break;
                            }
                        }
                        Err(e) => error!("Failed to encode event frame: {}", e),
                    },
                    // The registry dropped us (stalled or failed delivery)
                    None => break,
                }
            }
            // Control frames from the client
            msg = receiver.next() => {
                let (reply, close) = match msg {
                    Some(Ok(Message::Text(text))) => session.apply(&text).await,
                    Some(Ok(Message::Binary(_))) => session.reject_unsupported(),
                    Some(Ok(Message::Close(_))) => {
                        info!("Event stream connection closed: {}", connection_id);
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sender.send(Message::Pong(data)).await;
                        continue;
                    }
                    Some(Ok(Message::Pong(_))) => continue,
                    Some(Err(e)) => {
                        error!("WebSocket error on {}: {}", connection_id, e);
                        break;
                    }
                    None => break,
                };
                if send_reply(&mut sender, &reply).await.is_err() {
                    break;
                }
                if close {
                    warn!(
                        "Connection {} exceeded the malformed-frame limit, closing",
                        connection_id
                    );
                    break;
                }
            }
        }
    }

    registry.deregister(connection_id).await;
    info!("Event stream connection ended: {}", connection_id);
}

async fn send_reply(
    sender: &mut SplitSink<WebSocket, Message>,
    reply: &ServerFrame,
) -> Result<(), ()> {
    match serde_json::to_string(reply) {
        Ok(json) => sender.send(Message::Text(json)).await.map_err(|_| ()),
        Err(e) => {
            error!("Failed to encode reply frame: {}", e);
            Ok(())
        }
    }
}
