//! Wire protocol for the event stream.
//!
//! Inbound control frames:
//! `{"action": "subscribe" | "unsubscribe", "event_name": "..."}`
//!
//! Outbound replies mirror the control frame:
//! `{"subscribed": "..."}`, `{"unsubscribed": "..."}`, `{"error": "..."}`.
//! Matched events arrive as `{"event_name": "...", "payload": {...}}`
//! (serialized from [`pulse_core::EventFrame`]).

use serde::{Deserialize, Serialize};

/// Control frame from the client
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ControlFrame {
    /// Register interest in an event name
    Subscribe {
        /// Event class to receive
        event_name: String,
    },
    /// Drop interest in an event name
    Unsubscribe {
        /// Event class to stop receiving
        event_name: String,
    },
}

/// Reply frame to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ServerFrame {
    /// Subscription acknowledged
    Subscribed {
        /// The event name now in the interest set
        subscribed: String,
    },
    /// Unsubscription acknowledged
    Unsubscribed {
        /// The event name removed from the interest set
        unsubscribed: String,
    },
    /// Malformed or rejected control frame; the connection stays open
    Error {
        /// What was wrong with the frame
        error: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_frame_parses() {
        let frame: ControlFrame =
            serde_json::from_str(r#"{"action": "subscribe", "event_name": "user.created"}"#)
                .unwrap();
        assert_eq!(
            frame,
            ControlFrame::Subscribe {
                event_name: "user.created".to_string()
            }
        );
    }

    #[test]
    fn test_unsubscribe_frame_parses() {
        let frame: ControlFrame =
            serde_json::from_str(r#"{"action": "unsubscribe", "event_name": "user.created"}"#)
                .unwrap();
        assert!(matches!(frame, ControlFrame::Unsubscribe { .. }));
    }

    #[test]
    fn test_unknown_action_rejected() {
        let result: Result<ControlFrame, _> =
            serde_json::from_str(r#"{"action": "replay", "event_name": "user.created"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_event_name_rejected() {
        let result: Result<ControlFrame, _> = serde_json::from_str(r#"{"action": "subscribe"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_reply_wire_shapes() {
        let json = serde_json::to_string(&ServerFrame::Subscribed {
            subscribed: "order.paid".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"subscribed":"order.paid"}"#);

        let json = serde_json::to_string(&ServerFrame::Unsubscribed {
            unsubscribed: "order.paid".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"unsubscribed":"order.paid"}"#);

        let json = serde_json::to_string(&ServerFrame::Error {
            error: "bad frame".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"error":"bad frame"}"#);
    }
}
