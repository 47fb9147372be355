//! Event - the unit of record in the durable log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Processing status of a stored event.
///
/// Every event starts as `New`. The bus itself never advances status;
/// delivery to live subscribers does not depend on it. The dispatcher (or
/// an external consumer) moves events to `Processed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Recorded but not yet consumed
    New,
    /// Consumed by a registered consumer
    Processed,
}

impl EventStatus {
    /// Returns the string representation of the status
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Processed => "processed",
        }
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "processed" => Ok(Self::Processed),
            _ => Err(format!("unknown event status: {s}")),
        }
    }
}

/// A durably recorded event.
///
/// `id` and `created_at` are assigned by the store at insert time and are
/// immutable. Ids are unique and strictly increasing in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Monotonically increasing identifier assigned at insert
    pub id: i64,
    /// Event class used for routing; never empty
    pub event_name: String,
    /// Opaque structured payload, passed through unvalidated
    pub payload: serde_json::Value,
    /// Insert timestamp (UTC)
    pub created_at: DateTime<Utc>,
    /// Origin of the event (`"system"` when the publisher gave none)
    pub source: String,
    /// Processing status
    pub status: EventStatus,
}
