//! Pulse Core - Event Bus Engine
//!
//! This crate provides the core logic of the Pulse event bus:
//! - Registry: live streaming connections and their interest sets
//! - Bus: the publish pipeline (validate, durably append, fan out)
//! - Dispatcher: background consumer loop advancing event status

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bus;
pub mod dispatcher;
pub mod error;
pub mod registry;

pub use bus::{EventBus, EventFrame};
pub use dispatcher::{EventConsumer, EventDispatcher};
pub use error::{Error, Result};
pub use registry::SubscriptionRegistry;
