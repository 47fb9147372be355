//! Pulse Store - Durable Event Log
//!
//! This crate provides the persistence layer for the Pulse event bus:
//! - Event: the unit of record (id, name, opaque payload, timestamps, status)
//! - EventStore: SQLite-backed append and ordered retrieval via sqlx
//!
//! The log is append-only: rows are never mutated after insert except for
//! the processing `status` field.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod event;
pub mod store;

pub use error::{Error, Result};
pub use event::{Event, EventStatus};
pub use store::EventStore;
