//! Middleware for the Pulse server

pub mod auth;
