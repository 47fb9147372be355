//! Server module for Pulse
//!
//! Contains the main server initialization and runtime logic.

use anyhow::{Context, Result};
use axum::{routing::get, Extension, Router};
use config::{Config, Environment, File, FileFormat};
use pulse_core::{EventBus, EventDispatcher, SubscriptionRegistry};
use pulse_store::EventStore;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub data_dir: Option<String>,
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Event bus configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BusConfig {
    /// Outbound frames buffered per connection
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Bound on a single connection's enqueue during fan-out
    #[serde(default = "default_delivery_timeout_ms")]
    pub delivery_timeout_ms: u64,
    /// Malformed control frames tolerated before closing the connection
    #[serde(default = "default_max_protocol_errors")]
    pub max_protocol_errors: u32,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            delivery_timeout_ms: default_delivery_timeout_ms(),
            max_protocol_errors: default_max_protocol_errors(),
        }
    }
}

fn default_channel_capacity() -> usize {
    64
}

fn default_delivery_timeout_ms() -> u64 {
    5000
}

fn default_max_protocol_errors() -> u32 {
    8
}

/// Dispatcher configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DispatcherConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            poll_interval_secs: default_poll_interval(),
        }
    }
}

fn default_poll_interval() -> u64 {
    2
}

/// Gateway settings shared with the WebSocket handlers.
#[derive(Debug, Clone, Copy)]
pub struct GatewaySettings {
    /// Per-connection outbound channel capacity
    pub channel_capacity: usize,
    /// Malformed-frame threshold before the connection is closed
    pub max_protocol_errors: u32,
}

const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Load configuration from files and environment
pub(crate) fn load_config() -> Result<AppConfig> {
    let config = Config::builder()
        // 1. Embedded defaults (always available)
        .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
        // 2. External overrides (optional)
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name("config/local").required(false))
        .add_source(
            File::with_name(&format!(
                "config/{}",
                std::env::var("PULSE_ENV").unwrap_or_else(|_| "development".to_string())
            ))
            .required(false),
        )
        // 3. Environment variables (highest priority), e.g. PULSE_SERVER__PORT
        .add_source(
            Environment::with_prefix("PULSE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

/// Default data directory (~/.pulse)
fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|p| p.join(".pulse"))
        .unwrap_or_else(|| PathBuf::from(".pulse"))
}

/// Run the server
pub async fn run() -> Result<()> {
    info!("Starting Pulse event bus v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config().context("Failed to load configuration")?;
    info!("Configuration loaded");

    let data_dir = config
        .data_dir
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(default_data_dir);
    info!("Data directory: {}", data_dir.display());

    let db_path = data_dir.join("pulse.db");
    let store = Arc::new(
        EventStore::from_path(&db_path)
            .await
            .context("Failed to initialize SQLite event store")?,
    );

    let registry = Arc::new(SubscriptionRegistry::new());
    let bus = Arc::new(
        EventBus::new(Arc::clone(&store), Arc::clone(&registry))
            .with_delivery_timeout(Duration::from_millis(config.bus.delivery_timeout_ms)),
    );
    info!("Event bus initialized");

    let shutdown = CancellationToken::new();
    let dispatcher_handle = if config.dispatcher.enabled {
        let dispatcher = Arc::new(EventDispatcher::new(
            Arc::clone(&store),
            Duration::from_secs(config.dispatcher.poll_interval_secs),
        ));
        Some(dispatcher.spawn(shutdown.clone()))
    } else {
        info!("Event dispatcher disabled");
        None
    };

    // Record the boot in the durable log
    if let Err(e) = bus
        .publish(
            "service.startup",
            serde_json::json!({"service": "pulse"}),
            "system",
        )
        .await
    {
        warn!("Failed to record startup event: {}", e);
    }

    let settings = GatewaySettings {
        channel_capacity: config.bus.channel_capacity,
        max_protocol_errors: config.bus.max_protocol_errors,
    };

    let app = Router::new()
        .route("/", get(|| async { "Pulse Event Bus" }))
        .merge(crate::api::api_router())
        .merge(crate::websocket::websocket_router())
        .layer(Extension(store))
        .layer(Extension(registry))
        .layer(Extension(bus))
        .layer(Extension(settings))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    info!("HTTP server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    shutdown.cancel();
    if let Some(handle) = dispatcher_handle {
        match tokio::time::timeout(Duration::from_secs(5), handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Dispatcher task error: {}", e),
            Err(_) => warn!("Dispatcher shutdown timeout, aborting"),
        }
    }

    info!("Pulse shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}
