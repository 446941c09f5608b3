//! HTTP server for the grid widget's server-side processing requests
//!
//! # Routes
//!
//! - `GET /health` - liveness check
//! - `ANY {mount_path}/{plugin}/{model}[/{customization}]` - widget requests
//!
//! # Usage
//!
//! ```rust,ignore
//! use dtbridge::datasource::PluginRegistry;
//! use dtbridge::server::{start_server, ServerConfig};
//! use dtbridge::DtbridgeConfig;
//!
//! let config = DtbridgeConfig::new(&None)?;
//! let registry = PluginRegistry::from_config(&config)?;
//! start_server(registry, ServerConfig::from_config(&config)).await?;
//! ```

pub mod handler;

pub use handler::datatables_handler;

use crate::config::{normalize_mount_path, DtbridgeConfig};
use crate::datasource::PluginRegistry;
use axum::{
    routing::{any, get},
    Router as AxumRouter,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

// =============================================================================
// Server Configuration
// =============================================================================

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub address: String,

    /// Port to listen on
    pub port: u16,

    /// Path prefix of the datatables endpoint (`""` for the root)
    pub mount_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 8080,
            mount_path: "/datatables".to_string(),
        }
    }
}

impl ServerConfig {
    /// Create a new server configuration
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &DtbridgeConfig) -> Self {
        Self {
            address: config.address.clone(),
            port: config.port,
            mount_path: normalize_mount_path(&config.mount_path),
        }
    }

    /// Set the address
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the mount path
    pub fn with_mount_path(mut self, mount_path: &str) -> Self {
        self.mount_path = normalize_mount_path(mount_path);
        self
    }

    /// Get the full bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

// =============================================================================
// Server State
// =============================================================================

/// Shared server state
#[derive(Clone)]
pub struct ServerState {
    /// Datasource plugins by alias
    pub registry: Arc<PluginRegistry>,

    /// Server configuration
    pub config: Arc<ServerConfig>,
}

impl ServerState {
    pub fn new(registry: PluginRegistry, config: ServerConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            config: Arc::new(config),
        }
    }
}

// =============================================================================
// Axum Router Creation
// =============================================================================

/// Create the Axum router serving the datatables endpoint
pub fn create_axum_router(state: ServerState) -> AxumRouter {
    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mount = state.config.mount_path.clone();
    let root = if mount.is_empty() { "/".to_string() } else { mount.clone() };

    AxumRouter::new()
        .route("/health", get(health_handler))
        .route(&root, any(datatables_handler))
        .route(&format!("{}/*path", mount), any(datatables_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Health check handler
async fn health_handler() -> &'static str {
    "OK"
}

// =============================================================================
// Server Startup
// =============================================================================

/// Start the HTTP server
pub async fn start_server(registry: PluginRegistry, config: ServerConfig) -> anyhow::Result<()> {
    let bind_address = config.bind_address();
    let mount = config.mount_path.clone();
    let state = ServerState::new(registry, config);

    tracing::info!(
        "plugins registered: {}",
        state.registry.aliases().join(", ")
    );

    let app = create_axum_router(state);

    tracing::info!(
        "Starting datatables server on {} (mounted at '{}')",
        bind_address,
        if mount.is_empty() { "/" } else { mount.as_str() }
    );

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
