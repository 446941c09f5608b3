#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! dtbridge - server-side processing backend for tabular grid widgets
//!
//! A grid widget in server-side mode asks the backend for one page of rows at a
//! time, together with its sort order, a global search term and an optional filter
//! form. dtbridge translates each request into a query against an SQLite database
//! and answers in the widget's JSON envelope.
//!
//! # Feature Flags
//!
//! | Feature | Description | Key Dependencies |
//! |---------|-------------|------------------|
//! | (none) | Request translation, model plugin, SQLite access | `rusqlite`, `serde_json` |
//! | `server` | axum HTTP endpoint | `axum`, `tokio`, `tower-http` |
//! | `display` | Table formatting with `tabled` | `tabled` |
//! | `cli` | `dtbridge` binary | All above + `clap`, `tracing-subscriber` |
//!
//! # Architecture
//!
//! - **[`datatables`]**: the widget protocol (request, columns, response envelope)
//! - **[`datasource`]**: plugins answering requests, the plugin registry, model tables
//! - **[`database`]**: SQLite connection wrapper and select builder
//! - **[`config`]**: configuration file and environment handling
//! - **`server`**: HTTP endpoint (feature `server`)
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use dtbridge::{DatatablesRequest, PluginRegistry, DtbridgeConfig};
//! use serde_json::json;
//!
//! let config = DtbridgeConfig::new(&None)?;
//! let registry = PluginRegistry::from_config(&config)?;
//!
//! let request = DatatablesRequest::new(
//!     "model/Users",
//!     json!({"draw": 1, "start": 0, "length": 10, "columns": [{"data": "name"}]}),
//! );
//! let response = registry.dispatch(&request)?;
//! println!("{}", serde_json::to_string_pretty(&response)?);
//! ```

pub mod config;
pub mod database;
pub mod datasource;
pub mod datatables;
pub mod output;

// Server module - requires server feature
#[cfg(feature = "server")]
pub mod server;

// =============================================================================
// Configuration (always available)
// =============================================================================

pub use config::{DtbridgeConfig, ModelConfig};

// =============================================================================
// Protocol and datasource types
// =============================================================================

pub use database::{DatabaseConn, Predicate, RowMap, SelectQuery, SortDirection};
pub use datasource::{
    ConfiguredTable, DatasourceError, DatasourcePlugin, DatasourceResult, ErrorKind,
    ModelPlugin, ModelRegistry, ModelResolver, ModelTable, PluginRegistry,
};
pub use datatables::{
    Column, DatatablesRequest, DatatablesResponse, ErrorEnvelope, OrderDir, ResponseEnvelope,
};
pub use output::OutputFormat;

// =============================================================================
// Server Module - requires "server" feature
// =============================================================================

#[cfg(feature = "server")]
pub use server::{create_axum_router, start_server, ServerConfig, ServerState};
