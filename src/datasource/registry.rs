//! Registry mapping plugin aliases to datasource plugins
//!
//! The first path segment of every request selects the plugin. The registry is
//! filled once at startup and shared read-only between requests.

use crate::config::DtbridgeConfig;
use crate::database::DatabaseConn;
use crate::datasource::model::ModelPlugin;
use crate::datasource::plugin::{DatasourceError, DatasourcePlugin, DatasourceResult};
use crate::datasource::table::ModelRegistry;
use crate::datatables::{DatatablesRequest, DatatablesResponse};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Registry of datasource plugins by alias
#[derive(Default, Clone)]
pub struct PluginRegistry {
    plugins: HashMap<String, Arc<dyn DatasourcePlugin>>,
}

impl PluginRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the default registry: the `model` plugin over the configured database
    ///
    /// The database must already exist; it is opened read-only.
    pub fn from_config(config: &DtbridgeConfig) -> Result<Self> {
        let db = DatabaseConn::open_read_only(&config.database_path)?;
        Ok(Self::from_config_with_db(config, db))
    }

    /// Same as `from_config`, on an already opened database
    pub fn from_config_with_db(config: &DtbridgeConfig, db: DatabaseConn) -> Self {
        let models = ModelRegistry::from_config(&config.models);
        info!(
            "registering '{}' plugin with {} model(s)",
            ModelPlugin::ALIAS,
            models.len()
        );
        let plugin = ModelPlugin::new(Arc::new(Mutex::new(db)), Arc::new(models))
            .with_column_search(config.column_search);

        let mut registry = Self::new();
        registry.register(ModelPlugin::ALIAS, plugin);
        registry
    }

    /// Register a plugin under `alias`, replacing any previous one
    pub fn register<P: DatasourcePlugin>(&mut self, alias: &str, plugin: P) -> &mut Self {
        self.register_arc(alias, Arc::new(plugin))
    }

    pub fn register_arc(&mut self, alias: &str, plugin: Arc<dyn DatasourcePlugin>) -> &mut Self {
        self.plugins.insert(alias.to_string(), plugin);
        self
    }

    /// Check if an alias is registered
    pub fn has_plugin(&self, alias: &str) -> bool {
        self.plugins.contains_key(alias)
    }

    /// Registered aliases, sorted
    pub fn aliases(&self) -> Vec<&str> {
        let mut aliases: Vec<&str> = self.plugins.keys().map(String::as_str).collect();
        aliases.sort_unstable();
        aliases
    }

    /// Get the plugin for an alias
    pub fn get(&self, alias: &str) -> DatasourceResult<Arc<dyn DatasourcePlugin>> {
        self.plugins
            .get(alias)
            .cloned()
            .ok_or_else(|| DatasourceError::unknown_plugin(alias))
    }

    /// Route a request to the plugin named by its first path segment
    pub fn dispatch(&self, request: &DatatablesRequest) -> DatasourceResult<DatatablesResponse> {
        self.get(request.plugin_alias())?.process(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::datasource::plugin::ErrorKind;
    use serde_json::json;

    struct Echo;

    impl DatasourcePlugin for Echo {
        fn process(&self, request: &DatatablesRequest) -> DatasourceResult<DatatablesResponse> {
            let mut response = DatatablesResponse::new(request);
            response.set_query(request.path_parts().join("/"));
            Ok(response)
        }
    }

    #[test]
    fn test_register_and_dispatch() {
        let mut registry = PluginRegistry::new();
        registry.register("echo", Echo);

        assert!(registry.has_plugin("echo"));
        assert!(!registry.has_plugin("model"));
        assert_eq!(registry.aliases(), vec!["echo"]);

        let response = registry
            .dispatch(&DatatablesRequest::new("echo/a/b", json!({"draw": 2})))
            .unwrap();
        assert_eq!(response.draw(), 2);
        assert_eq!(response.query(), Some("echo/a/b"));
    }

    #[test]
    fn test_unknown_alias() {
        let registry = PluginRegistry::new();
        let err = registry
            .dispatch(&DatatablesRequest::new("nope/Users", json!({})))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownPlugin);
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn test_from_config_with_db() {
        let db = DatabaseConn::open_in_memory().unwrap();
        db.execute_batch(
            "CREATE TABLE items (id INTEGER PRIMARY KEY, label TEXT);
             INSERT INTO items (label) VALUES ('a'), ('b'), ('c');",
        )
        .unwrap();

        let mut config = DtbridgeConfig::default();
        config.models.insert(
            "Items".to_string(),
            ModelConfig {
                table: "items".to_string(),
                ..Default::default()
            },
        );

        let registry = PluginRegistry::from_config_with_db(&config, db);
        assert_eq!(registry.aliases(), vec!["model"]);

        let response = registry
            .dispatch(&DatatablesRequest::new(
                "model/Items",
                json!({"length": 2, "columns": [{"data": "label"}]}),
            ))
            .unwrap();
        assert_eq!(response.records_total(), 3);
        assert_eq!(response.rows().len(), 2);
    }

    fn journal_mode(path: &std::path::Path) -> String {
        rusqlite::Connection::open(path)
            .unwrap()
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_from_config_serves_existing_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.sqlite3");
        rusqlite::Connection::open(&path)
            .unwrap()
            .execute_batch(
                "PRAGMA journal_mode=DELETE;
                 CREATE TABLE items (id INTEGER PRIMARY KEY, label TEXT);
                 INSERT INTO items (label) VALUES ('a'), ('b');",
            )
            .unwrap();
        assert_eq!(journal_mode(&path), "delete");

        let mut config = DtbridgeConfig {
            database_path: path.to_string_lossy().to_string(),
            ..Default::default()
        };
        config.models.insert(
            "Items".to_string(),
            ModelConfig {
                table: "items".to_string(),
                ..Default::default()
            },
        );

        let registry = PluginRegistry::from_config(&config).unwrap();
        let response = registry
            .dispatch(&DatatablesRequest::new("model/Items", json!({})))
            .unwrap();
        assert_eq!(response.records_total(), 2);
        drop(registry);

        assert_eq!(journal_mode(&path), "delete");
    }

    #[test]
    fn test_from_config_missing_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/typo.sqlite3");
        let config = DtbridgeConfig {
            database_path: path.to_string_lossy().to_string(),
            ..Default::default()
        };

        assert!(PluginRegistry::from_config(&config).is_err());
        assert!(!path.exists());
        assert!(!dir.path().join("nested").exists());
    }
}
