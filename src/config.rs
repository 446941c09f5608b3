use anyhow::{anyhow, Result};
use config::Config;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One model exposed to the grid widget
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Table, view or join expression to select from
    pub table: String,

    /// Projected column expressions; every column when empty
    #[serde(default)]
    pub columns: Vec<String>,

    /// Join clauses appended after the table, e.g. `LEFT JOIN orgs o ON o.id = u.org_id`
    #[serde(default)]
    pub joins: Vec<String>,

    /// Condition every request is restricted to
    #[serde(default, rename = "where", skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,

    /// `GROUP BY` expressions; search then also matches aggregated columns
    #[serde(default)]
    pub group_by: Vec<String>,

    /// Fields the filter form may restrict by equality
    #[serde(default)]
    pub filter_fields: Vec<String>,

    /// Named conditions selectable through the third path segment
    #[serde(default)]
    pub customizations: BTreeMap<String, String>,
}

pub struct DtbridgeConfig {
    /// Path to the SQLite database the models live in
    pub database_path: String,

    /// Address the HTTP server binds to
    pub address: String,

    /// Port the HTTP server listens on
    pub port: u16,

    /// Path the datatables endpoint is mounted at
    pub mount_path: String,

    /// Compose per-column search terms into the query
    pub column_search: bool,

    /// Exposed models by name
    pub models: BTreeMap<String, ModelConfig>,
}

const EMPTY_CONFIG: &str = r#"### dtbridge configuration file

### SQLite database holding the models
# database_path = "~/.dtbridge/dtbridge.sqlite3"

### HTTP server
# address = "127.0.0.1"
# port = 8080
# mount_path = "/datatables"

### apply per-column search terms (columns[i][search][value])
# column_search = false

### models, requested as {mount_path}/model/{Name}[/{customization}]
# [models.Users]
# table = "users"
# columns = ["id", "name", "email", "status"]
# where = "deleted_at IS NULL"
# filter_fields = ["status"]
#
# [models.Users.customizations]
# recent = "created_at > date('now', '-30 days')"
#
# [models.OrgSizes]
# table = "orgs o"
# columns = ["o.name AS org", "COUNT(u.id) AS members"]
# joins = ["LEFT JOIN users u ON u.org_id = o.id"]
# group_by = ["o.id"]
"#;

const DEFAULT_ADDRESS: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_MOUNT_PATH: &str = "/datatables";

/// Shape of the merged configuration sources
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    database_path: Option<String>,
    address: Option<String>,
    port: Option<u16>,
    mount_path: Option<String>,
    column_search: Option<bool>,
    #[serde(default)]
    models: BTreeMap<String, ModelConfig>,
}

impl Default for DtbridgeConfig {
    fn default() -> Self {
        Self {
            database_path: format!("{}/dtbridge.sqlite3", dtbridge_dir()),
            address: DEFAULT_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            mount_path: DEFAULT_MOUNT_PATH.to_string(),
            column_search: false,
            models: BTreeMap::new(),
        }
    }
}

fn home_dir() -> String {
    dirs::home_dir()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|| ".".to_string())
}

fn dtbridge_dir() -> String {
    format!("{}/.dtbridge", home_dir())
}

/// Expand a leading `~/` to the home directory
fn expand_home(path: &str) -> String {
    match path.strip_prefix("~/") {
        Some(rest) => format!("{}/{}", home_dir(), rest),
        None => path.to_string(),
    }
}

/// Normalize a mount path to `/segment[/segment]` form; the root mounts at `""`
pub fn normalize_mount_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

impl DtbridgeConfig {
    /// Function to create and initialize a new configuration
    pub fn new(path: &Option<String>) -> Result<DtbridgeConfig> {
        let mut builder = Config::builder();

        // Add in toml configuration file
        match path {
            Some(p) => {
                let path = Path::new(p.as_str());
                if path.exists() {
                    let path_str = path
                        .to_str()
                        .ok_or_else(|| anyhow!("Could not convert path to string"))?;
                    builder = builder.add_source(config::File::with_name(path_str));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG)
                        .map_err(|e| anyhow!("Unable to create config file: {}", e))?;
                }
            }
            None => {
                let dir = dtbridge_dir();
                std::fs::create_dir_all(dir.as_str())
                    .map_err(|e| anyhow!("Unable to create dtbridge directory: {}", e))?;
                let p = Self::config_file_path();
                if Path::new(p.as_str()).exists() {
                    builder = builder.add_source(config::File::with_name(p.as_str()));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG).map_err(|e| {
                        anyhow!("Unable to create config file {}: {}", p.as_str(), e)
                    })?;
                }
            }
        }

        // Add in settings from the environment (with a prefix of DTBRIDGE)
        // E.g., `DTBRIDGE_PORT=9000 ./dtbridge serve` would change the port
        builder = builder.add_source(config::Environment::with_prefix("DTBRIDGE"));

        let settings = builder
            .build()
            .map_err(|e| anyhow!("Failed to build configuration: {}", e))?;

        let raw = settings
            .try_deserialize::<RawConfig>()
            .map_err(|e| anyhow!("Failed to deserialize configuration: {}", e))?;

        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<DtbridgeConfig> {
        let defaults = DtbridgeConfig::default();

        for (name, model) in &raw.models {
            if model.table.trim().is_empty() {
                return Err(anyhow!("Model '{}' has no table configured", name));
            }
        }

        Ok(DtbridgeConfig {
            database_path: raw
                .database_path
                .map(|p| expand_home(&p))
                .unwrap_or(defaults.database_path),
            address: raw.address.unwrap_or(defaults.address),
            port: raw.port.unwrap_or(defaults.port),
            mount_path: normalize_mount_path(
                raw.mount_path.as_deref().unwrap_or(DEFAULT_MOUNT_PATH),
            ),
            column_search: raw.column_search.unwrap_or(defaults.column_search),
            models: raw.models,
        })
    }

    /// `address:port` for binding the HTTP server
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    /// Display configuration summary
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Database Path:      {}", self.database_path),
            format!("Listen Address:     {}", self.bind_address()),
            format!("Mount Path:         {}", self.mount_path_display()),
            format!("Column Search:      {}", self.column_search),
            format!("Models:             {}", self.models.len()),
        ];

        for (name, model) in &self.models {
            lines.push(format!("  {:<16} -> {}", name, model.table));
        }

        if !Path::new(&self.database_path).exists() {
            lines.push("Database file does not exist; serving will fail until it does".to_string());
        }

        lines.join("\n")
    }

    fn mount_path_display(&self) -> &str {
        if self.mount_path.is_empty() {
            "/"
        } else {
            &self.mount_path
        }
    }

    /// Get the config file path
    pub fn config_file_path() -> String {
        format!("{}/dtbridge.toml", dtbridge_dir())
    }
}
