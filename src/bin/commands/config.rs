use anyhow::Result;
use clap::Args;
use dtbridge::{DatabaseConn, DtbridgeConfig, OutputFormat};
use serde::Serialize;
use std::path::Path;

/// Arguments for the Config command
#[derive(Args)]
pub struct ConfigArgs {
    /// Check that every configured model's table exists in the database
    #[clap(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Serialize)]
struct ConfigInfo {
    config_file: String,
    database: DatabaseInfo,
    server: ServerInfo,
    column_search: bool,
    model_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    models: Option<Vec<ModelStatus>>,
}

#[derive(Debug, Serialize)]
struct DatabaseInfo {
    path: String,
    exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_bytes: Option<u64>,
}

#[derive(Debug, Serialize)]
struct ServerInfo {
    address: String,
    port: u16,
    mount_path: String,
}

#[derive(Debug, Serialize)]
struct ModelStatus {
    name: String,
    table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    table_exists: Option<bool>,
}

pub fn run(config: &DtbridgeConfig, args: ConfigArgs, output_format: OutputFormat) -> Result<()> {
    let ConfigArgs { verbose } = args;

    let db_exists = Path::new(&config.database_path).exists();
    let size_bytes = if db_exists {
        std::fs::metadata(&config.database_path)
            .ok()
            .map(|m| m.len())
    } else {
        None
    };

    let models = if verbose {
        let db = if db_exists {
            DatabaseConn::open_read_only(&config.database_path).ok()
        } else {
            None
        };
        Some(
            config
                .models
                .iter()
                .map(|(name, model)| ModelStatus {
                    name: name.clone(),
                    table: model.table.clone(),
                    table_exists: db
                        .as_ref()
                        .and_then(|db| db.table_exists(&model.table).ok()),
                })
                .collect(),
        )
    } else {
        None
    };

    let info = ConfigInfo {
        config_file: DtbridgeConfig::config_file_path(),
        database: DatabaseInfo {
            path: config.database_path.clone(),
            exists: db_exists,
            size_bytes,
        },
        server: ServerInfo {
            address: config.address.clone(),
            port: config.port,
            mount_path: config.mount_path.clone(),
        },
        column_search: config.column_search,
        model_count: config.models.len(),
        models,
    };

    if output_format.is_json() {
        return super::print_json(&info, output_format);
    }

    println!("dtbridge Configuration");
    println!("======================\n");
    println!("Config file:        {}", info.config_file);
    println!("{}", config.summary());

    if let Some(models) = &info.models {
        println!();
        println!("Model Tables:");
        for model in models {
            let status = match model.table_exists {
                Some(true) => "ok",
                Some(false) => "missing",
                None => "unknown",
            };
            println!("  {:<20} {:<30} {}", model.name, model.table, status);
        }
    }

    Ok(())
}
