use anyhow::Result;
use clap::Args;
use dtbridge::{DtbridgeConfig, OutputFormat};
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Arguments for the Models command
#[derive(Args)]
pub struct ModelsArgs {
    /// Only show models whose name contains this text
    pub filter: Option<String>,
}

#[derive(Debug, Serialize, Tabled)]
struct ModelInfo {
    name: String,
    table: String,
    columns: String,
    filter_fields: String,
    customizations: String,
}

pub fn run(config: &DtbridgeConfig, args: ModelsArgs, output_format: OutputFormat) -> Result<()> {
    let ModelsArgs { filter } = args;
    let filter = filter.map(|f| f.to_lowercase());

    let models: Vec<ModelInfo> = config
        .models
        .iter()
        .filter(|(name, _)| match &filter {
            Some(f) => name.to_lowercase().contains(f),
            None => true,
        })
        .map(|(name, model)| ModelInfo {
            name: name.clone(),
            table: model.table.clone(),
            columns: if model.columns.is_empty() {
                "*".to_string()
            } else {
                model.columns.join(", ")
            },
            filter_fields: model.filter_fields.join(", "),
            customizations: model
                .customizations
                .keys()
                .cloned()
                .collect::<Vec<_>>()
                .join(", "),
        })
        .collect();

    match output_format {
        OutputFormat::Json | OutputFormat::JsonPretty => super::print_json(&models, output_format),
        OutputFormat::JsonLine => {
            for model in &models {
                println!("{}", serde_json::to_string(model)?);
            }
            Ok(())
        }
        OutputFormat::Psv => {
            println!("name|table|columns|filter_fields|customizations");
            for m in &models {
                println!(
                    "{}|{}|{}|{}|{}",
                    m.name, m.table, m.columns, m.filter_fields, m.customizations
                );
            }
            Ok(())
        }
        OutputFormat::Markdown => {
            println!("{}", Table::new(&models).with(Style::markdown()));
            Ok(())
        }
        OutputFormat::Table => {
            if models.is_empty() {
                println!(
                    "No models configured. Add [models.<Name>] tables to {}",
                    DtbridgeConfig::config_file_path()
                );
            } else {
                println!("{}", Table::new(&models).with(Style::rounded()));
            }
            Ok(())
        }
    }
}
