use anyhow::{anyhow, Result};
use clap::Args;
use dtbridge::output::format_rows;
use dtbridge::{DatatablesRequest, DtbridgeConfig, OutputFormat, PluginRegistry};
use serde_json::Value;

/// Arguments for the Query command
#[derive(Args)]
pub struct QueryArgs {
    /// Request path below the mount point, e.g. model/Users or model/Users/recent
    #[clap(name = "PATH")]
    pub path: String,

    /// Request parameters as JSON, e.g. '{"start": 0, "length": 10, "columns": [{"data": "name"}]}'
    #[clap(long)]
    pub params: Option<String>,

    /// Show the executed SQL statement
    #[clap(long)]
    pub show_query: bool,
}

pub fn run(config: &DtbridgeConfig, args: QueryArgs, output_format: OutputFormat) -> Result<()> {
    let QueryArgs {
        path,
        params,
        show_query,
    } = args;

    let params: Value = match params {
        Some(p) => serde_json::from_str(&p).map_err(|e| anyhow!("Invalid --params JSON: {}", e))?,
        None => Value::Object(Default::default()),
    };

    let registry = PluginRegistry::from_config(config)?;
    let request = DatatablesRequest::new(&path, params);
    let response = registry.dispatch(&request).map_err(|e| {
        anyhow!(
            "{} (HTTP {}): {}",
            e.kind.as_str(),
            e.status_code(),
            e.message
        )
    })?;

    if output_format.is_json() {
        return super::print_json(&response, output_format);
    }

    println!(
        "draw {} | total {} | filtered {} | rows {}",
        response.draw(),
        response.records_total(),
        response.records_filtered(),
        response.rows().len()
    );
    if show_query {
        if let Some(query) = response.query() {
            println!("{}", query);
        }
    }
    println!("{}", format_rows(response.rows(), output_format)?);
    Ok(())
}
