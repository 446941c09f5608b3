use anyhow::{anyhow, Result};
use clap::Args;
use dtbridge::server::{start_server, ServerConfig};
use dtbridge::{DtbridgeConfig, PluginRegistry};

/// Arguments for the Serve command
#[derive(Args)]
pub struct ServeArgs {
    /// Address to bind to (overrides the configuration)
    #[clap(short, long)]
    pub address: Option<String>,

    /// Port to listen on (overrides the configuration)
    #[clap(short, long)]
    pub port: Option<u16>,
}

pub fn run(config: &DtbridgeConfig, args: ServeArgs) -> Result<()> {
    let ServeArgs { address, port } = args;

    let mut server_config = ServerConfig::from_config(config);
    if let Some(address) = address {
        server_config = server_config.with_address(address);
    }
    if let Some(port) = port {
        server_config = server_config.with_port(port);
    }

    if config.models.is_empty() {
        tracing::warn!(
            "no models configured; add [models.<Name>] tables to {}",
            DtbridgeConfig::config_file_path()
        );
    }

    let registry = PluginRegistry::from_config(config)?;

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| anyhow!("Failed to start async runtime: {}", e))?;
    runtime.block_on(start_server(registry, server_config))
}
