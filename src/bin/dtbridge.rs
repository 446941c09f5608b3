use clap::{Parser, Subcommand};
use dtbridge::{DtbridgeConfig, OutputFormat};
use tracing::Level;

mod commands;

use commands::config::ConfigArgs;
use commands::models::ModelsArgs;
use commands::query::QueryArgs;
use commands::serve::ServeArgs;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// configuration file path, by default $HOME/.dtbridge/dtbridge.toml is used
    #[clap(short, long)]
    config: Option<String>,

    /// Print debug information
    #[clap(long)]
    debug: bool,

    /// Output format: table, markdown, json, json-pretty, json-line, psv
    #[clap(short, long, global = true, default_value = "table")]
    format: OutputFormat,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server answering grid widget requests
    Serve(ServeArgs),

    /// Run a single widget request against the configured database
    Query(QueryArgs),

    /// List the configured models
    Models(ModelsArgs),

    /// Show the active configuration
    Config(ConfigArgs),
}

fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.debug { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config = match DtbridgeConfig::new(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Serve(args) => commands::serve::run(&config, args),
        Commands::Query(args) => commands::query::run(&config, args, cli.format),
        Commands::Models(args) => commands::models::run(&config, args, cli.format),
        Commands::Config(args) => commands::config::run(&config, args, cli.format),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
