//! MCP bridge CLI binary entry point.

use std::sync::Arc;

use clap::Parser;
use mcp_bridge::cli::{commands, Cli, Commands};
use mcp_bridge::config::BridgeConfig;
use mcp_bridge::host::BridgeHost;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = BridgeConfig::load_default(cli.config.as_deref())?;
    let host = Arc::new(BridgeHost::new(config)?);

    let result = match cli.command {
        Commands::Status => commands::handle_status(&host).await,
        Commands::Tools(args) => commands::handle_tools(&host, args.json).await,
        Commands::Call(args) => commands::handle_call(&host, &args.tool, &args.args).await,
        Commands::Check(args) => commands::handle_check(&host, &args.command),
    };

    host.shutdown().await;
    result
}
