// Calculator MCP server: integer arithmetic over stdio

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use toolhost_core::ToolRegistry;
use toolhost_mcp::cli::{init_tracing, ConfigArgs};
use toolhost_mcp::tools::calculator;
use toolhost_mcp::{McpServer, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "calculator-server")]
#[command(about = "MCP server exposing integer arithmetic tools", long_about = None)]
struct Args {
    #[command(flatten)]
    config: ConfigArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    tracing::info!("Calculator MCP server starting...");
    let config = ServerConfig::load(&args.config.config)?;

    let mut registry = ToolRegistry::new();
    calculator::register(&mut registry)?;
    tracing::info!("Registered {} tools", registry.len());

    let server = McpServer::new(config.server_info("Calculator Server"), Arc::new(registry));
    server.start().await?;

    Ok(())
}
