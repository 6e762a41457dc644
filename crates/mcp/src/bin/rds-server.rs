// RDS MCP server: database instance inspection over stdio

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use toolhost_core::ToolRegistry;
use toolhost_mcp::aws::load_sdk_config;
use toolhost_mcp::cli::{init_tracing, AwsArgs, ConfigArgs};
use toolhost_mcp::tools::rds::{self, RdsCatalog};
use toolhost_mcp::{McpServer, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "rds-server")]
#[command(about = "MCP server exposing Amazon RDS inspection tools", long_about = None)]
struct Args {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(flatten)]
    aws: AwsArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    tracing::info!("RDS MCP server starting...");
    let config = ServerConfig::load(&args.config.config)?
        .with_aws_overrides(args.aws.region, args.aws.profile);

    let sdk_config = load_sdk_config(&config.aws).await;

    let mut registry = ToolRegistry::new();
    rds::register(&mut registry, Arc::new(RdsCatalog::new(sdk_config)))?;
    tracing::info!("Registered {} tools", registry.len());

    let server = McpServer::new(config.server_info("RDS Server"), Arc::new(registry));
    server.start().await?;

    Ok(())
}
