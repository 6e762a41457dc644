// S3 MCP server: bucket and object listing over stdio

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use toolhost_core::ToolRegistry;
use toolhost_mcp::aws::load_sdk_config;
use toolhost_mcp::cli::{init_tracing, AwsArgs, ConfigArgs};
use toolhost_mcp::tools::s3::{self, S3Catalog};
use toolhost_mcp::{McpServer, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "s3-server")]
#[command(about = "MCP server exposing Amazon S3 listing tools", long_about = None)]
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

    tracing::info!("S3 MCP server starting...");
    let config = ServerConfig::load(&args.config.config)?
        .with_aws_overrides(args.aws.region, args.aws.profile);

    let sdk_config = load_sdk_config(&config.aws).await;

    let mut registry = ToolRegistry::new();
    s3::register(&mut registry, Arc::new(S3Catalog::new(sdk_config)))?;
    tracing::info!("Registered {} tools", registry.len());

    let server = McpServer::new(config.server_info("S3 Server"), Arc::new(registry));
    server.start().await?;

    Ok(())
}
