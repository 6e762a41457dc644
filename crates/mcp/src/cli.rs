// Command-line plumbing shared by the server binaries

use clap::Args;
use std::path::PathBuf;

/// Arguments every server accepts
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Path to configuration file
    #[arg(short, long, env = "TOOLHOST_CONFIG", default_value = "toolhost.toml")]
    pub config: PathBuf,
}

/// Extra arguments for the AWS-backed servers
#[derive(Args, Debug)]
pub struct AwsArgs {
    /// AWS region used when a tool call does not name one
    #[arg(long)]
    pub region: Option<String>,

    /// Named AWS profile
    #[arg(long)]
    pub profile: Option<String>,
}

/// Install the global tracing subscriber.
///
/// Logs go to stderr: stdout carries protocol frames.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
