use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::protocol::ServerInfo;

/// Optional on-disk configuration shared by all tool servers.
///
/// ```toml
/// [server]
/// name = "S3 Server"
///
/// [aws]
/// region = "eu-west-1"
/// profile = "readonly"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub aws: AwsConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsConfig {
    /// Default region; falls back to the AWS SDK's own resolution chain
    #[serde(default)]
    pub region: Option<String>,

    /// Named profile from the shared AWS config files
    #[serde(default)]
    pub profile: Option<String>,
}

impl ServerConfig {
    pub fn load(config_path: &Path) -> Result<Self> {
        // Load config file if it exists, otherwise use defaults
        if !config_path.exists() {
            tracing::info!("Configuration file {} not found, using defaults", config_path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read configuration file {}", config_path.display()))?;
        toml::from_str(&content).context("Failed to parse configuration file")
    }

    /// Command-line values win over the file
    pub fn with_aws_overrides(mut self, region: Option<String>, profile: Option<String>) -> Self {
        if region.is_some() {
            self.aws.region = region;
        }
        if profile.is_some() {
            self.aws.profile = profile;
        }
        self
    }

    pub fn server_info(&self, default_name: &str) -> ServerInfo {
        ServerInfo {
            name: self
                .server
                .name
                .clone()
                .unwrap_or_else(|| default_name.to_string()),
            version: self
                .server
                .version
                .clone()
                .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = ServerConfig::load(&temp_dir.path().join("absent.toml")).unwrap();

        assert_eq!(config.aws, AwsConfig::default());
        assert_eq!(config.server_info("S3 Server").name, "S3 Server");
    }

    #[test]
    fn test_load_file_and_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("toolhost.toml");
        std::fs::write(
            &path,
            "[server]\nname = \"Storage\"\n\n[aws]\nregion = \"eu-west-1\"\nprofile = \"dev\"\n",
        )
        .unwrap();

        let config = ServerConfig::load(&path)
            .unwrap()
            .with_aws_overrides(Some("us-west-2".to_string()), None);

        assert_eq!(config.server_info("S3 Server").name, "Storage");
        assert_eq!(config.aws.region.as_deref(), Some("us-west-2"));
        assert_eq!(config.aws.profile.as_deref(), Some("dev"));
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("toolhost.toml");
        std::fs::write(&path, "[aws\nregion = ").unwrap();

        assert!(ServerConfig::load(&path).is_err());
    }
}
