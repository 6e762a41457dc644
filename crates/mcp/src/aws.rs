// Shared AWS SDK configuration for the S3 and RDS servers

use aws_config::{BehaviorVersion, Region, SdkConfig};

use crate::config::AwsConfig;

/// Resolve credentials and region once at start-up.
///
/// Anything not set in `settings` comes from the SDK's default provider
/// chain (environment, shared config files, instance metadata).
pub async fn load_sdk_config(settings: &AwsConfig) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());

    if let Some(ref region) = settings.region {
        loader = loader.region(Region::new(region.clone()));
    }
    if let Some(ref profile) = settings.profile {
        loader = loader.profile_name(profile);
    }

    let sdk_config = loader.load().await;
    tracing::info!(
        region = sdk_config.region().map(|r| r.as_ref()).unwrap_or("<unset>"),
        "AWS configuration loaded"
    );
    sdk_config
}
