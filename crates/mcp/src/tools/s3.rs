// S3 tools: bucket and object listing

use crate::tools::collaborator_failure;
use anyhow::{anyhow, Result};
use aws_config::SdkConfig;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::DateTimeFormat;
use aws_sdk_s3::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use toolhost_core::{
    Arguments, ParamType, ParameterSpec, RegistryError, ReturnType, ToolDescriptor, ToolError,
    ToolHandler, ToolRegistry,
};

/// S3 reports no location constraint for buckets in this region
const DEFAULT_BUCKET_REGION: &str = "us-east-1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSummary {
    pub key: String,
    pub size: i64,
    pub last_modified: Option<String>,
}

/// Storage listing collaborator
#[async_trait::async_trait]
pub trait StorageCatalog: Send + Sync {
    async fn list_buckets(&self, region: Option<&str>) -> Result<Vec<String>>;

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        region: Option<&str>,
    ) -> Result<Vec<ObjectSummary>>;

    async fn bucket_location(&self, bucket: &str) -> Result<String>;
}

/// [`StorageCatalog`] backed by the AWS SDK
pub struct S3Catalog {
    sdk_config: SdkConfig,
}

impl S3Catalog {
    pub fn new(sdk_config: SdkConfig) -> Self {
        tracing::info!("S3 catalog initialized");
        Self { sdk_config }
    }

    fn client(&self, region: Option<&str>) -> Client {
        match region {
            Some(region) => {
                tracing::debug!("Creating S3 client for region: {}", region);
                let config = aws_sdk_s3::config::Builder::from(&self.sdk_config)
                    .region(Region::new(region.to_string()))
                    .build();
                Client::from_conf(config)
            }
            None => Client::new(&self.sdk_config),
        }
    }
}

#[async_trait::async_trait]
impl StorageCatalog for S3Catalog {
    async fn list_buckets(&self, region: Option<&str>) -> Result<Vec<String>> {
        let output = self
            .client(region)
            .list_buckets()
            .send()
            .await
            .map_err(|e| anyhow!("{}", DisplayErrorContext(&e)))?;

        Ok(output
            .buckets()
            .iter()
            .filter_map(|b| b.name().map(str::to_string))
            .collect())
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        region: Option<&str>,
    ) -> Result<Vec<ObjectSummary>> {
        let output = self
            .client(region)
            .list_objects_v2()
            .bucket(bucket)
            .set_prefix(prefix.map(str::to_string))
            .send()
            .await
            .map_err(|e| anyhow!("{}", DisplayErrorContext(&e)))?;

        Ok(output
            .contents()
            .iter()
            .map(|obj| ObjectSummary {
                key: obj.key().unwrap_or_default().to_string(),
                size: obj.size().unwrap_or_default(),
                last_modified: obj
                    .last_modified()
                    .and_then(|t| t.fmt(DateTimeFormat::DateTime).ok()),
            })
            .collect())
    }

    async fn bucket_location(&self, bucket: &str) -> Result<String> {
        let output = self
            .client(None)
            .get_bucket_location()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| anyhow!("{}", DisplayErrorContext(&e)))?;

        Ok(output
            .location_constraint()
            .map(|c| c.as_str())
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_BUCKET_REGION)
            .to_string())
    }
}

fn region_param() -> ParameterSpec {
    ParameterSpec::optional("region", ParamType::String, "AWS region (optional)")
}

fn bucket_param() -> ParameterSpec {
    ParameterSpec::required("bucket", ParamType::String, "S3 bucket name")
}

/// Register the S3 tool set
pub fn register(
    registry: &mut ToolRegistry,
    catalog: Arc<dyn StorageCatalog>,
) -> Result<(), RegistryError> {
    registry.register(
        ToolDescriptor::new(
            "list_buckets",
            "List S3 buckets in the specified region",
            ReturnType::Object,
        )
        .param(region_param()),
        Arc::new(ListBuckets {
            catalog: catalog.clone(),
        }),
    )?;

    registry.register(
        ToolDescriptor::new(
            "list_objects",
            "List objects in an S3 bucket with optional prefix",
            ReturnType::Object,
        )
        .param(bucket_param())
        .param(ParameterSpec::optional(
            "prefix",
            ParamType::String,
            "Object prefix (optional)",
        ))
        .param(region_param()),
        Arc::new(ListObjects {
            catalog: catalog.clone(),
        }),
    )?;

    registry.register(
        ToolDescriptor::new(
            "get_bucket_location",
            "Get the region where an S3 bucket is located",
            ReturnType::Object,
        )
        .param(bucket_param()),
        Arc::new(GetBucketLocation { catalog }),
    )?;

    Ok(())
}

struct ListBuckets {
    catalog: Arc<dyn StorageCatalog>,
}

#[async_trait::async_trait]
impl ToolHandler for ListBuckets {
    async fn call(&self, args: Arguments) -> Result<Value, ToolError> {
        let buckets = self
            .catalog
            .list_buckets(args.opt_str("region"))
            .await
            .map_err(collaborator_failure("listing buckets"))?;

        tracing::info!("Listed {} buckets", buckets.len());
        Ok(json!({ "buckets": buckets }))
    }
}

struct ListObjects {
    catalog: Arc<dyn StorageCatalog>,
}

#[async_trait::async_trait]
impl ToolHandler for ListObjects {
    async fn call(&self, args: Arguments) -> Result<Value, ToolError> {
        let bucket = args.str("bucket")?;
        let objects = self
            .catalog
            .list_objects(bucket, args.opt_str("prefix"), args.opt_str("region"))
            .await
            .map_err(collaborator_failure("listing objects"))?;

        tracing::info!("Listed {} objects in bucket {}", objects.len(), bucket);
        Ok(json!({ "objects": objects }))
    }
}

struct GetBucketLocation {
    catalog: Arc<dyn StorageCatalog>,
}

#[async_trait::async_trait]
impl ToolHandler for GetBucketLocation {
    async fn call(&self, args: Arguments) -> Result<Value, ToolError> {
        let bucket = args.str("bucket")?;
        let region = self
            .catalog
            .bucket_location(bucket)
            .await
            .map_err(collaborator_failure("locating bucket"))?;

        tracing::info!("Bucket {} is located in {}", bucket, region);
        Ok(json!({ "region": region }))
    }
}
