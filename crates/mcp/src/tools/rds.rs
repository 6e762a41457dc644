// RDS tools: database instance and engine version listing

use crate::tools::collaborator_failure;
use anyhow::{anyhow, Result};
use aws_config::SdkConfig;
use aws_sdk_rds::config::Region;
use aws_sdk_rds::error::DisplayErrorContext;
use aws_sdk_rds::types::DbInstance;
use aws_sdk_rds::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use toolhost_core::{
    Arguments, ParamType, ParameterSpec, RegistryError, ReturnType, ToolDescriptor, ToolError,
    ToolHandler, ToolRegistry,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceSummary {
    pub identifier: String,
    pub engine: String,
    pub status: String,
    pub endpoint: Option<String>,
    pub port: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceDetail {
    pub identifier: String,
    pub engine: String,
    pub engine_version: String,
    pub status: String,
    pub instance_class: String,
    pub allocated_storage: Option<i32>,
    pub endpoint: Option<String>,
    pub port: Option<i32>,
    pub multi_az: Option<bool>,
    pub publicly_accessible: Option<bool>,
    pub storage_type: Option<String>,
    pub vpc_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineVersion {
    pub engine: String,
    pub version: String,
    pub description: Option<String>,
    pub default_parameter_family: Option<String>,
}

/// Database management collaborator
#[async_trait::async_trait]
pub trait InstanceCatalog: Send + Sync {
    async fn list_instances(&self, region: Option<&str>) -> Result<Vec<InstanceSummary>>;

    /// `Ok(None)` when no instance has this identifier
    async fn describe_instance(
        &self,
        instance_id: &str,
        region: Option<&str>,
    ) -> Result<Option<InstanceDetail>>;

    async fn list_engine_versions(
        &self,
        engine: &str,
        region: Option<&str>,
    ) -> Result<Vec<EngineVersion>>;
}

/// [`InstanceCatalog`] backed by the AWS SDK
pub struct RdsCatalog {
    sdk_config: SdkConfig,
}

impl RdsCatalog {
    pub fn new(sdk_config: SdkConfig) -> Self {
        tracing::info!("RDS catalog initialized");
        Self { sdk_config }
    }

    fn client(&self, region: Option<&str>) -> Client {
        match region {
            Some(region) => {
                tracing::debug!("Creating RDS client for region: {}", region);
                let config = aws_sdk_rds::config::Builder::from(&self.sdk_config)
                    .region(Region::new(region.to_string()))
                    .build();
                Client::from_conf(config)
            }
            None => Client::new(&self.sdk_config),
        }
    }
}

fn text(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

fn summarize(instance: &DbInstance) -> InstanceSummary {
    InstanceSummary {
        identifier: text(instance.db_instance_identifier()),
        engine: text(instance.engine()),
        status: text(instance.db_instance_status()),
        endpoint: instance
            .endpoint()
            .and_then(|e| e.address())
            .map(str::to_string),
        port: instance.endpoint().and_then(|e| e.port()),
    }
}

fn detail(instance: &DbInstance) -> InstanceDetail {
    let summary = summarize(instance);
    InstanceDetail {
        identifier: summary.identifier,
        engine: summary.engine,
        engine_version: text(instance.engine_version()),
        status: summary.status,
        instance_class: text(instance.db_instance_class()),
        allocated_storage: instance.allocated_storage(),
        endpoint: summary.endpoint,
        port: summary.port,
        multi_az: instance.multi_az(),
        publicly_accessible: instance.publicly_accessible(),
        storage_type: instance.storage_type().map(str::to_string),
        vpc_id: instance
            .db_subnet_group()
            .and_then(|g| g.vpc_id())
            .map(str::to_string),
    }
}

#[async_trait::async_trait]
impl InstanceCatalog for RdsCatalog {
    async fn list_instances(&self, region: Option<&str>) -> Result<Vec<InstanceSummary>> {
        let output = self
            .client(region)
            .describe_db_instances()
            .send()
            .await
            .map_err(|e| anyhow!("{}", DisplayErrorContext(&e)))?;

        Ok(output.db_instances().iter().map(summarize).collect())
    }

    async fn describe_instance(
        &self,
        instance_id: &str,
        region: Option<&str>,
    ) -> Result<Option<InstanceDetail>> {
        let response = self
            .client(region)
            .describe_db_instances()
            .db_instance_identifier(instance_id)
            .send()
            .await;

        match response {
            Ok(output) => Ok(output.db_instances().first().map(detail)),
            Err(e)
                if e.as_service_error()
                    .map(|se| se.is_db_instance_not_found_fault())
                    .unwrap_or(false) =>
            {
                Ok(None)
            }
            Err(e) => Err(anyhow!("{}", DisplayErrorContext(&e))),
        }
    }

    async fn list_engine_versions(
        &self,
        engine: &str,
        region: Option<&str>,
    ) -> Result<Vec<EngineVersion>> {
        let output = self
            .client(region)
            .describe_db_engine_versions()
            .engine(engine)
            .send()
            .await
            .map_err(|e| anyhow!("{}", DisplayErrorContext(&e)))?;

        Ok(output
            .db_engine_versions()
            .iter()
            .map(|v| EngineVersion {
                engine: text(v.engine()),
                version: text(v.engine_version()),
                description: v.db_engine_version_description().map(str::to_string),
                default_parameter_family: v.db_parameter_group_family().map(str::to_string),
            })
            .collect())
    }
}

fn region_param() -> ParameterSpec {
    ParameterSpec::optional("region", ParamType::String, "AWS region (optional)")
}

/// Register the RDS tool set
pub fn register(
    registry: &mut ToolRegistry,
    catalog: Arc<dyn InstanceCatalog>,
) -> Result<(), RegistryError> {
    registry.register(
        ToolDescriptor::new(
            "list_db_instances",
            "List RDS instances in the specified region",
            ReturnType::Object,
        )
        .param(region_param()),
        Arc::new(ListInstances {
            catalog: catalog.clone(),
        }),
    )?;

    registry.register(
        ToolDescriptor::new(
            "describe_db_instance",
            "Get detailed information about an RDS instance",
            ReturnType::Object,
        )
        .param(ParameterSpec::required(
            "instance_id",
            ParamType::String,
            "RDS instance identifier",
        ))
        .param(region_param()),
        Arc::new(DescribeInstance {
            catalog: catalog.clone(),
        }),
    )?;

    registry.register(
        ToolDescriptor::new(
            "list_db_engine_versions",
            "List available engine versions for a specific database engine",
            ReturnType::Object,
        )
        .param(ParameterSpec::required(
            "engine",
            ParamType::String,
            "Database engine (e.g., mysql, postgres)",
        ))
        .param(region_param()),
        Arc::new(ListEngineVersions { catalog }),
    )?;

    Ok(())
}

struct ListInstances {
    catalog: Arc<dyn InstanceCatalog>,
}

#[async_trait::async_trait]
impl ToolHandler for ListInstances {
    async fn call(&self, args: Arguments) -> Result<Value, ToolError> {
        let instances = self
            .catalog
            .list_instances(args.opt_str("region"))
            .await
            .map_err(collaborator_failure("listing RDS instances"))?;

        tracing::info!("Listed {} RDS instances", instances.len());
        Ok(json!({ "instances": instances }))
    }
}

struct DescribeInstance {
    catalog: Arc<dyn InstanceCatalog>,
}

#[async_trait::async_trait]
impl ToolHandler for DescribeInstance {
    async fn call(&self, args: Arguments) -> Result<Value, ToolError> {
        let instance_id = args.str("instance_id")?;
        let instance = self
            .catalog
            .describe_instance(instance_id, args.opt_str("region"))
            .await
            .map_err(collaborator_failure("describing RDS instance"))?
            .ok_or_else(|| ToolError::handler(format!("Instance {} not found", instance_id)))?;

        tracing::info!("Retrieved details for RDS instance {}", instance_id);
        Ok(json!({ "instance": instance }))
    }
}

struct ListEngineVersions {
    catalog: Arc<dyn InstanceCatalog>,
}

#[async_trait::async_trait]
impl ToolHandler for ListEngineVersions {
    async fn call(&self, args: Arguments) -> Result<Value, ToolError> {
        let engine = args.str("engine")?;
        let versions = self
            .catalog
            .list_engine_versions(engine, args.opt_str("region"))
            .await
            .map_err(collaborator_failure("listing engine versions"))?;

        tracing::info!("Listed {} engine versions for {}", versions.len(), engine);
        Ok(json!({ "versions": versions }))
    }
}
