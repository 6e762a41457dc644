// PostgreSQL tools: read-only queries and schema introspection

pub mod connection;
pub mod executor;
pub mod guard;

pub use connection::{ConnectionString, ConnectionStringError};
pub use executor::PgExecutor;

use crate::tools::collaborator_failure;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use toolhost_core::{
    Arguments, ParamType, ParameterSpec, RegistryError, ReturnType, ToolDescriptor, ToolError,
    ToolHandler, ToolRegistry,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub nullable: bool,
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub table: String,
    pub columns: Vec<ColumnInfo>,
    pub primary_keys: Vec<String>,
}

/// Database collaborator. Implementations only ever receive statements that
/// passed [`guard::ensure_read_only`].
#[async_trait::async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn fetch_rows(&self, sql: &str) -> Result<Vec<Map<String, Value>>>;

    /// Tables in the `public` schema
    async fn list_tables(&self) -> Result<Vec<String>>;

    async fn describe_table(&self, table: &str) -> Result<Option<TableSchema>>;

    async fn count_rows(&self, table: &str, condition: Option<&str>) -> Result<i64>;
}

/// Quote a possibly schema-qualified identifier
pub(crate) fn quote_ident(name: &str) -> String {
    name.split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

pub(crate) fn count_statement(table: &str, condition: Option<&str>) -> String {
    match condition {
        Some(condition) => format!("SELECT COUNT(*) FROM {} WHERE {}", quote_ident(table), condition),
        None => format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
    }
}

fn table_param() -> ParameterSpec {
    ParameterSpec::required("table_name", ParamType::String, "Name of the table")
}

/// Register the PostgreSQL tool set
pub fn register(
    registry: &mut ToolRegistry,
    executor: Arc<dyn QueryExecutor>,
) -> Result<(), RegistryError> {
    registry.register(
        ToolDescriptor::new(
            "execute_query",
            "Execute a read-only SQL query and return the resulting rows",
            ReturnType::Object,
        )
        .param(ParameterSpec::required(
            "query",
            ParamType::String,
            "SQL query to execute (read-only)",
        )),
        Arc::new(ExecuteQuery {
            executor: executor.clone(),
        }),
    )?;

    registry.register(
        ToolDescriptor::new(
            "list_tables",
            "List all tables in the public schema",
            ReturnType::Object,
        ),
        Arc::new(ListTables {
            executor: executor.clone(),
        }),
    )?;

    registry.register(
        ToolDescriptor::new(
            "get_table_schema",
            "Get column and primary key information for a table",
            ReturnType::Object,
        )
        .param(table_param()),
        Arc::new(GetTableSchema {
            executor: executor.clone(),
        }),
    )?;

    registry.register(
        ToolDescriptor::new(
            "count_rows",
            "Count rows in a table, optionally filtered by a WHERE condition",
            ReturnType::Object,
        )
        .param(table_param())
        .param(
            ParameterSpec::optional(
                "condition",
                ParamType::String,
                "WHERE clause without the WHERE keyword (optional)",
            )
            .with_default(""),
        ),
        Arc::new(CountRows { executor }),
    )?;

    Ok(())
}

struct ExecuteQuery {
    executor: Arc<dyn QueryExecutor>,
}

#[async_trait::async_trait]
impl ToolHandler for ExecuteQuery {
    async fn call(&self, args: Arguments) -> Result<Value, ToolError> {
        let query = args.str("query")?;
        guard::ensure_read_only(query)?;

        let rows = self
            .executor
            .fetch_rows(query)
            .await
            .map_err(collaborator_failure("executing query"))?;

        tracing::info!("Query returned {} rows", rows.len());
        Ok(json!({ "rows": rows }))
    }
}

struct ListTables {
    executor: Arc<dyn QueryExecutor>,
}

#[async_trait::async_trait]
impl ToolHandler for ListTables {
    async fn call(&self, _args: Arguments) -> Result<Value, ToolError> {
        let tables = self
            .executor
            .list_tables()
            .await
            .map_err(collaborator_failure("listing tables"))?;

        tracing::info!("Listed {} tables", tables.len());
        Ok(json!({ "tables": tables }))
    }
}

struct GetTableSchema {
    executor: Arc<dyn QueryExecutor>,
}

#[async_trait::async_trait]
impl ToolHandler for GetTableSchema {
    async fn call(&self, args: Arguments) -> Result<Value, ToolError> {
        let table = args.str("table_name")?;
        let schema = self
            .executor
            .describe_table(table)
            .await
            .map_err(collaborator_failure("describing table"))?
            .ok_or_else(|| ToolError::handler(format!("Table '{}' not found", table)))?;

        Ok(serde_json::to_value(schema)?)
    }
}

struct CountRows {
    executor: Arc<dyn QueryExecutor>,
}

#[async_trait::async_trait]
impl ToolHandler for CountRows {
    async fn call(&self, args: Arguments) -> Result<Value, ToolError> {
        let table = args.str("table_name")?;
        let condition = args.opt_str("condition");
        guard::ensure_read_only(&count_statement(table, condition))?;

        let count = self
            .executor
            .count_rows(table, condition)
            .await
            .map_err(collaborator_failure("counting rows"))?;

        Ok(json!({ "count": count }))
    }
}
