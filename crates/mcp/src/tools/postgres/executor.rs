// tokio-postgres backed query executor

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use geo_types::Point;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{json, Map, Value};
use tokio::sync::{Mutex, MutexGuard};
use tokio_postgres::types::Type;
use tokio_postgres::{Client, Config, NoTls, Row};

use super::connection::ConnectionString;
use super::{count_statement, ColumnInfo, QueryExecutor, TableSchema};

const LIST_TABLES: &str = "
    SELECT table_name::text
    FROM information_schema.tables
    WHERE table_schema = 'public'
    ORDER BY table_name";

const TABLE_COLUMNS: &str = "
    SELECT
        column_name::text,
        data_type::text,
        is_nullable::text,
        column_default::text
    FROM information_schema.columns
    WHERE table_schema = 'public' AND table_name = $1::text
    ORDER BY ordinal_position";

const PRIMARY_KEYS: &str = "
    SELECT kcu.column_name::text
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
        ON tc.constraint_name = kcu.constraint_name
        AND tc.table_schema = kcu.table_schema
    WHERE tc.constraint_type = 'PRIMARY KEY'
        AND tc.table_schema = 'public'
        AND tc.table_name = $1::text
    ORDER BY kcu.ordinal_position";

/// Query executor over a single lazily opened connection.
///
/// The connection is opened on first use and reopened if the server closed
/// it. Calls are serialized on the connection lock.
pub struct PgExecutor {
    config: Config,
    client: Mutex<Option<Client>>,
}

impl PgExecutor {
    pub fn new(connection: &ConnectionString) -> Result<Self> {
        let config: Config = connection
            .as_str()
            .parse()
            .context("Invalid PostgreSQL connection string")?;

        tracing::info!("PostgreSQL executor initialized for {}", connection.redacted());
        Ok(Self {
            config,
            client: Mutex::new(None),
        })
    }

    async fn connect(&self) -> Result<MutexGuard<'_, Option<Client>>> {
        let mut guard = self.client.lock().await;

        if guard.as_ref().map_or(true, Client::is_closed) {
            tracing::info!("Connecting to PostgreSQL database");
            let (client, connection) = self
                .config
                .connect(NoTls)
                .await
                .context("Failed to connect to PostgreSQL")?;

            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::error!("PostgreSQL connection error: {}", e);
                }
            });

            *guard = Some(client);
        }

        Ok(guard)
    }

    /// Run a statement inside a READ ONLY transaction
    async fn query_read_only(&self, sql: &str) -> Result<Vec<Row>> {
        let mut guard = self.connect().await?;
        let client = guard.as_mut().context("PostgreSQL connection unavailable")?;

        let transaction = client
            .build_transaction()
            .read_only(true)
            .start()
            .await
            .context("Failed to open read-only transaction")?;
        let rows = transaction.query(sql, &[]).await?;
        transaction.commit().await?;
        Ok(rows)
    }
}

#[async_trait::async_trait]
impl QueryExecutor for PgExecutor {
    async fn fetch_rows(&self, sql: &str) -> Result<Vec<Map<String, Value>>> {
        let rows = self.query_read_only(sql).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let guard = self.connect().await?;
        let client = guard.as_ref().context("PostgreSQL connection unavailable")?;

        let rows = client.query(LIST_TABLES, &[]).await?;
        rows.iter()
            .map(|row| row.try_get::<_, String>(0).map_err(Into::into))
            .collect()
    }

    async fn describe_table(&self, table: &str) -> Result<Option<TableSchema>> {
        let guard = self.connect().await?;
        let client = guard.as_ref().context("PostgreSQL connection unavailable")?;

        let rows = client.query(TABLE_COLUMNS, &[&table]).await?;
        if rows.is_empty() {
            return Ok(None);
        }

        let columns = rows
            .iter()
            .map(|row| -> Result<ColumnInfo> {
                Ok(ColumnInfo {
                    name: row.try_get(0)?,
                    data_type: row.try_get(1)?,
                    nullable: row.try_get::<_, String>(2)? == "YES",
                    default: row.try_get(3)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let primary_keys = client
            .query(PRIMARY_KEYS, &[&table])
            .await?
            .iter()
            .map(|row| row.try_get::<_, String>(0))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(TableSchema {
            table: table.to_string(),
            columns,
            primary_keys,
        }))
    }

    async fn count_rows(&self, table: &str, condition: Option<&str>) -> Result<i64> {
        let rows = self.query_read_only(&count_statement(table, condition)).await?;
        let row = rows.first().context("COUNT(*) returned no rows")?;
        Ok(row.try_get(0)?)
    }
}

/// Convert a row into a JSON object keyed by column name
fn row_to_json(row: &Row) -> Map<String, Value> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| (column.name().to_string(), column_value(row, idx, column.type_())))
        .collect()
}

/// How a PostgreSQL column type is decoded into JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Bool,
    Int2,
    Int4,
    Int8,
    Oid,
    Float4,
    Float8,
    Numeric,
    Text,
    Json,
    Uuid,
    Timestamp,
    TimestampTz,
    Date,
    Time,
    Point,
    Unsupported,
}

impl ColumnKind {
    fn of(type_name: &str) -> Self {
        match type_name {
            "bool" => Self::Bool,
            "int2" => Self::Int2,
            "int4" => Self::Int4,
            "int8" => Self::Int8,
            "oid" => Self::Oid,
            "float4" => Self::Float4,
            "float8" => Self::Float8,
            "numeric" => Self::Numeric,
            "text" | "varchar" | "bpchar" | "name" | "char" | "unknown" => Self::Text,
            "json" | "jsonb" => Self::Json,
            "uuid" => Self::Uuid,
            "timestamp" => Self::Timestamp,
            "timestamptz" => Self::TimestampTz,
            "date" => Self::Date,
            "time" => Self::Time,
            "point" => Self::Point,
            _ => Self::Unsupported,
        }
    }
}

/// Numeric values become JSON numbers; precision beyond f64 is lost
fn decimal_to_json(value: Decimal) -> Value {
    value.to_f64().map_or(Value::Null, Value::from)
}

fn point_to_json(point: Point<f64>) -> Value {
    json!({ "x": point.x(), "y": point.y() })
}

fn column_value(row: &Row, idx: usize, ty: &Type) -> Value {
    fn get<'a, T>(row: &'a Row, idx: usize) -> Result<Value, tokio_postgres::Error>
    where
        T: tokio_postgres::types::FromSql<'a> + Into<Value>,
    {
        get_with::<T>(row, idx, Into::into)
    }

    fn get_display<'a, T>(row: &'a Row, idx: usize) -> Result<Value, tokio_postgres::Error>
    where
        T: tokio_postgres::types::FromSql<'a> + ToString,
    {
        get_with(row, idx, |v: T| Value::String(v.to_string()))
    }

    fn get_with<'a, T>(
        row: &'a Row,
        idx: usize,
        convert: impl FnOnce(T) -> Value,
    ) -> Result<Value, tokio_postgres::Error>
    where
        T: tokio_postgres::types::FromSql<'a>,
    {
        row.try_get::<_, Option<T>>(idx)
            .map(|v| v.map_or(Value::Null, convert))
    }

    let value = match ColumnKind::of(ty.name()) {
        ColumnKind::Bool => get::<bool>(row, idx),
        ColumnKind::Int2 => get::<i16>(row, idx),
        ColumnKind::Int4 => get::<i32>(row, idx),
        ColumnKind::Int8 => get::<i64>(row, idx),
        ColumnKind::Oid => get::<u32>(row, idx),
        ColumnKind::Float4 => get::<f32>(row, idx),
        ColumnKind::Float8 => get::<f64>(row, idx),
        ColumnKind::Numeric => get_with(row, idx, decimal_to_json),
        ColumnKind::Text => get::<String>(row, idx),
        ColumnKind::Json => get::<Value>(row, idx),
        ColumnKind::Uuid => get_display::<uuid::Uuid>(row, idx),
        ColumnKind::Timestamp => get_display::<chrono::NaiveDateTime>(row, idx),
        ColumnKind::TimestampTz => get_with(row, idx, |t: DateTime<Utc>| {
            Value::String(t.to_rfc3339())
        }),
        ColumnKind::Date => get_display::<chrono::NaiveDate>(row, idx),
        ColumnKind::Time => get_display::<chrono::NaiveTime>(row, idx),
        ColumnKind::Point => get_with(row, idx, point_to_json),
        ColumnKind::Unsupported => {
            return Value::String(format!("<unsupported type: {}>", ty.name()))
        }
    };

    value.unwrap_or_else(|e| Value::String(format!("<unreadable {}: {}>", ty.name(), e)))
}
