use async_trait::async_trait;
use sqlx::{postgres::PgRow, Column, PgPool, Row, TypeInfo};

use crate::errors::Result;
use crate::session::{QuerySession, Session, WritableSession};

/// Relational session backed by a `sqlx` connection pool. One `PgPool` is
/// shared by every Observation/Exporter that names this session; each call
/// opens (and commits) its own transaction.
pub struct PostgresSession {
    pool: PgPool,
}

impl PostgresSession {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Session for PostgresSession {
    async fn release(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }

    fn as_query_session(&self) -> Option<&dyn QuerySession> {
        Some(self)
    }

    fn as_writable_session(&self) -> Option<&dyn WritableSession> {
        Some(self)
    }
}

#[async_trait]
impl QuerySession for PostgresSession {
    /// Opens a transaction, executes `query`, and commits it read-only.
    async fn query_json(&self, query: &str) -> Result<Vec<serde_json::Value>> {
        let mut tx = self.pool.begin().await?;
        let rows: Vec<PgRow> = sqlx::query(query).fetch_all(&mut *tx).await?;
        tx.commit().await?;
        rows.iter().map(row_to_json).collect()
    }
}

#[async_trait]
impl WritableSession for PostgresSession {
    /// Opens a transaction, inserts one row built from `row`'s object keys as
    /// columns, and commits.
    async fn insert_row(&self, table: &str, row: &serde_json::Value) -> Result<()> {
        let obj = row.as_object().ok_or_else(|| {
            crate::errors::PipelineError::ExportError(
                "exporter row must be a JSON object".to_string(),
            )
        })?;

        let columns: Vec<&String> = obj.keys().collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${i}")).collect();
        let column_list = columns
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {table} ({column_list}) VALUES ({})",
            placeholders.join(", ")
        );

        let mut query = sqlx::query(&sql);
        for column in &columns {
            query = bind_json_value(query, &obj[*column]);
        }

        let mut tx = self.pool.begin().await?;
        query.execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }
}

fn bind_json_value<'q>(
    query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    value: &'q serde_json::Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    match value {
        serde_json::Value::Null => query.bind(Option::<String>::None),
        serde_json::Value::Bool(b) => query.bind(*b),
        serde_json::Value::Number(n) if n.is_i64() => query.bind(n.as_i64()),
        serde_json::Value::Number(n) => query.bind(n.as_f64()),
        serde_json::Value::String(s) => query.bind(s.as_str()),
        other => query.bind(other.to_string()),
    }
}

fn row_to_json(row: &PgRow) -> Result<serde_json::Value> {
    let mut obj = serde_json::Map::new();
    for column in row.columns() {
        let name = column.name();
        let value = match column.type_info().name() {
            "INT4" | "INT8" | "INT2" => row
                .try_get::<Option<i64>, _>(name)
                .map(|v| v.map(serde_json::Value::from).unwrap_or(serde_json::Value::Null))?,
            "FLOAT4" | "FLOAT8" | "NUMERIC" => row
                .try_get::<Option<f64>, _>(name)
                .map(|v| v.map(serde_json::Value::from).unwrap_or(serde_json::Value::Null))?,
            "BOOL" => row
                .try_get::<Option<bool>, _>(name)
                .map(|v| v.map(serde_json::Value::from).unwrap_or(serde_json::Value::Null))?,
            _ => row
                .try_get::<Option<String>, _>(name)
                .map(|v| v.map(serde_json::Value::from).unwrap_or(serde_json::Value::Null))?,
        };
        obj.insert(name.to_string(), value);
    }
    Ok(serde_json::Value::Object(obj))
}
