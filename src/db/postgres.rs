//! PostgreSQL-protocol warehouse client.
//!
//! Provides the `PostgresClient` struct that implements the `DatabaseClient`
//! trait using a sqlx connection pool.

use crate::config::ConnectionConfig;
use crate::db::{ColumnInfo, DatabaseClient, QueryLimits, QueryResult, Row, Statement, Value};
use crate::error::{DashError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::types::Json;
use sqlx::{Column as SqlxColumn, Executor, Postgres, Row as SqlxRow, TypeInfo};
use sqlx::Statement as SqlxStatement;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Maximum number of connection retry attempts.
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay between retry attempts (doubles each retry).
const RETRY_BASE_DELAY_MS: u64 = 500;

/// Warehouse client over the Postgres wire protocol.
#[derive(Debug)]
pub struct PostgresClient {
    pool: PgPool,
    limits: QueryLimits,
}

impl PostgresClient {
    /// Creates a client from an existing connection pool.
    pub fn from_pool(pool: PgPool, limits: QueryLimits) -> Self {
        Self { pool, limits }
    }

    /// Connects to the warehouse, retrying transient failures with backoff.
    pub async fn connect(config: &ConnectionConfig, limits: QueryLimits) -> Result<Self> {
        let conn_str = config.to_connection_string()?;

        let mut last_error = None;
        let mut delay = Duration::from_millis(RETRY_BASE_DELAY_MS);

        for attempt in 1..=MAX_RETRY_ATTEMPTS {
            debug!("Connection attempt {} of {}", attempt, MAX_RETRY_ATTEMPTS);

            let result = PgPoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Duration::from_secs(10))
                .connect(&conn_str)
                .await;

            match result {
                Ok(pool) => {
                    debug!("Successfully connected to warehouse");
                    return Ok(Self { pool, limits });
                }
                Err(e) => {
                    let is_transient = is_transient_error(&e);
                    last_error = Some(e);

                    if !is_transient {
                        break;
                    }
                    if attempt < MAX_RETRY_ATTEMPTS {
                        warn!(
                            "Connection attempt {} failed (transient error), retrying in {:?}",
                            attempt, delay
                        );
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    }
                }
            }
        }

        match last_error {
            Some(e) => Err(map_connection_error(e, config)),
            None => Err(DashError::connection("No connection attempt was made")),
        }
    }

    /// Reads column metadata from the prepared statement, for empty results.
    async fn fetch_column_metadata(&self, sql: &str) -> Vec<ColumnInfo> {
        match (&self.pool).prepare(sql).await {
            Ok(prepared) => prepared
                .columns()
                .iter()
                .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                .collect(),
            Err(e) => {
                debug!("Could not describe statement: {}", e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl DatabaseClient for PostgresClient {
    async fn execute(&self, statement: &Statement) -> Result<QueryResult> {
        let start = Instant::now();
        let timeout = self.limits.timeout;

        debug!(kind = ?statement.kind, params = statement.params.len(), "Executing statement");

        let query = bind_params(sqlx::query(&statement.sql), &statement.params);
        let result = tokio::time::timeout(timeout, query.fetch_all(&self.pool))
            .await
            .map_err(|_| {
                DashError::query(format!(
                    "Query timed out after {} seconds",
                    timeout.as_secs()
                ))
            })?
            .map_err(|e| DashError::query(format_query_error(e)))?;

        let execution_time = start.elapsed();

        let columns: Vec<ColumnInfo> = match result.first() {
            Some(first_row) => first_row
                .columns()
                .iter()
                .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                .collect(),
            None => self.fetch_column_metadata(&statement.sql).await,
        };

        let total_rows = result.len();
        let cap = self.limits.row_cap(statement.kind);
        let was_truncated = total_rows > cap;

        if was_truncated {
            warn!(
                kind = ?statement.kind,
                "Query returned {} rows, truncating to {} rows", total_rows, cap
            );
        }

        let rows: Vec<Row> = result.iter().take(cap).map(convert_row).collect();

        let row_count = rows.len();
        debug!(kind = ?statement.kind, row_count, ?execution_time, "Statement finished");

        Ok(QueryResult {
            columns,
            rows,
            execution_time,
            row_count,
            total_rows: Some(total_rows),
            was_truncated,
        })
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// Binds statement parameters in placeholder order.
fn bind_params<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &'q [Value],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Int(i) => query.bind(*i),
            Value::Float(f) => query.bind(*f),
            Value::String(s) => query.bind(s.as_str()),
            Value::Date(d) => query.bind(*d),
            Value::Json(j) => query.bind(Json(j)),
            Value::Bytes(b) => query.bind(b.as_slice()),
        };
    }
    query
}

/// Converts a sqlx PgRow to our Row type.
fn convert_row(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Decodes one cell, treating NULL and decode failures alike.
fn cell<'r, T>(row: &'r PgRow, index: usize) -> Option<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get::<Option<T>, _>(index).ok().flatten()
}

/// Decodes a cell by its Postgres type name.
///
/// NUMERIC and other types without a decoder come back as text or NULL; the
/// dashboard statements cast their aggregates to int8/float8.
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    let value = match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => cell::<bool>(row, index).map(Value::Bool),
        "INT2" | "SMALLINT" => cell::<i16>(row, index).map(|v| Value::Int(v.into())),
        "INT4" | "INT" | "INTEGER" => cell::<i32>(row, index).map(|v| Value::Int(v.into())),
        "INT8" | "BIGINT" => cell::<i64>(row, index).map(Value::Int),
        "FLOAT4" | "REAL" => cell::<f32>(row, index).map(|v| Value::Float(v.into())),
        "FLOAT8" | "DOUBLE PRECISION" => cell::<f64>(row, index).map(Value::Float),
        "DATE" => cell::<NaiveDate>(row, index).map(Value::Date),
        "TIMESTAMP" => cell::<NaiveDateTime>(row, index).map(|ts| Value::String(format_timestamp(ts))),
        "TIMESTAMPTZ" => {
            cell::<DateTime<Utc>>(row, index).map(|ts| Value::String(format_timestamp(ts.naive_utc())))
        }
        "JSON" | "JSONB" => cell::<Json<serde_json::Value>>(row, index).map(|json| Value::Json(json.0)),
        "BYTEA" => cell::<Vec<u8>>(row, index).map(Value::Bytes),
        _ => cell::<String>(row, index).map(Value::String),
    };
    value.unwrap_or_default()
}

fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Determines if an error is transient and worth retrying.
fn is_transient_error(error: &sqlx::Error) -> bool {
    if matches!(error, sqlx::Error::PoolTimedOut | sqlx::Error::Io(_)) {
        return true;
    }

    let error_str = error.to_string().to_lowercase();

    if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
        || error_str.contains("does not exist")
        || error_str.contains("ssl")
        || error_str.contains("tls")
    {
        return false;
    }

    error_str.contains("connection refused")
        || error_str.contains("timed out")
        || error_str.contains("timeout")
        || error_str.contains("temporarily unavailable")
        || error_str.contains("connection reset")
        || error_str.contains("broken pipe")
}

/// Maps sqlx connection errors to user-facing messages.
fn map_connection_error(error: sqlx::Error, config: &ConnectionConfig) -> DashError {
    let host = config.host.as_deref().unwrap_or("localhost");
    let port = config.port;
    let user = config.user.as_deref().unwrap_or("unknown");
    let database = config.database.as_deref().unwrap_or("unknown");

    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        DashError::connection(format!(
            "Cannot connect to {host}:{port}. Check that the warehouse is reachable."
        ))
    } else if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
    {
        DashError::connection(format!(
            "Authentication failed for user '{user}'. Check your credentials."
        ))
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        DashError::connection(format!("Database '{database}' does not exist."))
    } else if error_str.contains("ssl") || error_str.contains("tls") {
        DashError::connection(
            "Server requires SSL. Add '?sslmode=require' to the connection string.".to_string(),
        )
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        DashError::connection(format!(
            "Connection to {host}:{port} timed out. The warehouse may be overloaded or unreachable."
        ))
    } else {
        DashError::connection(error.to_string())
    }
}

/// Formats a query error with Postgres detail and hint when available.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = String::from("ERROR: ");
    result.push_str(db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            result.push_str("\n  DETAIL: ");
            result.push_str(detail);
        }

        if let Some(hint) = pg_error.hint() {
            result.push_str("\n  HINT: ");
            result.push_str(hint);
        }

        if let Some(table) = pg_error.table() {
            result.push_str("\n  TABLE: ");
            result.push_str(table);
        }

        if let Some(column) = pg_error.column() {
            result.push_str("\n  COLUMN: ");
            result.push_str(column);
        }
    }

    result
}
