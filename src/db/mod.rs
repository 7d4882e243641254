//! Warehouse access layer.
//!
//! Provides a trait-based interface for running the dashboard's read-only
//! statements, so the live warehouse and the in-memory fixture can be used
//! interchangeably.

mod mock;
mod postgres;
mod types;

pub use mock::{EventRecord, FailingDatabaseClient, MockDatabaseClient, UserContext};
pub use postgres::PostgresClient;
pub use types::{ColumnInfo, QueryResult, Row, Statement, StatementKind, Value};

use crate::config::{ConnectionConfig, DashboardConfig};
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Execution limits for warehouse statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLimits {
    /// Maximum time a single statement may run.
    pub timeout: Duration,
    /// Rows kept from a purchase lookup; the rest are dropped with a warning.
    pub max_rows: usize,
}

impl QueryLimits {
    /// Rows kept for a statement of the given kind.
    ///
    /// Aggregates are never cut, so per-city sums always match the totals.
    pub fn row_cap(&self, kind: StatementKind) -> usize {
        match kind {
            StatementKind::UserPurchases => self.max_rows,
            StatementKind::CityBreakdown | StatementKind::Totals | StatementKind::Ping => {
                usize::MAX
            }
        }
    }
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self::from(&DashboardConfig::default())
    }
}

impl From<&DashboardConfig> for QueryLimits {
    fn from(config: &DashboardConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.query_timeout_secs),
            max_rows: config.max_rows,
        }
    }
}

/// Opens a warehouse client for the given connection.
pub async fn connect(
    config: &ConnectionConfig,
    limits: QueryLimits,
) -> Result<Box<dyn DatabaseClient>> {
    let client = PostgresClient::connect(config, limits).await?;
    Ok(Box::new(client))
}

/// Interface for warehouse clients.
///
/// Implementations only ever run the read-only statements built by the
/// analytics layer.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Executes a statement and returns the rows.
    async fn execute(&self, statement: &Statement) -> Result<QueryResult>;

    /// Closes the connection.
    async fn close(&self) -> Result<()>;
}
