//! Dashboard service.
//!
//! Turns the fixed warehouse statements into the typed data each tab renders.

mod details;
mod models;
mod queries;
mod stats;

pub use details::{format_currency, title_case, ColumnKind, DetailColumn, DetailTable};
pub use models::{
    parse_date, CityStat, DailyTotal, DateRange, GeneralStats, PurchaseRow, Totals, UserId,
    UserPurchases, MAX_USER_ID_LEN, UNKNOWN_CITY,
};
pub use queries::QueryBuilder;
pub use stats::{format_coefficient, pearson, top_cities, CorrelationMatrix, MATRIX_LABELS};

use crate::config::{ConnectionConfig, DashboardConfig};
use crate::db::{self, DatabaseClient, QueryLimits, Statement};
use crate::error::Result;
use chrono::NaiveDate;
use tracing::{debug, info};

/// Runs dashboard queries against a warehouse client.
pub struct Dashboard {
    db: Box<dyn DatabaseClient>,
    queries: QueryBuilder,
    settings: DashboardConfig,
}

impl Dashboard {
    /// Creates a dashboard over an existing client.
    pub fn new(db: Box<dyn DatabaseClient>, settings: DashboardConfig) -> Result<Self> {
        settings.validate()?;
        let queries = QueryBuilder::new(&settings.events_table)?;
        Ok(Self {
            db,
            queries,
            settings,
        })
    }

    /// Connects to the warehouse and verifies it answers.
    pub async fn connect(connection: &ConnectionConfig, settings: DashboardConfig) -> Result<Self> {
        let client = db::connect(connection, QueryLimits::from(&settings)).await?;
        let dashboard = Self::new(client, settings)?;
        dashboard.ping().await?;
        info!("Connected to {}", connection.display_string());
        Ok(dashboard)
    }

    pub fn settings(&self) -> &DashboardConfig {
        &self.settings
    }

    /// The configured lookback window ending on `today`.
    pub fn default_range(&self, today: NaiveDate) -> DateRange {
        DateRange::last_days(today, self.settings.lookback_days)
    }

    pub async fn ping(&self) -> Result<()> {
        self.db.execute(&Statement::ping()).await?;
        Ok(())
    }

    /// Users and purchases per city; `None` returns every city.
    pub async fn city_breakdown(
        &self,
        range: &DateRange,
        limit: Option<u32>,
    ) -> Result<Vec<CityStat>> {
        let result = self
            .db
            .execute(&self.queries.city_breakdown(range, limit))
            .await?;
        debug!(
            "City breakdown for {range}: {} rows in {:?}",
            result.row_count, result.execution_time
        );
        CityStat::from_result(&result)
    }

    pub async fn totals(&self, range: &DateRange) -> Result<Totals> {
        let result = self.db.execute(&self.queries.totals(range)).await?;
        Totals::from_result(&result)
    }

    /// Everything the General Statistics tab shows for `range`.
    pub async fn general_statistics(&self, range: &DateRange) -> Result<GeneralStats> {
        info!("Loading general statistics for {range}");
        let (cities, totals) = tokio::try_join!(
            self.city_breakdown(range, Some(self.settings.top_cities)),
            self.totals(range)
        )?;

        let cities = top_cities(&cities, self.settings.top_cities as usize);
        let matrix = CorrelationMatrix::for_cities(&cities);
        Ok(GeneralStats {
            range: *range,
            correlation: matrix.coefficient(),
            matrix,
            totals,
            cities,
        })
    }

    /// Every purchase recorded for `user_id`; unknown users yield no rows.
    pub async fn user_purchases(&self, user_id: &UserId) -> Result<UserPurchases> {
        info!("Looking up purchases for user {user_id}");
        let result = self
            .db
            .execute(&self.queries.user_purchases(user_id))
            .await?;
        if let Some(warning) = result.truncation_warning() {
            debug!("{warning}");
        }
        let rows = PurchaseRow::from_result(&result)?;
        Ok(UserPurchases::new(user_id.clone(), rows))
    }

    pub async fn close(&self) -> Result<()> {
        self.db.close().await
    }
}
