//! The fixed, read-only statements the dashboard sends to the warehouse.
//!
//! Every user-supplied value is a bound parameter. The only interpolated text
//! is the events table name, which is validated as an identifier up front.

use super::models::{DateRange, UserId};
use crate::config::is_table_identifier;
use crate::db::{Statement, StatementKind};
use crate::error::{DashError, Result};

/// Builds statements against one events table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryBuilder {
    table: String,
}

impl QueryBuilder {
    pub fn new(table: &str) -> Result<Self> {
        if !is_table_identifier(table) {
            return Err(DashError::config(format!(
                "Invalid events table name: '{table}'"
            )));
        }
        Ok(Self {
            table: table.to_string(),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Users and purchases per city, largest cities first.
    ///
    /// `limit` of `None` returns every city.
    pub fn city_breakdown(&self, range: &DateRange, limit: Option<u32>) -> Statement {
        let sql = format!(
            "SELECT \
                geo_city AS city, \
                COUNT(DISTINCT user_base_stats -> 0 ->> 'uuid')::int8 AS number_of_users, \
                COUNT(*) FILTER (WHERE event_name = 'in_app_purchase')::int8 AS number_of_purchases \
             FROM {table} \
             WHERE derived_tstamp >= $1::date \
                AND derived_tstamp < $2::date \
                AND user_base_stats -> 0 IS NOT NULL \
             GROUP BY geo_city \
             ORDER BY number_of_users DESC, city ASC \
             LIMIT $3::int8",
            table = self.table
        );
        Statement::new(StatementKind::CityBreakdown, sql)
            .bind(range.start())
            .bind(range.end_exclusive())
            .bind(limit.map(i64::from))
    }

    /// Users and purchases across all cities.
    pub fn totals(&self, range: &DateRange) -> Statement {
        let sql = format!(
            "SELECT \
                COUNT(DISTINCT user_base_stats -> 0 ->> 'uuid')::int8 AS number_of_users, \
                COUNT(*) FILTER (WHERE event_name = 'in_app_purchase')::int8 AS number_of_purchases \
             FROM {table} \
             WHERE derived_tstamp >= $1::date \
                AND derived_tstamp < $2::date \
                AND user_base_stats -> 0 IS NOT NULL",
            table = self.table
        );
        Statement::new(StatementKind::Totals, sql)
            .bind(range.start())
            .bind(range.end_exclusive())
    }

    /// One user's purchases grouped by day, user name and payload.
    ///
    /// A user matches when any of the event's contexts carries their ID.
    pub fn user_purchases(&self, user_id: &UserId) -> Statement {
        let sql = format!(
            "SELECT \
                e.derived_tstamp::date AS purchase_date, \
                ctx ->> 'user_name' AS user_name, \
                e.in_app_purchase AS purchase_data, \
                SUM((e.in_app_purchase ->> 'iap_price')::float8) AS daily_purchase_amount \
             FROM {table} AS e \
             CROSS JOIN LATERAL jsonb_array_elements(e.user_base_stats) AS ctx \
             WHERE ctx ->> 'uuid' = $1 \
                AND e.event_name = 'in_app_purchase' \
                AND e.in_app_purchase IS NOT NULL \
             GROUP BY e.derived_tstamp::date, ctx ->> 'user_name', e.in_app_purchase \
             ORDER BY purchase_date",
            table = self.table
        );
        Statement::new(StatementKind::UserPurchases, sql).bind(user_id.as_str())
    }
}
