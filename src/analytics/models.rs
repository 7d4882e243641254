//! Typed views of the dashboard's query results.

use crate::db::{QueryResult, Value};
use crate::error::{DashError, Result};
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use super::details::DetailTable;
use super::stats::CorrelationMatrix;

/// Maximum accepted User ID length.
pub const MAX_USER_ID_LEN: usize = 64;

/// Label used for rows whose city is NULL.
pub const UNKNOWN_CITY: &str = "(unknown)";

/// An inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
    #[serde(skip)]
    end_exclusive: NaiveDate,
}

impl DateRange {
    /// Creates a range covering `start` through `end`, both inclusive.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(DashError::invalid_input(format!(
                "Start date {start} is after end date {end}"
            )));
        }
        let end_exclusive = end
            .succ_opt()
            .ok_or_else(|| DashError::invalid_input(format!("End date {end} is out of range")))?;
        Ok(Self {
            start,
            end,
            end_exclusive,
        })
    }

    /// The `days` days before `today` through `today`.
    ///
    /// A span reaching past the calendar starts at the earliest date.
    pub fn last_days(today: NaiveDate, days: i64) -> Self {
        let start = Duration::try_days(days.max(0))
            .and_then(|span| today.checked_sub_signed(span))
            .unwrap_or(NaiveDate::MIN);
        Self::new(start, today).unwrap_or(Self {
            start: today,
            end: today,
            end_exclusive: today,
        })
    }

    /// Parses two `YYYY-MM-DD` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_date("Start date", start)?, parse_date("End date", end)?)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// The first day after the range, used as the exclusive upper bound.
    pub fn end_exclusive(&self) -> NaiveDate {
        self.end_exclusive
    }

    /// Number of calendar days covered.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} – {}", self.start, self.end)
    }
}

/// Parses a `YYYY-MM-DD` date, naming the field in the error.
pub fn parse_date(field: &str, input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| {
        DashError::invalid_input(format!(
            "{field} '{}' is not a valid date (expected YYYY-MM-DD)",
            input.trim()
        ))
    })
}

/// A validated player identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct UserId(String);

impl UserId {
    /// Validates trimmed input: letters, digits, `-` and `_`, at most 64 chars.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(DashError::invalid_input("User ID must not be empty"));
        }
        if trimmed.len() > MAX_USER_ID_LEN {
            return Err(DashError::invalid_input(format!(
                "User ID must be at most {MAX_USER_ID_LEN} characters"
            )));
        }
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(DashError::invalid_input(
                "User ID may only contain letters, digits, '-' and '_'",
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for UserId {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Looks up a column that the statement is known to return.
fn required<'a>(result: &'a QueryResult, row: usize, column: &str) -> Result<&'a Value> {
    result
        .value(row, column)
        .ok_or_else(|| DashError::query(format!("Result is missing column '{column}'")))
}

fn count(result: &QueryResult, row: usize, column: &str) -> Result<u64> {
    let value = required(result, row, column)?;
    if value.is_null() {
        return Ok(0);
    }
    value
        .as_i64()
        .map(|n| n.max(0) as u64)
        .ok_or_else(|| DashError::query(format!("Column '{column}' is not a count: {value}")))
}

/// Users and purchases for one city.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityStat {
    pub city: String,
    pub number_of_users: u64,
    pub number_of_purchases: u64,
}

impl CityStat {
    /// Decodes the rows of a city breakdown statement.
    pub fn from_result(result: &QueryResult) -> Result<Vec<Self>> {
        (0..result.rows.len())
            .map(|row| {
                let city = match required(result, row, "city")? {
                    Value::Null => UNKNOWN_CITY.to_string(),
                    other => other.to_display_string(),
                };
                Ok(Self {
                    city,
                    number_of_users: count(result, row, "number_of_users")?,
                    number_of_purchases: count(result, row, "number_of_purchases")?,
                })
            })
            .collect()
    }
}

/// Unfiltered users and purchases for a date range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub number_of_users: u64,
    pub number_of_purchases: u64,
}

impl Totals {
    /// Decodes the single row of a totals statement; no row means zero.
    pub fn from_result(result: &QueryResult) -> Result<Self> {
        if result.is_empty() {
            return Ok(Self::default());
        }
        Ok(Self {
            number_of_users: count(result, 0, "number_of_users")?,
            number_of_purchases: count(result, 0, "number_of_purchases")?,
        })
    }
}

/// One (day, user name, payload) group of a user's purchases.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseRow {
    pub purchase_date: NaiveDate,
    pub user_name: Option<String>,
    pub purchase_data: serde_json::Value,
    pub daily_purchase_amount: Option<f64>,
}

impl PurchaseRow {
    /// Decodes the rows of a user purchases statement.
    pub fn from_result(result: &QueryResult) -> Result<Vec<Self>> {
        (0..result.rows.len())
            .map(|row| {
                let date_value = required(result, row, "purchase_date")?;
                let purchase_date = date_value.as_date().ok_or_else(|| {
                    DashError::query(format!("Column 'purchase_date' is not a date: {date_value}"))
                })?;
                let user_name = match required(result, row, "user_name")? {
                    Value::Null => None,
                    other => Some(other.to_display_string()),
                };
                let purchase_data = decode_payload(required(result, row, "purchase_data")?);
                let daily_purchase_amount =
                    required(result, row, "daily_purchase_amount")?.as_f64();

                Ok(Self {
                    purchase_date,
                    user_name,
                    purchase_data,
                    daily_purchase_amount,
                })
            })
            .collect()
    }
}

/// Payloads may arrive as JSON or as JSON-encoded text.
fn decode_payload(value: &Value) -> serde_json::Value {
    match value {
        Value::Json(json) => json.clone(),
        Value::String(text) => serde_json::from_str(text)
            .unwrap_or_else(|_| serde_json::Value::String(text.clone())),
        Value::Null => serde_json::Value::Null,
        other => serde_json::Value::String(other.to_display_string()),
    }
}

/// Everything shown on the General Statistics tab.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneralStats {
    pub range: DateRange,
    /// Top cities by number of users, largest first.
    pub cities: Vec<CityStat>,
    pub totals: Totals,
    /// Correlation between users and purchases across `cities`.
    pub correlation: Option<f64>,
    pub matrix: CorrelationMatrix,
}

impl GeneralStats {
    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }
}

/// Purchase amount summed for one day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub amount: f64,
}

/// Everything shown on the Events tab for one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserPurchases {
    pub user_id: UserId,
    pub rows: Vec<PurchaseRow>,
    pub details: DetailTable,
}

impl UserPurchases {
    pub fn new(user_id: UserId, rows: Vec<PurchaseRow>) -> Self {
        let details = DetailTable::from_purchases(&rows);
        Self {
            user_id,
            rows,
            details,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The user name from the first row, falling back to the User ID.
    pub fn user_name(&self) -> &str {
        self.rows
            .iter()
            .find_map(|row| row.user_name.as_deref())
            .unwrap_or(self.user_id.as_str())
    }

    /// Purchase amounts summed per day, in date order.
    pub fn daily_totals(&self) -> Vec<DailyTotal> {
        let mut totals: Vec<DailyTotal> = Vec::new();
        for row in &self.rows {
            let amount = row.daily_purchase_amount.unwrap_or(0.0);
            match totals.iter_mut().find(|t| t.date == row.purchase_date) {
                Some(total) => total.amount += amount,
                None => totals.push(DailyTotal {
                    date: row.purchase_date,
                    amount,
                }),
            }
        }
        totals.sort_by_key(|t| t.date);
        totals
    }

    /// Sum of every purchase amount.
    pub fn total_amount(&self) -> f64 {
        self.rows
            .iter()
            .filter_map(|row| row.daily_purchase_amount)
            .sum()
    }
}
