//! Statement and result types for the query layer.
//!
//! Defines what is sent to the warehouse and how rows come back.

use chrono::NaiveDate;
use std::fmt;
use std::time::Duration;

/// The fixed queries the dashboard knows how to issue.
///
/// Lets non-SQL backends (the in-memory mock) answer a statement without
/// parsing its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Users and purchases grouped by city.
    CityBreakdown,
    /// Users and purchases over the whole range.
    Totals,
    /// One user's purchases grouped by day and payload.
    UserPurchases,
    /// Connectivity check.
    Ping,
}

/// A parameterized read-only statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// Which fixed query this is.
    pub kind: StatementKind,
    /// SQL text with `$n` placeholders.
    pub sql: String,
    /// Values bound to the placeholders, in order.
    pub params: Vec<Value>,
}

impl Statement {
    /// Creates a statement with no parameters.
    pub fn new(kind: StatementKind, sql: impl Into<String>) -> Self {
        Self {
            kind,
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Appends a bound parameter.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }

    /// Returns the parameter at `index`, if bound.
    pub fn param(&self, index: usize) -> Option<&Value> {
        self.params.get(index)
    }

    /// The connectivity check statement.
    pub fn ping() -> Self {
        Self::new(StatementKind::Ping, "SELECT 1 AS ok")
    }
}

/// Rows returned for one statement.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<Row>,
    pub execution_time: Duration,
    /// Rows kept after the row cap.
    pub row_count: usize,
    /// Rows the warehouse returned before the cap, if known.
    pub total_rows: Option<usize>,
    pub was_truncated: bool,
}

impl QueryResult {
    /// Creates a query result with the given columns and rows.
    pub fn with_data(columns: Vec<ColumnInfo>, rows: Vec<Row>) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            execution_time: Duration::ZERO,
            row_count,
            total_rows: Some(row_count),
            was_truncated: false,
        }
    }

    /// Sets the execution time.
    pub fn with_execution_time(mut self, duration: Duration) -> Self {
        self.execution_time = duration;
        self
    }

    /// Returns true if the result set is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the position of a column, matched case-insensitively.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|col| col.name.eq_ignore_ascii_case(name))
    }

    /// Returns the value at `row` in the named column.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)
    }

    /// Returns a truncation warning message if the result was truncated.
    pub fn truncation_warning(&self) -> Option<String> {
        if self.was_truncated {
            let total = self.total_rows.unwrap_or(self.row_count);
            Some(format!(
                "⚠ Result truncated: showing {} of {} rows",
                self.row_count, total
            ))
        } else {
            None
        }
    }
}

/// A result column and its warehouse type name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// A row of data from a query result.
pub type Row = Vec<Value>;

/// A bound parameter or a decoded cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    /// Any integer column, widened to i64.
    Int(i64),
    Float(f64),
    String(String),
    Date(NaiveDate),
    /// json/jsonb columns.
    Json(serde_json::Value),
    Bytes(Vec<u8>),
}

impl Value {
    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the value as an integer, accepting integral floats.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Returns the value as a float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Returns the value as a string slice, for text values only.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as a date, parsing ISO text if needed.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            Value::String(s) => NaiveDate::parse_from_str(s.get(..10)?, "%Y-%m-%d").ok(),
            _ => None,
        }
    }

    /// Plain text for table cells and labels.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::Json(j) => j.to_string(),
            Value::Bytes(b) => format!("<{} bytes>", b.len()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}
