//! In-memory warehouse for tests and headless runs.
//!
//! Holds a list of game events and answers each `StatementKind` with the same
//! semantics as the SQL the analytics layer sends to the real warehouse.

use super::{ColumnInfo, DatabaseClient, QueryResult, Statement, StatementKind, Value};
use crate::error::{DashError, Result};
use async_trait::async_trait;
use chrono::{Duration as DateDelta, NaiveDate, NaiveDateTime};
use serde_json::json;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

const PURCHASE_EVENT: &str = "in_app_purchase";

/// One user context attached to an event.
#[derive(Debug, Clone, PartialEq)]
pub struct UserContext {
    pub uuid: String,
    pub user_name: Option<String>,
}

/// A single row of the events table.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub city: Option<String>,
    pub event_name: String,
    pub timestamp: NaiveDateTime,
    pub contexts: Vec<UserContext>,
    pub purchase: Option<serde_json::Value>,
}

impl EventRecord {
    /// A non-purchase event (session start, match played, ...).
    pub fn activity(city: &str, at: NaiveDateTime, uuid: &str, user_name: &str) -> Self {
        Self {
            city: Some(city.to_string()),
            event_name: "match_end".to_string(),
            timestamp: at,
            contexts: vec![UserContext {
                uuid: uuid.to_string(),
                user_name: Some(user_name.to_string()),
            }],
            purchase: None,
        }
    }

    /// An `in_app_purchase` event with the given payload.
    pub fn purchase(
        city: &str,
        at: NaiveDateTime,
        uuid: &str,
        user_name: &str,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_name: PURCHASE_EVENT.to_string(),
            purchase: Some(payload),
            ..Self::activity(city, at, uuid, user_name)
        }
    }

    fn is_purchase(&self) -> bool {
        self.event_name == PURCHASE_EVENT
    }

    fn primary_uuid(&self) -> Option<&str> {
        self.contexts.first().map(|ctx| ctx.uuid.as_str())
    }
}

/// A mock warehouse client backed by a list of events.
pub struct MockDatabaseClient {
    events: Vec<EventRecord>,
}

impl MockDatabaseClient {
    /// Creates a mock warehouse with no events.
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Creates a mock warehouse holding the given events.
    pub fn with_events(events: Vec<EventRecord>) -> Self {
        Self { events }
    }

    /// Creates a mock warehouse seeded with a week of sample activity ending
    /// on `today`.
    pub fn sample(today: NaiveDate) -> Self {
        Self::with_events(sample_events(today))
    }

    fn date_param(statement: &Statement, index: usize) -> Result<NaiveDate> {
        statement
            .param(index)
            .and_then(Value::as_date)
            .ok_or_else(|| DashError::query(format!("Missing date parameter ${}", index + 1)))
    }

    fn in_range(&self, statement: &Statement) -> Result<Vec<&EventRecord>> {
        let start = Self::date_param(statement, 0)?;
        let end_exclusive = Self::date_param(statement, 1)?;
        Ok(self
            .events
            .iter()
            .filter(|e| {
                let day = e.timestamp.date();
                day >= start && day < end_exclusive && !e.contexts.is_empty()
            })
            .collect())
    }

    fn city_breakdown(&self, statement: &Statement) -> Result<QueryResult> {
        let events = self.in_range(statement)?;
        let limit = statement
            .param(2)
            .and_then(Value::as_i64)
            .map(|l| l.max(0) as usize);

        let mut groups: HashMap<Option<&str>, (BTreeSet<&str>, i64)> = HashMap::new();
        for event in events {
            let entry = groups.entry(event.city.as_deref()).or_default();
            if let Some(uuid) = event.primary_uuid() {
                entry.0.insert(uuid);
            }
            if event.is_purchase() {
                entry.1 += 1;
            }
        }

        let mut stats: Vec<(Option<&str>, i64, i64)> = groups
            .into_iter()
            .map(|(city, (users, purchases))| (city, users.len() as i64, purchases))
            .collect();
        // NULL cities sort last, as in Postgres ascending order.
        stats.sort_by(|a, b| {
            b.1.cmp(&a.1).then_with(|| match (a.0, b.0) {
                (Some(x), Some(y)) => x.cmp(y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            })
        });
        if let Some(limit) = limit {
            stats.truncate(limit);
        }

        let rows = stats
            .into_iter()
            .map(|(city, users, purchases)| {
                vec![Value::from(city), Value::Int(users), Value::Int(purchases)]
            })
            .collect();

        Ok(QueryResult::with_data(
            vec![
                ColumnInfo::new("city", "TEXT"),
                ColumnInfo::new("number_of_users", "INT8"),
                ColumnInfo::new("number_of_purchases", "INT8"),
            ],
            rows,
        ))
    }

    fn totals(&self, statement: &Statement) -> Result<QueryResult> {
        let events = self.in_range(statement)?;
        let users: BTreeSet<&str> = events.iter().filter_map(|e| e.primary_uuid()).collect();
        let purchases = events.iter().filter(|e| e.is_purchase()).count() as i64;

        Ok(QueryResult::with_data(
            vec![
                ColumnInfo::new("number_of_users", "INT8"),
                ColumnInfo::new("number_of_purchases", "INT8"),
            ],
            vec![vec![Value::Int(users.len() as i64), Value::Int(purchases)]],
        ))
    }

    fn user_purchases(&self, statement: &Statement) -> Result<QueryResult> {
        let user_id = statement
            .param(0)
            .and_then(Value::as_str)
            .ok_or_else(|| DashError::query("Missing User ID parameter $1"))?;

        // (date, user_name, payload) -> summed price; insertion order kept.
        let mut groups: Vec<(NaiveDate, Option<String>, serde_json::Value, Option<f64>)> =
            Vec::new();

        for event in self.events.iter().filter(|e| e.is_purchase()) {
            let Some(payload) = &event.purchase else {
                continue;
            };
            let price = payload.get("iap_price").and_then(json_number);
            for ctx in event.contexts.iter().filter(|c| c.uuid == user_id) {
                let day = event.timestamp.date();
                let existing = groups.iter_mut().find(|(d, name, data, _)| {
                    *d == day && *name == ctx.user_name && data == payload
                });
                match existing {
                    Some(group) => {
                        group.3 = match (group.3, price) {
                            (Some(a), Some(b)) => Some(a + b),
                            (a, b) => a.or(b),
                        };
                    }
                    None => groups.push((day, ctx.user_name.clone(), payload.clone(), price)),
                }
            }
        }

        groups.sort_by_key(|g| g.0);

        let rows = groups
            .into_iter()
            .map(|(day, name, data, amount)| {
                vec![
                    Value::Date(day),
                    Value::from(name),
                    Value::Json(data),
                    Value::from(amount),
                ]
            })
            .collect();

        Ok(QueryResult::with_data(
            vec![
                ColumnInfo::new("purchase_date", "DATE"),
                ColumnInfo::new("user_name", "TEXT"),
                ColumnInfo::new("purchase_data", "JSONB"),
                ColumnInfo::new("daily_purchase_amount", "FLOAT8"),
            ],
            rows,
        ))
    }
}

impl Default for MockDatabaseClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn execute(&self, statement: &Statement) -> Result<QueryResult> {
        let result = match statement.kind {
            StatementKind::CityBreakdown => self.city_breakdown(statement)?,
            StatementKind::Totals => self.totals(statement)?,
            StatementKind::UserPurchases => self.user_purchases(statement)?,
            StatementKind::Ping => QueryResult::with_data(
                vec![ColumnInfo::new("ok", "INT4")],
                vec![vec![Value::Int(1)]],
            ),
        };
        Ok(result.with_execution_time(Duration::from_millis(1)))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A client whose every statement fails with the given message.
pub struct FailingDatabaseClient {
    message: String,
}

impl FailingDatabaseClient {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl DatabaseClient for FailingDatabaseClient {
    async fn execute(&self, _statement: &Statement) -> Result<QueryResult> {
        Err(DashError::query(self.message.clone()))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Interprets a JSON number or numeric string as a float.
fn json_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn sample_events(today: NaiveDate) -> Vec<EventRecord> {
    let at = |days_ago: i64, hour: u32| {
        (today - DateDelta::days(days_ago))
            .and_hms_opt(hour, 15, 0)
            .unwrap_or_default()
    };
    let pack = |sku: &str, price: f64, coins: i64| {
        json!({
            "iap_sku": sku,
            "iap_price": price,
            "iap_currency": "USD",
            "coins_granted": coins,
        })
    };

    let players = [
        ("u-1001", "DragonSlayer", "Tel Aviv"),
        ("u-1002", "PoolShark", "Tel Aviv"),
        ("u-1003", "GemHunter", "Haifa"),
        ("u-1004", "NightOwl", "London"),
        ("u-1005", "Blitz", "London"),
        ("u-1006", "Marble", "London"),
        ("u-1007", "Comet", "Berlin"),
        ("u-1008", "Pixel", "New York"),
    ];

    let mut events: Vec<EventRecord> = players
        .iter()
        .enumerate()
        .flat_map(|(i, (uuid, name, city))| {
            (0..3).map(move |d| EventRecord::activity(city, at((i as i64 + d) % 7, 9), uuid, name))
        })
        .collect();

    events.extend([
        EventRecord::purchase("Tel Aviv", at(5, 20), "u-1001", "DragonSlayer", pack("coins_small", 1.99, 500)),
        EventRecord::purchase("Tel Aviv", at(3, 21), "u-1001", "DragonSlayer", pack("coins_large", 9.99, 3000)),
        EventRecord::purchase("Tel Aviv", at(3, 22), "u-1001", "DragonSlayer", pack("starter_bundle", 4.99, 1200)),
        EventRecord::purchase("Tel Aviv", at(1, 19), "u-1002", "PoolShark", pack("coins_small", 1.99, 500)),
        EventRecord::purchase("London", at(2, 18), "u-1004", "NightOwl", pack("vip_pass", 14.99, 0)),
        EventRecord::purchase("London", at(2, 18), "u-1005", "Blitz", pack("coins_small", 1.99, 500)),
        EventRecord::purchase("Berlin", at(4, 12), "u-1007", "Comet", pack("coins_large", 9.99, 3000)),
    ]);

    events
}
