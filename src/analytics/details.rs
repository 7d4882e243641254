//! Flattening purchase payloads into the "Detailed Purchase Information" table.

use super::models::PurchaseRow;
use serde::Serialize;
use serde_json::Value as Json;

/// How a detail column's cells are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnKind {
    Date,
    Text,
    /// Numeric cells shown as `$x.xx`.
    Currency,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailColumn {
    /// Payload key (or `purchase_date` / `user_name`).
    pub key: String,
    pub title: String,
    pub kind: ColumnKind,
}

/// Formatted purchase rows with one column per payload key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetailTable {
    pub columns: Vec<DetailColumn>,
    pub rows: Vec<Vec<String>>,
}

impl DetailTable {
    pub fn from_purchases(purchases: &[PurchaseRow]) -> Self {
        if purchases.is_empty() {
            return Self::default();
        }

        let mut columns = vec![
            DetailColumn {
                key: "purchase_date".to_string(),
                title: "Date".to_string(),
                kind: ColumnKind::Date,
            },
            DetailColumn {
                key: "user_name".to_string(),
                title: "User Name".to_string(),
                kind: ColumnKind::Text,
            },
        ];

        for purchase in purchases {
            let Json::Object(map) = &purchase.purchase_data else {
                continue;
            };
            for key in map.keys() {
                if columns.iter().any(|c| &c.key == key) {
                    continue;
                }
                // Only money columns get a display title; the rest keep the raw key.
                let (title, kind) = if is_money_key(key) {
                    (title_case(&key.replace('_', " ")), ColumnKind::Currency)
                } else {
                    (key.clone(), ColumnKind::Text)
                };
                columns.push(DetailColumn {
                    key: key.clone(),
                    title,
                    kind,
                });
            }
        }

        let rows = purchases
            .iter()
            .map(|purchase| {
                columns
                    .iter()
                    .map(|column| match column.key.as_str() {
                        "purchase_date" => purchase.purchase_date.format("%Y-%m-%d").to_string(),
                        "user_name" => purchase.user_name.clone().unwrap_or_default(),
                        key => format_cell(purchase.purchase_data.get(key), column.kind),
                    })
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn headers(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.title.as_str()).collect()
    }
}

fn is_money_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    lower.contains("price") || lower.contains("amount")
}

fn format_cell(value: Option<&Json>, kind: ColumnKind) -> String {
    let Some(value) = value else {
        return String::new();
    };
    if kind == ColumnKind::Currency {
        let number = match value {
            Json::Number(n) => n.as_f64(),
            Json::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        if let Some(number) = number {
            return format_currency(number);
        }
    }
    match value {
        Json::Null => String::new(),
        Json::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Formats an amount as `$x.xx`.
pub fn format_currency(amount: f64) -> String {
    if amount < 0.0 {
        format!("-${:.2}", -amount)
    } else {
        format!("${amount:.2}")
    }
}

/// Capitalizes each whitespace-separated word and lowercases the rest.
pub fn title_case(input: &str) -> String {
    input
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
