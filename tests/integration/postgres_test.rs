//! Warehouse integration tests.
//!
//! These run the real statements against the Postgres named by
//! `DATABASE_URL` and are skipped when it is not set. Each test creates its
//! own events table and drops it afterwards.

use chrono::NaiveDate;
use match_dash::analytics::{Dashboard, DateRange, UserId};
use match_dash::config::{ConnectionConfig, DashboardConfig};
use match_dash::db::{PostgresClient, QueryLimits};
use pretty_assertions::assert_eq;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::{SystemTime, UNIX_EPOCH};

const FIXTURE_ROWS: &str = r#"
    ('Haifa', 'in_app_purchase', '2024-03-02 10:00:00',
        '[{"uuid": "u-1", "user_name": "Ace"}]', '{"iap_sku": "coins", "iap_price": 1.5}'),
    ('Haifa', 'in_app_purchase', '2024-03-02 18:30:00',
        '[{"uuid": "u-1", "user_name": "Ace"}]', '{"iap_sku": "coins", "iap_price": 1.5}'),
    ('Haifa', 'in_app_purchase', '2024-03-04 09:00:00',
        '[{"uuid": "u-1", "user_name": "Ace"}]', '{"iap_sku": "gems", "iap_price": 4.0}'),
    ('Haifa', 'match_end', '2024-03-02 11:00:00',
        '[{"uuid": "u-2", "user_name": "Bee"}]', NULL),
    ('Eilat', 'in_app_purchase', '2024-03-03 23:59:00',
        '[{"uuid": "u-3", "user_name": "Cat"}]', '{"iap_price": 2.0}'),
    ('Eilat', 'match_end', '2024-03-05 08:00:00',
        '[{"uuid": "u-3", "user_name": "Cat"}]', NULL),
    ('Haifa', 'in_app_purchase', '2024-03-02 12:00:00',
        NULL, '{"iap_price": 99.0}')
"#;

/// An events table that lives for one test.
struct Fixture {
    pool: PgPool,
    table: String,
}

impl Fixture {
    async fn create() -> Option<Self> {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("Skipping test: DATABASE_URL not set");
            return None;
        };
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(&url)
            .await
            .expect("connect to DATABASE_URL");

        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .subsec_nanos();
        let table = format!("public.match_dash_test_{}_{}", std::process::id(), nanos);

        sqlx::query(&format!(
            "CREATE TABLE {table} (
                geo_city text,
                event_name text NOT NULL,
                derived_tstamp timestamp NOT NULL,
                user_base_stats jsonb,
                in_app_purchase jsonb
            )"
        ))
        .execute(&pool)
        .await
        .expect("create fixture table");

        sqlx::query(&format!(
            "INSERT INTO {table}
                (geo_city, event_name, derived_tstamp, user_base_stats, in_app_purchase)
             VALUES {FIXTURE_ROWS}"
        ))
        .execute(&pool)
        .await
        .expect("insert fixture rows");

        Some(Self { pool, table })
    }

    fn dashboard(&self) -> Dashboard {
        self.dashboard_with_limits(QueryLimits::default())
    }

    fn dashboard_with_limits(&self, limits: QueryLimits) -> Dashboard {
        let settings = DashboardConfig {
            events_table: self.table.clone(),
            ..Default::default()
        };
        let client = PostgresClient::from_pool(self.pool.clone(), limits);
        Dashboard::new(Box::new(client), settings).unwrap()
    }

    async fn cleanup(self) {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", self.table))
            .execute(&self.pool)
            .await
            .expect("drop fixture table");
        self.pool.close().await;
    }
}

fn march(first: u32, last: u32) -> DateRange {
    DateRange::new(
        NaiveDate::from_ymd_opt(2024, 3, first).unwrap(),
        NaiveDate::from_ymd_opt(2024, 3, last).unwrap(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_city_breakdown_and_totals() {
    let Some(fixture) = Fixture::create().await else {
        return;
    };
    let dashboard = fixture.dashboard();
    let range = march(1, 5);

    let cities = dashboard.city_breakdown(&range, None).await.unwrap();
    let summary: Vec<(&str, u64, u64)> = cities
        .iter()
        .map(|c| (c.city.as_str(), c.number_of_users, c.number_of_purchases))
        .collect();
    assert_eq!(summary, vec![("Haifa", 2, 3), ("Eilat", 1, 1)]);

    let totals = dashboard.totals(&range).await.unwrap();
    assert_eq!(totals.number_of_users, 3);
    assert_eq!(
        totals.number_of_purchases,
        cities.iter().map(|c| c.number_of_purchases).sum::<u64>()
    );

    fixture.cleanup().await;
}

#[tokio::test]
async fn test_row_limit_does_not_cut_city_breakdown() {
    let Some(fixture) = Fixture::create().await else {
        return;
    };
    for city in ["Acre", "Jaffa", "Nazareth", "Tiberias", "Safed"] {
        sqlx::query(&format!(
            r#"INSERT INTO {}
                (geo_city, event_name, derived_tstamp, user_base_stats, in_app_purchase)
             VALUES ($1, 'in_app_purchase', '2024-03-03 12:00:00',
                 '[{{"uuid": "u-9", "user_name": "Dee"}}]', '{{"iap_price": 1.0}}')"#,
            fixture.table
        ))
        .bind(city)
        .execute(&fixture.pool)
        .await
        .unwrap();
    }

    let dashboard = fixture.dashboard_with_limits(QueryLimits {
        max_rows: 3,
        ..Default::default()
    });
    let range = march(1, 5);

    let cities = dashboard.city_breakdown(&range, None).await.unwrap();
    assert_eq!(cities.len(), 7);

    let totals = dashboard.totals(&range).await.unwrap();
    assert_eq!(
        cities.iter().map(|c| c.number_of_purchases).sum::<u64>(),
        totals.number_of_purchases
    );

    fixture.cleanup().await;
}

#[tokio::test]
async fn test_end_date_includes_whole_day() {
    let Some(fixture) = Fixture::create().await else {
        return;
    };
    let dashboard = fixture.dashboard();

    // The Eilat purchase at 23:59 on the last day is counted.
    let totals = dashboard.totals(&march(1, 3)).await.unwrap();
    assert_eq!(totals.number_of_purchases, 3);

    let limited = dashboard.city_breakdown(&march(1, 3), Some(1)).await.unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].city, "Haifa");

    fixture.cleanup().await;
}

#[tokio::test]
async fn test_user_purchases_grouped_by_day() {
    let Some(fixture) = Fixture::create().await else {
        return;
    };
    let dashboard = fixture.dashboard();

    let purchases = dashboard
        .user_purchases(&UserId::parse("u-1").unwrap())
        .await
        .unwrap();

    assert_eq!(purchases.user_name(), "Ace");
    assert_eq!(purchases.rows.len(), 2);
    assert_eq!(purchases.rows[0].daily_purchase_amount, Some(3.0));
    assert_eq!(purchases.rows[1].daily_purchase_amount, Some(4.0));
    assert!(purchases
        .rows
        .iter()
        .all(|row| row.user_name.as_deref() == Some("Ace")));
    assert_eq!(purchases.total_amount(), 7.0);

    fixture.cleanup().await;
}

#[tokio::test]
async fn test_unknown_user_has_no_rows() {
    let Some(fixture) = Fixture::create().await else {
        return;
    };
    let dashboard = fixture.dashboard();

    let purchases = dashboard
        .user_purchases(&UserId::parse("nobody").unwrap())
        .await
        .unwrap();
    assert!(purchases.is_empty());

    fixture.cleanup().await;
}

#[tokio::test]
async fn test_missing_table_is_query_error() {
    let Some(fixture) = Fixture::create().await else {
        return;
    };
    let settings = DashboardConfig {
        events_table: format!("{}_missing", fixture.table),
        ..Default::default()
    };
    let client = PostgresClient::from_pool(fixture.pool.clone(), QueryLimits::default());
    let dashboard = Dashboard::new(Box::new(client), settings).unwrap();

    let err = dashboard.totals(&march(1, 5)).await.unwrap_err();
    assert_eq!(err.category(), "Query Error");

    fixture.cleanup().await;
}

#[tokio::test(flavor = "current_thread")]
async fn test_connect_to_unknown_host_fails() {
    let config = ConnectionConfig {
        host: Some("invalid.host.that.does.not.exist.local".to_string()),
        port: 5432,
        database: Some("analytics".to_string()),
        user: Some("analyst".to_string()),
        ..Default::default()
    };

    let result = PostgresClient::connect(&config, QueryLimits::default()).await;
    assert!(result.is_err());
}
