//! Dashboard behaviour against the in-memory warehouse.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use match_dash::analytics::{Dashboard, DateRange, UserId};
use match_dash::config::DashboardConfig;
use match_dash::db::{EventRecord, MockDatabaseClient, UserContext};
use pretty_assertions::assert_eq;
use serde_json::json;

const CITIES: [&str; 5] = ["Tel Aviv", "Haifa", "London", "Berlin", "Lagos"];

fn first_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

fn at(day: i64, hour: u32) -> NaiveDateTime {
    (first_day() + Duration::days(day))
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

fn uuid(i: usize) -> String {
    format!("player-{i:03}")
}

/// Thirty players over two weeks; player `i` makes `i % 4` purchases, and
/// every seventh player also plays from a second city.
fn fixture() -> Vec<EventRecord> {
    let mut events = Vec::new();
    for i in 0..30 {
        let id = uuid(i);
        let name = format!("Player{i}");
        let city = CITIES[i % CITIES.len()];
        let day = (i % 14) as i64;

        events.push(EventRecord::activity(city, at(day, 8), &id, &name));
        if i % 7 == 0 {
            events.push(EventRecord::activity("Lagos", at(day, 9), &id, &name));
        }
        for p in 0..i % 4 {
            events.push(EventRecord::purchase(
                city,
                at(day, 10 + p as u32),
                &id,
                &name,
                json!({"iap_sku": format!("sku_{p}"), "iap_price": 0.99 + p as f64}),
            ));
        }
    }

    // An event without user context never counts.
    events.push(EventRecord {
        contexts: Vec::new(),
        ..EventRecord::purchase("Haifa", at(2, 12), "ghost", "Ghost", json!({"iap_price": 99.0}))
    });
    events
}

fn dashboard(events: Vec<EventRecord>) -> Dashboard {
    Dashboard::new(
        Box::new(MockDatabaseClient::with_events(events)),
        DashboardConfig::default(),
    )
    .unwrap()
}

fn full_range() -> DateRange {
    DateRange::new(first_day(), first_day() + Duration::days(13)).unwrap()
}

#[tokio::test]
async fn test_user_lookup_returns_only_that_user() {
    let dashboard = dashboard(fixture());

    for i in [1, 2, 3, 7, 29] {
        let user = UserId::parse(&uuid(i)).unwrap();
        let purchases = dashboard.user_purchases(&user).await.unwrap();

        let expected_name = format!("Player{i}");
        assert_eq!(purchases.rows.len(), i % 4, "rows for {user}");
        assert!(purchases
            .rows
            .iter()
            .all(|row| row.user_name.as_deref() == Some(expected_name.as_str())));
    }
}

#[tokio::test]
async fn test_unknown_user_is_empty_not_an_error() {
    let dashboard = dashboard(fixture());
    let purchases = dashboard
        .user_purchases(&UserId::parse("player-999").unwrap())
        .await
        .unwrap();

    assert!(purchases.is_empty());
    assert!(purchases.details.is_empty());
    assert_eq!(purchases.total_amount(), 0.0);
}

#[tokio::test]
async fn test_user_without_purchases_is_empty() {
    let dashboard = dashboard(fixture());
    // Player 4 makes 4 % 4 = 0 purchases.
    let purchases = dashboard
        .user_purchases(&UserId::parse(&uuid(4)).unwrap())
        .await
        .unwrap();
    assert!(purchases.is_empty());
}

#[tokio::test]
async fn test_city_purchases_sum_to_totals() {
    let dashboard = dashboard(fixture());

    for range in [
        full_range(),
        DateRange::new(first_day(), first_day() + Duration::days(3)).unwrap(),
        DateRange::new(at(5, 0).date(), at(5, 0).date()).unwrap(),
    ] {
        let cities = dashboard.city_breakdown(&range, None).await.unwrap();
        let totals = dashboard.totals(&range).await.unwrap();

        let purchases: u64 = cities.iter().map(|c| c.number_of_purchases).sum();
        assert_eq!(purchases, totals.number_of_purchases, "range {range}");

        // Players seen in two cities are counted once per city.
        let users: u64 = cities.iter().map(|c| c.number_of_users).sum();
        assert!(users >= totals.number_of_users);
    }
}

#[tokio::test]
async fn test_totals_ignore_events_without_context() {
    let dashboard = dashboard(fixture());
    let totals = dashboard.totals(&full_range()).await.unwrap();

    let expected_purchases: u64 = (0..30).map(|i| (i % 4) as u64).sum();
    assert_eq!(totals.number_of_users, 30);
    assert_eq!(totals.number_of_purchases, expected_purchases);
}

#[tokio::test]
async fn test_end_date_is_inclusive() {
    let dashboard = dashboard(vec![
        EventRecord::activity("Haifa", at(0, 0), "a", "A"),
        EventRecord::activity("Haifa", at(1, 23), "b", "B"),
        EventRecord::activity("Haifa", at(2, 0), "c", "C"),
    ]);
    let range = DateRange::new(first_day(), first_day() + Duration::days(1)).unwrap();

    let totals = dashboard.totals(&range).await.unwrap();
    assert_eq!(totals.number_of_users, 2);
}

#[tokio::test]
async fn test_general_statistics_limits_to_top_cities() {
    let settings = DashboardConfig {
        top_cities: 3,
        ..Default::default()
    };
    let dashboard = Dashboard::new(
        Box::new(MockDatabaseClient::with_events(fixture())),
        settings,
    )
    .unwrap();

    let stats = dashboard.general_statistics(&full_range()).await.unwrap();
    assert_eq!(stats.cities.len(), 3);
    assert!(stats
        .cities
        .windows(2)
        .all(|w| w[0].number_of_users >= w[1].number_of_users));
    assert_eq!(stats.correlation, stats.matrix.coefficient());
}

#[tokio::test]
async fn test_shared_event_matches_every_context() {
    let mut shared = EventRecord::purchase(
        "London",
        at(3, 12),
        "host",
        "Host",
        json!({"iap_sku": "duel_pass", "iap_price": 2.5}),
    );
    shared.contexts.push(UserContext {
        uuid: "guest".to_string(),
        user_name: Some("Guest".to_string()),
    });
    let dashboard = dashboard(vec![shared]);

    let guest = dashboard
        .user_purchases(&UserId::parse("guest").unwrap())
        .await
        .unwrap();
    assert_eq!(guest.user_name(), "Guest");
    assert_eq!(guest.total_amount(), 2.5);

    // Only the first context counts as the event's user in city statistics.
    let cities = dashboard.city_breakdown(&full_range(), None).await.unwrap();
    assert_eq!(cities[0].number_of_users, 1);
}

#[tokio::test]
async fn test_detail_table_flattens_payload() {
    let dashboard = dashboard(fixture());
    let purchases = dashboard
        .user_purchases(&UserId::parse(&uuid(3)).unwrap())
        .await
        .unwrap();

    assert_eq!(
        purchases.details.headers(),
        vec!["Date", "User Name", "Iap Price", "iap_sku"]
    );
    assert_eq!(purchases.details.rows.len(), 3);
    assert_eq!(purchases.details.rows[0][0], "2024-03-04");
    assert_eq!(purchases.details.rows[0][2], "$0.99");
    assert_eq!(purchases.details.rows[2][3], "sku_2");
}
