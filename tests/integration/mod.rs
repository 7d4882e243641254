//! Dashboard integration tests.
//!
//! `dashboard_test` runs against the in-memory warehouse; `postgres_test`
//! needs DATABASE_URL.

pub mod dashboard_test;
pub mod postgres_test;
