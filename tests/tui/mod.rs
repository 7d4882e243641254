//! Binary-level tests driving the dashboard in headless mode.

mod common;
mod headless_test;
