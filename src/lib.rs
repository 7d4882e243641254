//! match-dash - terminal dashboard for Match Masters user and purchase statistics.
//!
//! This library exposes the core modules for the binary and integration tests.

pub mod analytics;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod tui;
