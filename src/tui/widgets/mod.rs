//! TUI widgets for the dashboard.
//!
//! Contains reusable UI components.

pub mod charts;
pub mod header;
pub mod input;
pub mod spinner;
pub mod table;
