//! Error types for match-dash.
//!
//! Defines the main error enum used throughout the application.

use thiserror::Error;

/// Main error type for dashboard operations.
#[derive(Error, Debug)]
pub enum DashError {
    /// Warehouse connection errors (host unreachable, auth failed, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution errors (syntax errors, timeouts, undecodable rows, etc.)
    #[error("Query error: {0}")]
    Query(String),

    /// Configuration errors (invalid config file, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rejected user input (malformed date, invalid User ID, etc.)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal application errors (terminal failures, unexpected states, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DashError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an invalid input error with the given message.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::Config(_) => "Configuration Error",
            Self::InvalidInput(_) => "Invalid Input",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns the bare message without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Connection(msg)
            | Self::Query(msg)
            | Self::Config(msg)
            | Self::InvalidInput(msg)
            | Self::Internal(msg) => msg,
        }
    }
}

/// Result type alias using DashError.
pub type Result<T> = std::result::Result<T, DashError>;
