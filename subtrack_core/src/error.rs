//! Error types for the subtrack_core library.

use crate::BillingCycle;
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for subtrack_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A subscription failed construction-time validation
    #[error("Invalid subscription: {0}")]
    Validation(#[from] ValidationError),

    /// No record exists with the given identifier
    #[error("No subscription with id {0}")]
    NotFound(i64),

    /// Record store failure
    #[error("Store error: {0}")]
    Store(String),
}

/// Reasons a subscription cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("{0} subscriptions require an anchor day")]
    MissingAnchorDay(BillingCycle),

    #[error("anchor day {0} is outside 1..=31")]
    AnchorDayOutOfRange(i64),

    #[error("{0} subscriptions require an anchor month")]
    MissingAnchorMonth(BillingCycle),

    #[error("anchor month {0} is outside 1..=12")]
    AnchorMonthOutOfRange(i64),

    #[error("unknown billing cycle '{0}'")]
    UnknownBillingCycle(String),

    #[error("invalid {field} '{value}'")]
    InvalidDate { field: &'static str, value: String },

    #[error("invalid unique key '{0}'")]
    InvalidUniqueKey(String),

    #[error("price must be a finite number, got {0}")]
    InvalidPrice(String),
}
