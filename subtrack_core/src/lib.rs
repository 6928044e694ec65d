#![forbid(unsafe_code)]

//! Core domain model and renewal logic for subtrack.
//!
//! This crate provides:
//! - Domain types (billing cycles, recurrence rules, subscriptions)
//! - Recurrence engine (anchored month/year stepping, occurrence sequences)
//! - Occurrence queries (by day, by range, next renewal)
//! - Record stores (in-memory, JSON file)
//! - Cost summaries and CSV export

pub mod types;
pub mod error;
pub mod subscription;
pub mod record;
pub mod config;
pub mod logging;
pub mod engine;
pub mod query;
pub mod store;
pub mod summary;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result, ValidationError};
pub use types::*;
pub use subscription::{Subscription, SubscriptionBuilder};
pub use record::SubscriptionRecord;
pub use config::Config;
pub use engine::{occurrences, Occurrences, StopReason};
pub use query::{
    next_renewals, occurrences_in_range, occurrences_on_day, Occurrence, OccurrenceQueryService,
};
pub use store::{JsonFileStore, MemoryStore, SubscriptionStore};
pub use summary::CostSummary;
pub use export::write_occurrences_csv;
