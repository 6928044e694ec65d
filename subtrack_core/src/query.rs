//! Occurrence queries over a set of subscriptions.
//!
//! The free functions work on an in-memory slice. [`OccurrenceQueryService`]
//! wraps a store handle, converts its records, and answers the same queries
//! against a fresh snapshot on every call.

use crate::engine;
use crate::{Result, Subscription, SubscriptionStore};
use chrono::{Duration, NaiveDate};

/// A subscription renewing on a given date
#[derive(Clone, Debug, PartialEq)]
pub struct Occurrence {
    pub subscription: Subscription,
    pub date: NaiveDate,
}

impl Occurrence {
    pub fn new(subscription: &Subscription, date: NaiveDate) -> Self {
        Self {
            subscription: subscription.clone(),
            date,
        }
    }
}

/// Subscriptions renewing on `day`, at most one entry per subscription.
///
/// Results are sorted by date; ties keep input order.
pub fn occurrences_on_day(subscriptions: &[Subscription], day: NaiveDate) -> Vec<Occurrence> {
    let horizon = day.succ_opt().unwrap_or(day);

    let mut found: Vec<Occurrence> = subscriptions
        .iter()
        .filter_map(|sub| {
            let hit = if sub.is_one_time() {
                (sub.start_date() == day).then_some(day)
            } else {
                engine::occurrences_iter(sub, horizon).find(|d| *d == day)
            };
            hit.map(|date| Occurrence::new(sub, date))
        })
        .collect();

    found.sort_by_key(|o| o.date);
    found
}

/// Every renewal within `start..=end`, across all subscriptions, sorted by date.
pub fn occurrences_in_range(
    subscriptions: &[Subscription],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<Occurrence> {
    if start > end {
        tracing::debug!("Empty range {}..={}", start, end);
        return Vec::new();
    }

    let mut found = Vec::new();
    for sub in subscriptions {
        if sub.is_one_time() {
            let date = sub.start_date();
            if (start..=end).contains(&date) {
                found.push(Occurrence::new(sub, date));
            }
            continue;
        }

        found.extend(
            engine::occurrences_iter(sub, end)
                .filter(|d| *d >= start)
                .map(|date| Occurrence::new(sub, date)),
        );
    }

    found.sort_by_key(|o| o.date);
    found
}

/// Each subscription's next renewal on or after `today`, sorted by date.
///
/// One-time purchases already in the past have no next renewal.
pub fn next_renewals(subscriptions: &[Subscription], today: NaiveDate) -> Vec<Occurrence> {
    let mut found: Vec<Occurrence> = subscriptions
        .iter()
        .filter_map(|sub| {
            engine::next_occurrence_on_or_after(sub, today).map(|date| Occurrence::new(sub, date))
        })
        .collect();

    found.sort_by_key(|o| o.date);
    found
}

/// Query service bound to a record store
pub struct OccurrenceQueryService<S> {
    store: S,
}

impl<S: SubscriptionStore> OccurrenceQueryService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// All valid subscriptions in the store.
    ///
    /// Records that fail validation are logged and skipped so one damaged
    /// record never hides the rest.
    pub fn subscriptions(&self) -> Result<Vec<Subscription>> {
        let records = self.store.list_all()?;
        let total = records.len();
        let mut subscriptions = Vec::with_capacity(total);

        for record in records {
            let label = match record.id {
                Some(id) => format!("#{}", id),
                None => format!("'{}'", record.unique_key),
            };
            match Subscription::try_from(record) {
                Ok(sub) => subscriptions.push(sub),
                Err(e) => tracing::warn!("Skipping malformed subscription {}: {}", label, e),
            }
        }

        if subscriptions.len() < total {
            tracing::warn!(
                "Skipped {} of {} stored subscriptions",
                total - subscriptions.len(),
                total
            );
        }
        Ok(subscriptions)
    }

    pub fn on_day(&self, day: NaiveDate) -> Result<Vec<Occurrence>> {
        Ok(occurrences_on_day(&self.subscriptions()?, day))
    }

    pub fn in_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Occurrence>> {
        Ok(occurrences_in_range(&self.subscriptions()?, start, end))
    }

    pub fn next_renewals(&self, today: NaiveDate) -> Result<Vec<Occurrence>> {
        Ok(next_renewals(&self.subscriptions()?, today))
    }

    /// Renewals from `today` through `days` days ahead, inclusive
    pub fn upcoming(&self, today: NaiveDate, days: u32) -> Result<Vec<Occurrence>> {
        let end = today
            .checked_add_signed(Duration::days(i64::from(days)))
            .unwrap_or(NaiveDate::MAX);
        self.in_range(today, end)
    }
}
