//! The subscription entity and its constructing API.

use crate::error::ValidationError;
use crate::{BillingCycle, Recurrence};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// A tracked subscription.
///
/// Values are immutable once built; edits go through
/// [`Subscription::to_builder`] and replace the whole record.
#[derive(Clone, Debug, PartialEq)]
pub struct Subscription {
    id: Option<i64>,
    unique_key: String,
    name: String,
    created_at: DateTime<Utc>,
    start_date: NaiveDate,
    recurrence: Recurrence,
    reminder_days: Option<u32>,
    category: Option<String>,
    rating: Option<i32>,
    price: Option<f64>,
    custom_fields: Option<String>,
}

impl Subscription {
    /// Start building a subscription. Anchors are set on the builder.
    pub fn builder(
        name: impl Into<String>,
        start_date: NaiveDate,
        cycle: BillingCycle,
    ) -> SubscriptionBuilder {
        SubscriptionBuilder {
            name: name.into(),
            start_date,
            cycle,
            anchor_day: None,
            anchor_month: None,
            id: None,
            unique_key: None,
            created_at: None,
            reminder_days: None,
            category: None,
            rating: None,
            price: None,
            custom_fields: None,
        }
    }

    /// Builder pre-filled with this record's values, identity included
    pub fn to_builder(&self) -> SubscriptionBuilder {
        SubscriptionBuilder {
            name: self.name.clone(),
            start_date: self.start_date,
            cycle: self.recurrence.cycle(),
            anchor_day: self.recurrence.anchor_day(),
            anchor_month: self.recurrence.anchor_month(),
            id: self.id,
            unique_key: Some(self.unique_key.clone()),
            created_at: Some(self.created_at),
            reminder_days: self.reminder_days,
            category: self.category.clone(),
            rating: self.rating,
            price: self.price,
            custom_fields: self.custom_fields.clone(),
        }
    }

    /// Same record with the store-assigned identifier
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn unique_key(&self) -> &str {
        &self.unique_key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn recurrence(&self) -> &Recurrence {
        &self.recurrence
    }

    pub fn billing_cycle(&self) -> BillingCycle {
        self.recurrence.cycle()
    }

    pub fn is_one_time(&self) -> bool {
        !self.billing_cycle().is_recurring()
    }

    pub fn anchor_day(&self) -> Option<u32> {
        self.recurrence.anchor_day()
    }

    pub fn anchor_month(&self) -> Option<u32> {
        self.recurrence.anchor_month()
    }

    pub fn reminder_days(&self) -> Option<u32> {
        self.reminder_days
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn rating(&self) -> Option<i32> {
        self.rating
    }

    pub fn price(&self) -> Option<f64> {
        self.price
    }

    /// Raw serialized custom fields, as stored
    pub fn custom_fields_raw(&self) -> Option<&str> {
        self.custom_fields.as_deref()
    }

    /// Parsed custom fields.
    ///
    /// A blob that isn't a JSON object is treated as empty and logged.
    pub fn custom_fields(&self) -> BTreeMap<String, Value> {
        let Some(raw) = self.custom_fields.as_deref() else {
            return BTreeMap::new();
        };
        if raw.trim().is_empty() {
            return BTreeMap::new();
        }

        match serde_json::from_str::<BTreeMap<String, Value>>(raw) {
            Ok(fields) => fields,
            Err(e) => {
                tracing::warn!(
                    "Ignoring unreadable custom fields on subscription {}: {}",
                    self.unique_key,
                    e
                );
                BTreeMap::new()
            }
        }
    }
}

/// Validating constructor for [`Subscription`].
///
/// `unique_key` and `created_at` are generated when not supplied; values
/// supplied when reconstructing from storage are kept verbatim.
#[derive(Clone, Debug)]
pub struct SubscriptionBuilder {
    name: String,
    start_date: NaiveDate,
    cycle: BillingCycle,
    anchor_day: Option<u32>,
    anchor_month: Option<u32>,
    id: Option<i64>,
    unique_key: Option<String>,
    created_at: Option<DateTime<Utc>>,
    reminder_days: Option<u32>,
    category: Option<String>,
    rating: Option<i32>,
    price: Option<f64>,
    custom_fields: Option<String>,
}

impl SubscriptionBuilder {
    pub fn anchor_day(mut self, day: u32) -> Self {
        self.anchor_day = Some(day);
        self
    }

    pub fn anchor_month(mut self, month: u32) -> Self {
        self.anchor_month = Some(month);
        self
    }

    pub fn id(mut self, id: Option<i64>) -> Self {
        self.id = id;
        self
    }

    pub fn unique_key(mut self, key: impl Into<String>) -> Self {
        self.unique_key = Some(key.into());
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn reminder_days(mut self, days: Option<u32>) -> Self {
        self.reminder_days = days;
        self
    }

    pub fn category(mut self, category: Option<String>) -> Self {
        self.category = category;
        self
    }

    pub fn rating(mut self, rating: Option<i32>) -> Self {
        self.rating = rating;
        self
    }

    pub fn price(mut self, price: Option<f64>) -> Self {
        self.price = price;
        self
    }

    /// Store custom fields as a serialized JSON object
    pub fn custom_fields(mut self, fields: &BTreeMap<String, Value>) -> Self {
        self.custom_fields = if fields.is_empty() {
            None
        } else {
            serde_json::to_string(fields).ok()
        };
        self
    }

    /// Keep an already-serialized blob as-is
    pub fn custom_fields_raw(mut self, raw: Option<String>) -> Self {
        self.custom_fields = raw;
        self
    }

    pub fn build(self) -> Result<Subscription, ValidationError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }

        let recurrence = Recurrence::new(self.cycle, self.anchor_day, self.anchor_month)?;

        if let Some(price) = self.price.filter(|p| !p.is_finite()) {
            return Err(ValidationError::InvalidPrice(price.to_string()));
        }

        let unique_key = match self.unique_key {
            Some(key) if key.trim().is_empty() => {
                return Err(ValidationError::InvalidUniqueKey(key));
            }
            Some(key) => key,
            None => Uuid::new_v4().to_string(),
        };

        Ok(Subscription {
            id: self.id,
            unique_key,
            name,
            created_at: self.created_at.unwrap_or_else(Utc::now),
            start_date: self.start_date,
            recurrence,
            reminder_days: self.reminder_days,
            category: self.category.filter(|c| !c.trim().is_empty()),
            rating: self.rating,
            price: self.price,
            custom_fields: self.custom_fields,
        })
    }
}
