//! Persisted representation of a subscription.
//!
//! Records are what a store round-trips. They are deliberately loose (strings
//! and plain integers) so that a damaged record can still be read and then
//! rejected on its own when converted into a [`Subscription`].

use crate::error::ValidationError;
use crate::{BillingCycle, CycleStep, Error, Result, Subscription};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

const NAIVE_DATE_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

/// Flat, storage-facing subscription row
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub unique_key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub billing_cycle: String,
    #[serde(default)]
    pub anchor_day: Option<i64>,
    #[serde(default)]
    pub anchor_month: Option<i64>,
    #[serde(default)]
    pub reminder_days: Option<i64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub rating: Option<i64>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub custom_fields: Option<String>,
}

impl From<&Subscription> for SubscriptionRecord {
    fn from(sub: &Subscription) -> Self {
        SubscriptionRecord {
            id: sub.id(),
            unique_key: sub.unique_key().to_string(),
            name: sub.name().to_string(),
            created_at: sub.created_at().to_rfc3339(),
            // Date-only: time is always written as midnight
            start_date: sub
                .start_date()
                .and_time(NaiveTime::MIN)
                .format("%Y-%m-%dT%H:%M:%S")
                .to_string(),
            billing_cycle: sub.billing_cycle().as_str().to_string(),
            anchor_day: sub.anchor_day().map(i64::from),
            anchor_month: sub.anchor_month().map(i64::from),
            reminder_days: sub.reminder_days().map(i64::from),
            category: sub.category().map(str::to_string),
            rating: sub.rating().map(i64::from),
            price: sub.price(),
            custom_fields: sub.custom_fields_raw().map(str::to_string),
        }
    }
}

impl From<Subscription> for SubscriptionRecord {
    fn from(sub: Subscription) -> Self {
        SubscriptionRecord::from(&sub)
    }
}

impl TryFrom<SubscriptionRecord> for Subscription {
    type Error = Error;

    fn try_from(record: SubscriptionRecord) -> Result<Self> {
        let cycle: BillingCycle = record.billing_cycle.parse()?;

        let start_date = parse_calendar_date(&record.start_date).ok_or_else(|| {
            ValidationError::InvalidDate {
                field: "startDate",
                value: record.start_date.clone(),
            }
        })?;

        let created_at = parse_timestamp(&record.created_at).ok_or_else(|| {
            ValidationError::InvalidDate {
                field: "createdAt",
                value: record.created_at.clone(),
            }
        })?;

        let mut builder = Subscription::builder(record.name, start_date, cycle)
            .id(record.id)
            .unique_key(record.unique_key)
            .created_at(created_at)
            .reminder_days(optional_in_range("reminderDays", record.reminder_days))
            .category(record.category)
            .rating(optional_in_range("rating", record.rating))
            .price(record.price)
            .custom_fields_raw(record.custom_fields);

        // Anchors are only checked where the cycle uses them
        if cycle.is_recurring() {
            if let Some(day) = record.anchor_day {
                let day = u32::try_from(day).map_err(|_| ValidationError::AnchorDayOutOfRange(day))?;
                builder = builder.anchor_day(day);
            }
        }
        if matches!(cycle.step(), CycleStep::Years(_)) {
            if let Some(month) = record.anchor_month {
                let month =
                    u32::try_from(month).map_err(|_| ValidationError::AnchorMonthOutOfRange(month))?;
                builder = builder.anchor_month(month);
            }
        }

        Ok(builder.build()?)
    }
}

// Optional extras that don't fit their type are dropped, not fatal.
fn optional_in_range<T: TryFrom<i64>>(field: &str, value: Option<i64>) -> Option<T> {
    let value = value?;
    match T::try_from(value) {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring out-of-range {} {} on stored record", field, value);
            None
        }
    }
}

/// Read a stored date or date-time as a calendar date, discarding any time
/// and offset.
pub fn parse_calendar_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }

    NAIVE_DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|dt| dt.date())
        .or_else(|| NaiveDate::parse_from_str(value, "%Y-%m-%d").ok())
}

/// Read a stored timestamp. Values without an offset are taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    NAIVE_DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn monthly_record() -> SubscriptionRecord {
        SubscriptionRecord {
            id: Some(3),
            unique_key: "5f0c1c1e-3a43-4c8e-9f40-8d1f1b7e2a11".into(),
            name: "Streaming".into(),
            created_at: "2024-01-02T10:00:00+00:00".into(),
            start_date: "2024-01-15T00:00:00".into(),
            billing_cycle: "monthly".into(),
            anchor_day: Some(15),
            anchor_month: None,
            reminder_days: Some(3),
            category: Some("Entertainment".into()),
            rating: Some(4),
            price: Some(9.99),
            custom_fields: None,
        }
    }

    #[test]
    fn test_record_json_shape() {
        let json = serde_json::to_value(monthly_record()).unwrap();

        assert_eq!(json["uniqueKey"], "5f0c1c1e-3a43-4c8e-9f40-8d1f1b7e2a11");
        assert_eq!(json["billingCycle"], "monthly");
        assert_eq!(json["anchorDay"], 15);
        assert!(json["anchorMonth"].is_null());
        assert_eq!(json["startDate"], "2024-01-15T00:00:00");
    }

    #[test]
    fn test_unsaved_record_omits_id() {
        let mut record = monthly_record();
        record.id = None;
        let json = serde_json::to_value(record).unwrap();
        assert!(json.get("id").is_none());
    }

    #[test]
    fn test_record_to_subscription() {
        let sub = Subscription::try_from(monthly_record()).unwrap();

        assert_eq!(sub.id(), Some(3));
        assert_eq!(sub.start_date(), date(2024, 1, 15));
        assert_eq!(sub.billing_cycle(), BillingCycle::Monthly);
        assert_eq!(sub.anchor_day(), Some(15));
        assert_eq!(sub.reminder_days(), Some(3));
        assert_eq!(sub.price(), Some(9.99));

        let back = SubscriptionRecord::from(&sub);
        assert_eq!(back.start_date, "2024-01-15T00:00:00");
        assert_eq!(back.unique_key, monthly_record().unique_key);
    }

    #[test]
    fn test_start_date_time_is_truncated() {
        let mut record = monthly_record();
        record.start_date = "2024-01-15T18:45:00.250".into();
        let sub = Subscription::try_from(record).unwrap();

        assert_eq!(sub.start_date(), date(2024, 1, 15));
        assert_eq!(SubscriptionRecord::from(&sub).start_date, "2024-01-15T00:00:00");
    }

    #[test]
    fn test_parse_calendar_date_variants() {
        assert_eq!(parse_calendar_date("2024-02-29"), Some(date(2024, 2, 29)));
        assert_eq!(parse_calendar_date("2024-02-29T00:00:00"), Some(date(2024, 2, 29)));
        assert_eq!(parse_calendar_date("2024-02-29 13:05:00"), Some(date(2024, 2, 29)));
        // Offsets are not converted; the written calendar date wins
        assert_eq!(parse_calendar_date("2024-02-29T23:30:00-05:00"), Some(date(2024, 2, 29)));
        assert_eq!(parse_calendar_date("29/02/2024"), None);
    }

    #[test]
    fn test_missing_anchor_rejected() {
        let mut record = monthly_record();
        record.anchor_day = None;

        let err = Subscription::try_from(record).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::MissingAnchorDay(BillingCycle::Monthly))
        ));
    }

    #[test]
    fn test_negative_anchor_rejected() {
        let mut record = monthly_record();
        record.anchor_day = Some(-4);

        let err = Subscription::try_from(record).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::AnchorDayOutOfRange(-4))
        ));
    }

    #[test]
    fn test_unknown_cycle_rejected() {
        let mut record = monthly_record();
        record.billing_cycle = "fortnightly".into();

        assert!(matches!(
            Subscription::try_from(record).unwrap_err(),
            Error::Validation(ValidationError::UnknownBillingCycle(_))
        ));
    }

    #[test]
    fn test_bad_start_date_rejected() {
        let mut record = monthly_record();
        record.start_date = "soon".into();

        assert!(matches!(
            Subscription::try_from(record).unwrap_err(),
            Error::Validation(ValidationError::InvalidDate { field: "startDate", .. })
        ));
    }

    #[test]
    fn test_out_of_range_extras_are_dropped() {
        crate::logging::init_test();

        let mut record = monthly_record();
        record.reminder_days = Some(-3);
        record.rating = Some(1 << 40);

        let sub = Subscription::try_from(record).unwrap();
        assert_eq!(sub.reminder_days(), None);
        assert_eq!(sub.rating(), None);
        assert_eq!(sub.anchor_day(), Some(15));
    }

    #[test]
    fn test_one_time_ignores_stray_anchors() {
        let mut record = monthly_record();
        record.billing_cycle = "oneTime".into();
        record.anchor_day = Some(-1);
        record.anchor_month = Some(40);

        let sub = Subscription::try_from(record).unwrap();
        assert!(sub.is_one_time());

        let back = SubscriptionRecord::from(&sub);
        assert_eq!(back.anchor_day, None);
        assert_eq!(back.anchor_month, None);
    }
}
