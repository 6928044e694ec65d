//! Cost roll-ups over occurrences.

use crate::{Occurrence, Subscription};
use std::collections::BTreeMap;

/// Bucket for occurrences without a category
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Price spread evenly over the months of one billing period.
///
/// `None` for one-time purchases and for subscriptions without a price.
pub fn monthly_equivalent(subscription: &Subscription) -> Option<f64> {
    let price = subscription.price()?;
    let months = subscription.billing_cycle().months()?;
    Some(price / f64::from(months))
}

/// Combined monthly cost of all recurring subscriptions
pub fn monthly_run_rate(subscriptions: &[Subscription]) -> f64 {
    subscriptions.iter().filter_map(monthly_equivalent).sum()
}

/// What a set of occurrences costs
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CostSummary {
    pub occurrences: usize,
    /// Occurrences whose subscription has no price
    pub unpriced: usize,
    pub total: f64,
    pub by_category: BTreeMap<String, f64>,
}

impl CostSummary {
    pub fn from_occurrences(occurrences: &[Occurrence]) -> Self {
        let mut summary = CostSummary {
            occurrences: occurrences.len(),
            ..Default::default()
        };

        for occurrence in occurrences {
            let Some(price) = occurrence.subscription.price() else {
                summary.unpriced += 1;
                continue;
            };

            summary.total += price;
            let category = occurrence
                .subscription
                .category()
                .unwrap_or(UNCATEGORIZED)
                .to_string();
            *summary.by_category.entry(category).or_insert(0.0) += price;
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{occurrences_in_range, BillingCycle};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn priced(name: &str, cycle: BillingCycle, price: Option<f64>, category: Option<&str>) -> Subscription {
        Subscription::builder(name, date(2024, 1, 1), cycle)
            .anchor_day(1)
            .anchor_month(1)
            .price(price)
            .category(category.map(str::to_string))
            .build()
            .unwrap()
    }

    #[test]
    fn test_monthly_equivalent() {
        let yearly = priced("Domain", BillingCycle::Yearly, Some(24.0), None);
        let quarterly = priced("Insurance", BillingCycle::Quarterly, Some(30.0), None);
        let once = priced("Licence", BillingCycle::OneTime, Some(99.0), None);
        let free = priced("Free tier", BillingCycle::Monthly, None, None);

        assert_eq!(monthly_equivalent(&yearly), Some(2.0));
        assert_eq!(monthly_equivalent(&quarterly), Some(10.0));
        assert_eq!(monthly_equivalent(&once), None);
        assert_eq!(monthly_equivalent(&free), None);
        assert_eq!(monthly_run_rate(&[yearly, quarterly, once, free]), 12.0);
    }

    #[test]
    fn test_summary_by_category() {
        let subs = vec![
            priced("Music", BillingCycle::Monthly, Some(10.0), Some("Entertainment")),
            priced("Video", BillingCycle::Monthly, Some(15.0), Some("Entertainment")),
            priced("Backup", BillingCycle::Monthly, Some(5.0), None),
            priced("Free tier", BillingCycle::Monthly, None, Some("Tools")),
        ];

        let occurrences = occurrences_in_range(&subs, date(2024, 1, 1), date(2024, 3, 31));
        let summary = CostSummary::from_occurrences(&occurrences);

        assert_eq!(summary.occurrences, 12);
        assert_eq!(summary.unpriced, 3);
        assert_eq!(summary.total, 90.0);
        assert_eq!(summary.by_category["Entertainment"], 75.0);
        assert_eq!(summary.by_category[UNCATEGORIZED], 15.0);
        assert!(!summary.by_category.contains_key("Tools"));
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(CostSummary::from_occurrences(&[]), CostSummary::default());
    }
}
