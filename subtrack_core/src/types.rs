//! Core domain types for subscription recurrence.
//!
//! This module defines the closed set of billing cycles and the validated
//! recurrence rule (cycle + anchor) that the engine consumes.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Billing Cycles
// ============================================================================

/// How often a subscription renews
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum BillingCycle {
    OneTime,
    Monthly,
    Quarterly,
    SemiAnnually,
    Yearly,
    EveryTwoYears,
    EveryThreeYears,
}

/// The unit a billing cycle advances by
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleStep {
    /// No recurrence; the start date is the only occurrence
    Once,
    /// Advance by this many calendar months, pinned to an anchor day
    Months(u32),
    /// Advance by this many years, pinned to an anchor month and day
    Years(u32),
}

impl BillingCycle {
    /// Every cycle, in ascending order of period length
    pub const ALL: [BillingCycle; 7] = [
        BillingCycle::OneTime,
        BillingCycle::Monthly,
        BillingCycle::Quarterly,
        BillingCycle::SemiAnnually,
        BillingCycle::Yearly,
        BillingCycle::EveryTwoYears,
        BillingCycle::EveryThreeYears,
    ];

    /// Step function for this cycle.
    ///
    /// This is the single place cycle lengths are defined; everything else
    /// (anchor requirements, cost normalisation) derives from it.
    pub fn step(self) -> CycleStep {
        match self {
            BillingCycle::OneTime => CycleStep::Once,
            BillingCycle::Monthly => CycleStep::Months(1),
            BillingCycle::Quarterly => CycleStep::Months(3),
            BillingCycle::SemiAnnually => CycleStep::Months(6),
            BillingCycle::Yearly => CycleStep::Years(1),
            BillingCycle::EveryTwoYears => CycleStep::Years(2),
            BillingCycle::EveryThreeYears => CycleStep::Years(3),
        }
    }

    /// Length of one period in months, `None` for one-time purchases
    pub fn months(self) -> Option<u32> {
        match self.step() {
            CycleStep::Once => None,
            CycleStep::Months(n) => Some(n),
            CycleStep::Years(n) => Some(n * 12),
        }
    }

    pub fn is_recurring(self) -> bool {
        self != BillingCycle::OneTime
    }

    /// Persisted name of the cycle
    pub fn as_str(self) -> &'static str {
        match self {
            BillingCycle::OneTime => "oneTime",
            BillingCycle::Monthly => "monthly",
            BillingCycle::Quarterly => "quarterly",
            BillingCycle::SemiAnnually => "semiAnnually",
            BillingCycle::Yearly => "yearly",
            BillingCycle::EveryTwoYears => "everyTwoYears",
            BillingCycle::EveryThreeYears => "everyThreeYears",
        }
    }
}

impl fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for BillingCycle {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BillingCycle::ALL
            .into_iter()
            .find(|cycle| cycle.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::UnknownBillingCycle(s.to_string()))
    }
}

// ============================================================================
// Recurrence Rules
// ============================================================================

/// Engine-facing shape of a recurrence: how far to step and what to pin to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Schedule {
    /// One-time purchase; the start date is the only occurrence
    Once,
    /// Every `every` months on `day` (clamped in short months)
    Months { every: u32, day: u32 },
    /// Every `every` years on `month`/`day` (clamped, leap-year aware)
    Years { every: u32, month: u32, day: u32 },
}

/// A billing cycle paired with a validated anchor.
///
/// Fields are private: the only way to obtain a `Recurrence` is
/// [`Recurrence::new`], so a recurring rule without its anchor cannot exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Recurrence {
    cycle: BillingCycle,
    schedule: Schedule,
}

impl Recurrence {
    /// Validate anchors against the cycle's requirements.
    ///
    /// Anchors a cycle does not use are ignored: both for one-time purchases,
    /// and `anchor_month` for month-based cycles. Anchors that don't exist in
    /// every month (day 31, February 29) are accepted; the engine clamps them.
    pub fn new(
        cycle: BillingCycle,
        anchor_day: Option<u32>,
        anchor_month: Option<u32>,
    ) -> Result<Self, ValidationError> {
        let schedule = match cycle.step() {
            CycleStep::Once => Schedule::Once,
            CycleStep::Months(every) => Schedule::Months {
                every,
                day: require_day(cycle, anchor_day)?,
            },
            CycleStep::Years(every) => {
                let day = require_day(cycle, anchor_day)?;
                let month = anchor_month.ok_or(ValidationError::MissingAnchorMonth(cycle))?;
                if !(1..=12).contains(&month) {
                    return Err(ValidationError::AnchorMonthOutOfRange(i64::from(month)));
                }
                Schedule::Years { every, month, day }
            }
        };

        Ok(Self { cycle, schedule })
    }

    pub fn one_time() -> Self {
        Self {
            cycle: BillingCycle::OneTime,
            schedule: Schedule::Once,
        }
    }

    pub fn cycle(&self) -> BillingCycle {
        self.cycle
    }

    pub fn schedule(&self) -> Schedule {
        self.schedule
    }

    pub fn anchor_day(&self) -> Option<u32> {
        match self.schedule {
            Schedule::Once => None,
            Schedule::Months { day, .. } | Schedule::Years { day, .. } => Some(day),
        }
    }

    pub fn anchor_month(&self) -> Option<u32> {
        match self.schedule {
            Schedule::Years { month, .. } => Some(month),
            _ => None,
        }
    }
}

fn require_day(cycle: BillingCycle, anchor_day: Option<u32>) -> Result<u32, ValidationError> {
    let day = anchor_day.ok_or(ValidationError::MissingAnchorDay(cycle))?;
    if !(1..=31).contains(&day) {
        return Err(ValidationError::AnchorDayOutOfRange(i64::from(day)));
    }
    Ok(day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_names_roundtrip() {
        for cycle in BillingCycle::ALL {
            assert_eq!(cycle.as_str().parse::<BillingCycle>().unwrap(), cycle);
            let json = serde_json::to_string(&cycle).unwrap();
            assert_eq!(json, format!("\"{}\"", cycle.as_str()));
        }
    }

    #[test]
    fn test_unknown_cycle_rejected() {
        let err = "weekly".parse::<BillingCycle>().unwrap_err();
        assert_eq!(err, ValidationError::UnknownBillingCycle("weekly".into()));
    }

    #[test]
    fn test_cycle_months() {
        assert_eq!(BillingCycle::OneTime.months(), None);
        assert_eq!(BillingCycle::Quarterly.months(), Some(3));
        assert_eq!(BillingCycle::SemiAnnually.months(), Some(6));
        assert_eq!(BillingCycle::EveryThreeYears.months(), Some(36));
    }

    #[test]
    fn test_one_time_ignores_anchors() {
        let rule = Recurrence::new(BillingCycle::OneTime, Some(99), Some(99)).unwrap();
        assert_eq!(rule.schedule(), Schedule::Once);
        assert_eq!(rule, Recurrence::one_time());
    }

    #[test]
    fn test_monthly_requires_day_and_ignores_month() {
        assert_eq!(
            Recurrence::new(BillingCycle::Monthly, None, None).unwrap_err(),
            ValidationError::MissingAnchorDay(BillingCycle::Monthly)
        );

        let rule = Recurrence::new(BillingCycle::Quarterly, Some(10), Some(4)).unwrap();
        assert_eq!(rule.schedule(), Schedule::Months { every: 3, day: 10 });
        assert_eq!(rule.anchor_month(), None);
    }

    #[test]
    fn test_yearly_requires_month() {
        assert_eq!(
            Recurrence::new(BillingCycle::Yearly, Some(1), None).unwrap_err(),
            ValidationError::MissingAnchorMonth(BillingCycle::Yearly)
        );
        assert_eq!(
            Recurrence::new(BillingCycle::EveryTwoYears, Some(1), Some(13)).unwrap_err(),
            ValidationError::AnchorMonthOutOfRange(13)
        );
    }

    #[test]
    fn test_anchor_day_range() {
        assert_eq!(
            Recurrence::new(BillingCycle::Monthly, Some(0), None).unwrap_err(),
            ValidationError::AnchorDayOutOfRange(0)
        );
        assert_eq!(
            Recurrence::new(BillingCycle::Monthly, Some(32), None).unwrap_err(),
            ValidationError::AnchorDayOutOfRange(32)
        );

        // Days that only exist in some months are fine
        let rule = Recurrence::new(BillingCycle::Yearly, Some(29), Some(2)).unwrap();
        assert_eq!(
            rule.schedule(),
            Schedule::Years {
                every: 1,
                month: 2,
                day: 29
            }
        );
    }
}
