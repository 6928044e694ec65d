//! Recurrence engine for renewal dates.
//!
//! Pure calendar arithmetic over anchored billing cycles:
//! - Month and year stepping with anchor-day clamping
//! - First occurrence on or after a subscription's start date
//! - A bounded, lazily evaluated occurrence sequence
//!
//! Nothing here does I/O or keeps state between calls.

use crate::{Recurrence, Schedule, Subscription};
use chrono::{Datelike, NaiveDate};
use std::iter::FusedIterator;

/// Upper bound on dates produced by one [`Occurrences`] run
/// (100 years of monthly renewals).
pub const MAX_OCCURRENCES: usize = 1200;

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Number of days in `month` (1-12) of `year`; 0 for an invalid month.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// Advance `date` by `n` calendar months, landing on `anchor_day`.
///
/// The anchor is clamped to the length of the target month and to the length
/// of the month being stepped from. A clamp therefore carries into the next
/// step: Jan 31 → Feb 29 → Mar 29 → Apr 30 for an anchor of 31 in 2024.
///
/// Time-of-day is preserved for date-time inputs. Returns `None` only if the
/// result is outside chrono's representable range.
pub fn add_months<D: Datelike>(date: D, n: u32, anchor_day: u32) -> Option<D> {
    let index = i64::from(date.year()) * 12 + i64::from(date.month0()) + i64::from(n);
    let year = i32::try_from(index.div_euclid(12)).ok()?;
    let month = u32::try_from(index.rem_euclid(12)).ok()? + 1;

    let ceiling = days_in_month(date.year(), date.month()).min(days_in_month(year, month));
    with_ymd(date, year, month, anchor_day.min(ceiling).max(1))
}

/// Advance `date` by `n` years, landing on `anchor_month`/`anchor_day`.
///
/// The day is clamped to the anchor month's length in the target year, so a
/// February 29 anchor falls on the 28th in common years and returns to the
/// 29th in leap years. Time-of-day is preserved.
pub fn add_years<D: Datelike>(date: D, n: u32, anchor_month: u32, anchor_day: u32) -> Option<D> {
    if !(1..=12).contains(&anchor_month) {
        return None;
    }

    let year = date.year().checked_add(i32::try_from(n).ok()?)?;
    let ceiling = days_in_month(year, anchor_month);
    with_ymd(date, year, anchor_month, anchor_day.min(ceiling).max(1))
}

// Goes through the 1st so that no intermediate date is invalid.
fn with_ymd<D: Datelike>(date: D, year: i32, month: u32, day: u32) -> Option<D> {
    date.with_day(1)?
        .with_year(year)?
        .with_month(month)?
        .with_day(day)
}

/// First renewal on or after `start`.
///
/// One-time purchases return `start` itself. Recurring rules take the anchor
/// inside `start`'s own month (or year) and move one cycle forward if that
/// candidate is earlier than `start`.
pub fn first_occurrence_on_or_after(start: NaiveDate, recurrence: &Recurrence) -> Option<NaiveDate> {
    match recurrence.schedule() {
        Schedule::Once => Some(start),
        Schedule::Months { every, day } => {
            let ceiling = days_in_month(start.year(), start.month());
            let candidate = with_ymd(start, start.year(), start.month(), day.min(ceiling).max(1))?;
            if candidate < start {
                add_months(candidate, every, day)
            } else {
                Some(candidate)
            }
        }
        Schedule::Years { every, month, day } => {
            let candidate = add_years(start, 0, month, day)?;
            if candidate < start {
                add_years(candidate, every, month, day)
            } else {
                Some(candidate)
            }
        }
    }
}

/// Apply the cycle's step function once. `None` for one-time purchases.
pub fn step(recurrence: &Recurrence, date: NaiveDate) -> Option<NaiveDate> {
    match recurrence.schedule() {
        Schedule::Once => None,
        Schedule::Months { every, day } => add_months(date, every, day),
        Schedule::Years { every, month, day } => add_years(date, every, month, day),
    }
}

/// Why an [`Occurrences`] sequence ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// One-time purchases produce no recurring occurrences
    OneTime,
    /// The next date would be after `max_date`
    PastMaxDate,
    /// [`MAX_OCCURRENCES`] dates were produced
    IterationCap,
    /// A step failed to move strictly forward
    NotAdvancing,
    /// The next date is outside the representable calendar
    OutOfRange,
}

type StepFn = fn(&Recurrence, NaiveDate) -> Option<NaiveDate>;

/// Lazily generated renewal dates, strictly increasing, up to and including
/// `max_date`.
#[derive(Clone, Debug)]
pub struct Occurrences {
    recurrence: Recurrence,
    step: StepFn,
    next: Option<NaiveDate>,
    max_date: NaiveDate,
    produced: usize,
    stop: Option<StopReason>,
}

impl Occurrences {
    pub fn new(start: NaiveDate, recurrence: Recurrence, max_date: NaiveDate) -> Self {
        let (next, stop) = if !recurrence.cycle().is_recurring() {
            (None, Some(StopReason::OneTime))
        } else {
            match first_occurrence_on_or_after(start, &recurrence) {
                Some(first) => (Some(first), None),
                None => (None, Some(StopReason::OutOfRange)),
            }
        };

        Self {
            recurrence,
            step,
            next,
            max_date,
            produced: 0,
            stop,
        }
    }

    #[cfg(test)]
    fn with_step(mut self, step: StepFn) -> Self {
        self.step = step;
        self
    }

    /// Why generation ended, or `None` while dates remain
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop
    }
}

impl Iterator for Occurrences {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let current = self.next.take()?;

        if current > self.max_date {
            self.stop = Some(StopReason::PastMaxDate);
            return None;
        }

        if self.produced >= MAX_OCCURRENCES {
            tracing::warn!(
                "Stopped generating {} occurrences at {} after {} dates",
                self.recurrence.cycle(),
                current,
                MAX_OCCURRENCES
            );
            self.stop = Some(StopReason::IterationCap);
            return None;
        }

        self.produced += 1;

        match (self.step)(&self.recurrence, current) {
            Some(following) if following > current => self.next = Some(following),
            Some(following) => {
                tracing::error!(
                    "{} step from {} produced {}, which does not advance; halting",
                    self.recurrence.cycle(),
                    current,
                    following
                );
                self.stop = Some(StopReason::NotAdvancing);
            }
            None => {
                tracing::debug!("No representable occurrence after {}", current);
                self.stop = Some(StopReason::OutOfRange);
            }
        }

        Some(current)
    }
}

impl FusedIterator for Occurrences {}

/// Lazy occurrence sequence for a subscription
pub fn occurrences_iter(subscription: &Subscription, max_date: NaiveDate) -> Occurrences {
    Occurrences::new(
        subscription.start_date(),
        *subscription.recurrence(),
        max_date,
    )
}

/// All renewal dates of `subscription` up to and including `max_date`.
///
/// Always empty for one-time purchases; callers handle their single date.
pub fn occurrences(subscription: &Subscription, max_date: NaiveDate) -> Vec<NaiveDate> {
    occurrences_iter(subscription, max_date).collect()
}

/// First renewal falling on or after `date`, if any.
///
/// A one-time purchase renews only on its start date.
pub fn next_occurrence_on_or_after(subscription: &Subscription, date: NaiveDate) -> Option<NaiveDate> {
    if subscription.is_one_time() {
        let start = subscription.start_date();
        return (start >= date).then_some(start);
    }

    occurrences_iter(subscription, NaiveDate::MAX).find(|d| *d >= date)
}
