//! Billing period providers.
//!
//! A period is an inclusive `[start, end]` range of days. Two providers are
//! available and interchangeable wherever a period is required:
//!
//! - [`CalendarMonthPeriod`] - the calendar month containing today
//! - [`ActiveSubscriptionPeriod`] - the monthly cycle anchored on the day a
//!   subscription started
//!
//! Both are pure functions of the date they are built with.

pub mod calendar;
pub mod subscription;

use chrono::{Months, NaiveDate, Utc};

pub use calendar::CalendarMonthPeriod;
pub use subscription::ActiveSubscriptionPeriod;

/// Capability shared by every period provider.
pub trait Period {
    /// First day of the period.
    fn start(&self) -> NaiveDate;

    /// Last day of the period (inclusive).
    fn end(&self) -> NaiveDate;

    /// The day the period was evaluated for.
    fn today(&self) -> NaiveDate;

    /// Returns true if today is the first day of the period.
    fn is_new_period(&self) -> bool {
        self.today() == self.start()
    }

    /// Returns true if `date` falls within the period.
    fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start() && date <= self.end()
    }

    /// Start as a human readable date, e.g. "Oct 1, 2026".
    fn start_formatted(&self) -> String {
        format_date(self.start())
    }

    /// End as a human readable date, e.g. "Oct 31, 2026".
    fn end_formatted(&self) -> String {
        format_date(self.end())
    }
}

/// Period selected by the caller's context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingPeriod {
    /// Calendar month containing today.
    CalendarMonth(CalendarMonthPeriod),
    /// Monthly cycle of an active subscription.
    ActiveSubscription(ActiveSubscriptionPeriod),
}

impl Period for BillingPeriod {
    fn start(&self) -> NaiveDate {
        match self {
            Self::CalendarMonth(period) => period.start(),
            Self::ActiveSubscription(period) => period.start(),
        }
    }

    fn end(&self) -> NaiveDate {
        match self {
            Self::CalendarMonth(period) => period.end(),
            Self::ActiveSubscription(period) => period.end(),
        }
    }

    fn today(&self) -> NaiveDate {
        match self {
            Self::CalendarMonth(period) => period.today(),
            Self::ActiveSubscription(period) => period.today(),
        }
    }
}

impl From<CalendarMonthPeriod> for BillingPeriod {
    fn from(period: CalendarMonthPeriod) -> Self {
        Self::CalendarMonth(period)
    }
}

impl From<ActiveSubscriptionPeriod> for BillingPeriod {
    fn from(period: ActiveSubscriptionPeriod) -> Self {
        Self::ActiveSubscription(period)
    }
}

/// Today's date in UTC.
#[must_use]
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Last day of the one-month period starting on `start`.
///
/// Month arithmetic clamps to the end of shorter months, so a period starting
/// on Jan 31 ends on Feb 27 (or Feb 28 in leap years).
#[must_use]
pub fn period_end(start: NaiveDate) -> NaiveDate {
    start
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

fn format_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case(date(2026, 10, 18), date(2026, 11, 17))]
    #[case(date(2026, 12, 1), date(2026, 12, 31))]
    #[case(date(2026, 1, 31), date(2026, 2, 27))]
    #[case(date(2028, 1, 31), date(2028, 2, 28))]
    fn test_period_end(#[case] start: NaiveDate, #[case] end: NaiveDate) {
        assert_eq!(period_end(start), end);
    }

    #[test]
    fn test_billing_period_dispatch() {
        let calendar = CalendarMonthPeriod::new(date(2026, 10, 18));
        let cycle = ActiveSubscriptionPeriod::new(date(2026, 9, 5), date(2026, 10, 18));

        let periods: [BillingPeriod; 2] = [calendar.into(), cycle.into()];

        assert_eq!(periods[0].start(), date(2026, 10, 1));
        assert_eq!(periods[1].start(), date(2026, 10, 5));
        assert!(periods.iter().all(|p| p.contains(date(2026, 10, 18))));
    }

    #[test]
    fn test_formatted_bounds() {
        let period = CalendarMonthPeriod::new(date(2026, 10, 18));
        assert_eq!(period.start_formatted(), "Oct 1, 2026");
        assert_eq!(period.end_formatted(), "Oct 31, 2026");
    }
}
