//! Monthly cycle anchored on a subscription's start date.

use chrono::{Datelike, Months, NaiveDate};

use super::{Period, period_end, today};

/// The monthly cycle of a subscription containing a given day.
///
/// Cycles start on the subscription's day of month, clamped to the length of
/// shorter months (a subscription started on Jan 31 renews on Feb 28).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveSubscriptionPeriod {
    subscribed_on: NaiveDate,
    today: NaiveDate,
}

impl ActiveSubscriptionPeriod {
    /// Cycle of a subscription started on `subscribed_on` that contains `today`.
    #[must_use]
    pub const fn new(subscribed_on: NaiveDate, today: NaiveDate) -> Self {
        Self {
            subscribed_on,
            today,
        }
    }

    /// Current cycle of a subscription started on `subscribed_on`.
    #[must_use]
    pub fn current(subscribed_on: NaiveDate) -> Self {
        Self::new(subscribed_on, today())
    }

    /// Day the subscription started.
    #[must_use]
    pub const fn subscribed_on(&self) -> NaiveDate {
        self.subscribed_on
    }

    fn cycle_start(&self, cycle: u32) -> Option<NaiveDate> {
        self.subscribed_on.checked_add_months(Months::new(cycle))
    }
}

impl Period for ActiveSubscriptionPeriod {
    fn start(&self) -> NaiveDate {
        if self.today <= self.subscribed_on {
            return self.subscribed_on;
        }

        let elapsed = (self.today.year() - self.subscribed_on.year()) * 12
            + i32::try_from(self.today.month()).unwrap_or(0)
            - i32::try_from(self.subscribed_on.month()).unwrap_or(0);
        let mut cycle = u32::try_from(elapsed).unwrap_or(0);

        loop {
            match self.cycle_start(cycle) {
                Some(start) if start <= self.today => return start,
                _ if cycle == 0 => return self.subscribed_on,
                _ => cycle -= 1,
            }
        }
    }

    fn end(&self) -> NaiveDate {
        let start = self.start();
        // Step from the anchor so clamped months do not drift the cycle.
        let next = (1..)
            .map_while(|cycle| self.cycle_start(cycle))
            .find(|candidate| *candidate > start);
        next.and_then(|next| next.pred_opt())
            .unwrap_or_else(|| period_end(start))
    }

    fn today(&self) -> NaiveDate {
        self.today
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case(date(2026, 9, 5), date(2026, 10, 18), date(2026, 10, 5), date(2026, 11, 4))]
    #[case(date(2026, 9, 20), date(2026, 10, 18), date(2026, 9, 20), date(2026, 10, 19))]
    #[case(date(2026, 10, 18), date(2026, 10, 18), date(2026, 10, 18), date(2026, 11, 17))]
    #[case(date(2026, 1, 31), date(2026, 3, 1), date(2026, 2, 28), date(2026, 3, 30))]
    #[case(date(2026, 1, 31), date(2026, 3, 31), date(2026, 3, 31), date(2026, 4, 29))]
    #[case(date(2025, 11, 10), date(2026, 10, 18), date(2026, 10, 10), date(2026, 11, 9))]
    fn test_cycle_bounds(
        #[case] subscribed_on: NaiveDate,
        #[case] today: NaiveDate,
        #[case] start: NaiveDate,
        #[case] end: NaiveDate,
    ) {
        let period = ActiveSubscriptionPeriod::new(subscribed_on, today);
        assert_eq!(period.start(), start);
        assert_eq!(period.end(), end);
        assert!(period.contains(today));
    }

    #[test]
    fn test_is_new_period_on_renewal_day() {
        let subscribed_on = date(2026, 9, 5);
        assert!(ActiveSubscriptionPeriod::new(subscribed_on, date(2026, 10, 5)).is_new_period());
        assert!(!ActiveSubscriptionPeriod::new(subscribed_on, date(2026, 10, 6)).is_new_period());
    }
}
