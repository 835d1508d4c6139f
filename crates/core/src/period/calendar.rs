//! Calendar month period.

use chrono::{Datelike, NaiveDate};

use super::{Period, period_end, today};

/// The calendar month containing a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarMonthPeriod {
    today: NaiveDate,
}

impl CalendarMonthPeriod {
    /// Period of the month containing `today`.
    #[must_use]
    pub const fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    /// Period of the current month.
    #[must_use]
    pub fn current() -> Self {
        Self::new(today())
    }
}

impl Period for CalendarMonthPeriod {
    fn start(&self) -> NaiveDate {
        self.today.with_day(1).unwrap_or(self.today)
    }

    fn end(&self) -> NaiveDate {
        period_end(self.start())
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
    #[case(date(2026, 10, 18), date(2026, 10, 1), date(2026, 10, 31))]
    #[case(date(2026, 2, 14), date(2026, 2, 1), date(2026, 2, 28))]
    #[case(date(2028, 2, 29), date(2028, 2, 1), date(2028, 2, 29))]
    #[case(date(2026, 12, 31), date(2026, 12, 1), date(2026, 12, 31))]
    fn test_month_bounds(#[case] today: NaiveDate, #[case] start: NaiveDate, #[case] end: NaiveDate) {
        let period = CalendarMonthPeriod::new(today);
        assert_eq!(period.start(), start);
        assert_eq!(period.end(), end);
    }

    #[test]
    fn test_is_new_period_only_on_first_day() {
        assert!(CalendarMonthPeriod::new(date(2026, 11, 1)).is_new_period());
        assert!(!CalendarMonthPeriod::new(date(2026, 11, 2)).is_new_period());
    }
}
