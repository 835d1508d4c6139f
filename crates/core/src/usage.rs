//! Aggregation of daily usage rows into period totals.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use throttle_shared::types::FeatureId;

use crate::error::ParseValueError;

/// How the daily rows of a feature collapse into one period quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregator {
    /// Peak day wins (gauges such as seats or storage).
    Max,
    /// Days are totalled (counters such as API calls).
    Sum,
}

impl Aggregator {
    /// Returns the stored code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Max => "max",
            Self::Sum => "sum",
        }
    }

    /// Collapses daily quantities; an empty period collapses to zero.
    pub fn collapse<I>(self, quantities: I) -> i64
    where
        I: IntoIterator<Item = i64>,
    {
        let quantities = quantities.into_iter();
        match self {
            Self::Max => quantities.max().unwrap_or(0),
            Self::Sum => quantities.fold(0, i64::saturating_add),
        }
    }
}

impl fmt::Display for Aggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Aggregator {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "max" => Ok(Self::Max),
            "sum" => Ok(Self::Sum),
            other => Err(ParseValueError::new("aggregator", other)),
        }
    }
}

/// One day of recorded usage for a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyUsage {
    /// Feature the usage was recorded against.
    pub feature_id: FeatureId,
    /// Aggregator of that feature.
    pub aggregator: Aggregator,
    /// Day of the usage.
    pub date: NaiveDate,
    /// Quantity used on that day.
    pub used_quantity: i64,
}

/// Collapses daily rows into one quantity per feature.
///
/// Each feature uses its own aggregator. Features without rows are absent
/// from the result.
pub fn aggregate_usage<'a, I>(rows: I) -> BTreeMap<FeatureId, i64>
where
    I: IntoIterator<Item = &'a DailyUsage>,
{
    let mut grouped: BTreeMap<FeatureId, (Aggregator, Vec<i64>)> = BTreeMap::new();

    for row in rows {
        grouped
            .entry(row.feature_id)
            .or_insert_with(|| (row.aggregator, Vec::new()))
            .1
            .push(row.used_quantity);
    }

    grouped
        .into_iter()
        .map(|(feature_id, (aggregator, quantities))| {
            (feature_id, aggregator.collapse(quantities))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[rstest]
    #[case(Aggregator::Sum, &[3, 9, 4], 16)]
    #[case(Aggregator::Max, &[3, 9, 4], 9)]
    #[case(Aggregator::Sum, &[], 0)]
    #[case(Aggregator::Max, &[], 0)]
    fn test_collapse(#[case] aggregator: Aggregator, #[case] days: &[i64], #[case] total: i64) {
        assert_eq!(aggregator.collapse(days.iter().copied()), total);
    }

    #[test]
    fn test_aggregator_codes() {
        assert_eq!("sum".parse::<Aggregator>().unwrap(), Aggregator::Sum);
        assert_eq!(Aggregator::Max.to_string(), "max");
        assert!("avg".parse::<Aggregator>().is_err());
    }

    #[test]
    fn test_aggregate_per_feature_aggregator() {
        let api_calls = FeatureId::new();
        let seats = FeatureId::new();
        let rows = [
            DailyUsage {
                feature_id: api_calls,
                aggregator: Aggregator::Sum,
                date: day(1),
                used_quantity: 80,
            },
            DailyUsage {
                feature_id: seats,
                aggregator: Aggregator::Max,
                date: day(1),
                used_quantity: 4,
            },
            DailyUsage {
                feature_id: api_calls,
                aggregator: Aggregator::Sum,
                date: day(2),
                used_quantity: 15,
            },
            DailyUsage {
                feature_id: seats,
                aggregator: Aggregator::Max,
                date: day(2),
                used_quantity: 2,
            },
        ];

        let totals = aggregate_usage(&rows);

        assert_eq!(totals[&api_calls], 95);
        assert_eq!(totals[&seats], 4);
    }
}
