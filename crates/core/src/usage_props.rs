//! Property-based tests for usage aggregation.

use chrono::{Days, NaiveDate};
use proptest::prelude::*;
use throttle_shared::types::FeatureId;

use super::usage::{Aggregator, DailyUsage, aggregate_usage};

fn rows_of(feature_id: FeatureId, aggregator: Aggregator, quantities: &[i64]) -> Vec<DailyUsage> {
    let first = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
    quantities
        .iter()
        .zip(0u64..)
        .map(|(quantity, offset)| DailyUsage {
            feature_id,
            aggregator,
            date: first + Days::new(offset),
            used_quantity: *quantity,
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Sum totals every day.
    #[test]
    fn prop_sum_totals_days(quantities in prop::collection::vec(0i64..1_000_000, 1..31)) {
        let feature_id = FeatureId::new();
        let totals = aggregate_usage(&rows_of(feature_id, Aggregator::Sum, &quantities));
        prop_assert_eq!(totals[&feature_id], quantities.iter().sum::<i64>());
    }

    /// Max reports the peak day and never exceeds the sum.
    #[test]
    fn prop_max_is_peak(quantities in prop::collection::vec(0i64..1_000_000, 1..31)) {
        let feature_id = FeatureId::new();
        let rows = rows_of(feature_id, Aggregator::Max, &quantities);
        let peak = aggregate_usage(&rows)[&feature_id];

        prop_assert_eq!(Some(&peak), quantities.iter().max());
        prop_assert!(peak <= Aggregator::Sum.collapse(quantities.iter().copied()));
    }
}
