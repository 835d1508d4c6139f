//! Property-based tests for effective limit computation.

use proptest::prelude::*;
use throttle_shared::types::FeatureId;

use super::limit::{PlanTier, effective_limits};

/// Strategy to generate the finite limits of a feature's tiers.
fn finite_limits() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(0i64..1_000_000, 1..8)
}

fn tiers_of(feature_id: FeatureId, limits: &[Option<i64>]) -> Vec<PlanTier> {
    limits
        .iter()
        .enumerate()
        .map(|(index, limit)| PlanTier {
            feature_id,
            tier: i32::try_from(index).unwrap_or(i32::MAX) + 1,
            limit: *limit,
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Only finite tiers: the effective limit is their sum.
    #[test]
    fn prop_finite_tiers_sum(limits in finite_limits()) {
        let feature_id = FeatureId::new();
        let tiers = tiers_of(feature_id, &limits.iter().copied().map(Some).collect::<Vec<_>>());

        let effective = effective_limits(&tiers);

        prop_assert_eq!(effective[&feature_id], Some(limits.iter().sum::<i64>()));
    }

    /// Any unlimited tier makes the feature unlimited, wherever it sits.
    #[test]
    fn prop_unlimited_tier_dominates(
        limits in finite_limits(),
        position in any::<prop::sample::Index>(),
    ) {
        let feature_id = FeatureId::new();
        let mut tiers: Vec<Option<i64>> = limits.into_iter().map(Some).collect();
        let at = position.index(tiers.len() + 1);
        tiers.insert(at, None);

        let effective = effective_limits(&tiers_of(feature_id, &tiers));

        prop_assert_eq!(effective[&feature_id], None);
    }

    /// Tier order never changes the result.
    #[test]
    fn prop_order_independent(limits in prop::collection::vec(prop::option::of(0i64..1_000), 1..8)) {
        let feature_id = FeatureId::new();
        let tiers = tiers_of(feature_id, &limits);
        let mut reversed = tiers.clone();
        reversed.reverse();

        prop_assert_eq!(effective_limits(&tiers), effective_limits(&reversed));
    }
}
