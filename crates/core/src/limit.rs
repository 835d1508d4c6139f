//! Effective limit computation from tiered plan definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use throttle_shared::types::FeatureId;

/// One tier of a feature's limit within a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanTier {
    /// Feature the tier applies to.
    pub feature_id: FeatureId,
    /// Tier number; higher tiers stack on top of lower ones.
    pub tier: i32,
    /// Quantity granted by this tier (None = unlimited).
    pub limit: Option<i64>,
}

/// Collapses plan tiers into one limit per feature.
///
/// A feature is unlimited (`None`) as soon as any of its tiers is unlimited.
/// Otherwise its limit is the sum of all its tiers, saturating at `i64::MAX`.
pub fn effective_limits<'a, I>(tiers: I) -> BTreeMap<FeatureId, Option<i64>>
where
    I: IntoIterator<Item = &'a PlanTier>,
{
    let mut limits: BTreeMap<FeatureId, Option<i64>> = BTreeMap::new();

    for tier in tiers {
        limits
            .entry(tier.feature_id)
            .and_modify(|acc| {
                *acc = match (*acc, tier.limit) {
                    (Some(total), Some(limit)) => Some(total.saturating_add(limit)),
                    _ => None,
                };
            })
            .or_insert(tier.limit);
    }

    limits
}
