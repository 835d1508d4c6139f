//! Whether a further increment of a feature fits under its limit.

use serde::{Deserialize, Serialize};

/// Limit and current usage of one feature for one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlement {
    /// Effective limit (None = unlimited).
    pub limit: Option<i64>,
    /// Usage recorded so far in the period.
    pub used: i64,
}

impl Entitlement {
    /// Creates an entitlement from a limit and the usage so far.
    #[must_use]
    pub const fn new(limit: Option<i64>, used: i64) -> Self {
        Self { limit, used }
    }

    /// Returns true if the feature has no limit.
    #[must_use]
    pub const fn is_unlimited(&self) -> bool {
        self.limit.is_none()
    }

    /// Returns true if `increment` more units stay within the limit.
    #[must_use]
    pub fn allows(&self, increment: i64) -> bool {
        self.limit
            .is_none_or(|limit| self.used.saturating_add(increment) <= limit)
    }

    /// Units left before the limit is reached (None = unlimited).
    #[must_use]
    pub fn remaining(&self) -> Option<i64> {
        self.limit
            .map(|limit| limit.saturating_sub(self.used).max(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case(80, 30, false)]
    #[case(80, 20, true)]
    #[case(100, 0, true)]
    #[case(100, 1, false)]
    fn test_basic_api_calls(#[case] used: i64, #[case] increment: i64, #[case] allowed: bool) {
        let entitlement = Entitlement::new(Some(100), used);
        assert_eq!(entitlement.allows(increment), allowed);
    }

    #[test]
    fn test_remaining() {
        assert_eq!(Entitlement::new(Some(100), 80).remaining(), Some(20));
        assert_eq!(Entitlement::new(Some(100), 130).remaining(), Some(0));
        assert_eq!(Entitlement::new(None, 130).remaining(), None);
    }

    proptest! {
        #[test]
        fn prop_unlimited_always_allows(used in any::<i64>(), increment in any::<i64>()) {
            let entitlement = Entitlement::new(None, used);
            prop_assert!(entitlement.is_unlimited());
            prop_assert!(entitlement.allows(increment));
        }

        #[test]
        fn prop_limited_matches_arithmetic(
            limit in 0i64..1_000_000,
            used in 0i64..1_000_000,
            increment in 0i64..1_000_000,
        ) {
            let entitlement = Entitlement::new(Some(limit), used);
            prop_assert_eq!(entitlement.allows(increment), used + increment <= limit);
        }
    }
}
