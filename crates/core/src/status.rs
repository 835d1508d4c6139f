//! Status codes of limit and usage ledger rows.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseValueError;

/// Status of a row in the limit or usage ledger.
///
/// Rows are never deleted. A superseded row keeps the reason it stopped
/// being active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LedgerStatus {
    /// The row is the live value for its key.
    Active,
    /// Superseded because the subscribed plan itself was changed.
    InactiveByPlanUpdate,
    /// Superseded because the subscription moved to another plan.
    InactiveByPlanSwitch,
}

impl LedgerStatus {
    /// Returns the stored code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::InactiveByPlanUpdate => "inactive-by-plan-update",
            Self::InactiveByPlanSwitch => "inactive-by-plan-switch",
        }
    }

    /// Returns true if the row is live.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

impl fmt::Display for LedgerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for LedgerStatus {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "inactive-by-plan-update" => Ok(Self::InactiveByPlanUpdate),
            "inactive-by-plan-switch" => Ok(Self::InactiveByPlanSwitch),
            other => Err(ParseValueError::new("ledger status", other)),
        }
    }
}

/// Why active ledger rows are being superseded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupersedeReason {
    /// A feature was removed from, or re-limited within, the current plan.
    PlanUpdate,
    /// The subscription switched to a different plan.
    PlanSwitch,
}

impl SupersedeReason {
    /// Status the superseded rows are moved to.
    #[must_use]
    pub const fn status(self) -> LedgerStatus {
        match self {
            Self::PlanUpdate => LedgerStatus::InactiveByPlanUpdate,
            Self::PlanSwitch => LedgerStatus::InactiveByPlanSwitch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("active", LedgerStatus::Active)]
    #[case("inactive-by-plan-update", LedgerStatus::InactiveByPlanUpdate)]
    #[case("inactive-by-plan-switch", LedgerStatus::InactiveByPlanSwitch)]
    fn test_status_codes(#[case] code: &str, #[case] status: LedgerStatus) {
        assert_eq!(code.parse::<LedgerStatus>().unwrap(), status);
        assert_eq!(status.to_string(), code);
    }

    #[test]
    fn test_unknown_status_rejected() {
        let err = "deleted".parse::<LedgerStatus>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown ledger status: deleted");
    }

    #[test]
    fn test_supersede_reasons_are_inactive() {
        assert!(!SupersedeReason::PlanUpdate.status().is_active());
        assert_eq!(
            SupersedeReason::PlanSwitch.status(),
            LedgerStatus::InactiveByPlanSwitch
        );
    }
}
