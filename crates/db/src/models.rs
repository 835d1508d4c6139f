//! Rows decoded from the catalog and the ledgers.
//!
//! Table names are configurable, so rows are plain `FromQueryResult` structs
//! rather than entities bound to a fixed table.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::FromQueryResult;
use serde::Serialize;
use throttle_core::{Aggregator, LedgerStatus, ParseValueError, PlanTier};
use throttle_shared::types::{FeatureId, PlanId, SubscriptionId, UserId};
use uuid::Uuid;

/// A catalog plan.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult, Serialize)]
pub struct Plan {
    /// Plan ID.
    pub id: Uuid,
    /// Stable identifier.
    pub identifier: String,
    /// Display name.
    pub name: String,
}

impl Plan {
    /// Typed plan ID.
    #[must_use]
    pub const fn plan_id(&self) -> PlanId {
        PlanId::from_uuid(self.id)
    }
}

/// A metered feature.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult, Serialize)]
pub struct Feature {
    /// Feature ID.
    pub id: Uuid,
    /// Stable identifier.
    pub identifier: String,
    /// Display name.
    pub name: String,
    /// Stored aggregator code.
    pub aggregator: String,
}

impl Feature {
    /// Typed feature ID.
    #[must_use]
    pub const fn feature_id(&self) -> FeatureId {
        FeatureId::from_uuid(self.id)
    }

    /// Decoded aggregator.
    pub fn aggregator(&self) -> Result<Aggregator, ParseValueError> {
        self.aggregator.parse()
    }
}

/// One tier row of the plan/feature table.
#[derive(Debug, Clone, FromQueryResult)]
pub(crate) struct PlanTierRow {
    pub feature_id: Uuid,
    pub tier: i32,
    pub limit: Option<i64>,
}

impl From<PlanTierRow> for PlanTier {
    fn from(row: PlanTierRow) -> Self {
        Self {
            feature_id: FeatureId::from_uuid(row.feature_id),
            tier: row.tier,
            limit: row.limit,
        }
    }
}

/// A subscription binding a user to a plan.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult, Serialize)]
pub struct Subscription {
    /// Subscription ID.
    pub id: Uuid,
    /// Subscriber.
    pub user_id: Uuid,
    /// Subscribed plan.
    pub plan_id: Uuid,
    /// Whether this is the user's live subscription.
    pub is_active: bool,
    /// When the current plan was subscribed.
    pub subscribed_at: DateTime<Utc>,
}

impl Subscription {
    /// Typed subscription ID.
    #[must_use]
    pub const fn subscription_id(&self) -> SubscriptionId {
        SubscriptionId::from_uuid(self.id)
    }

    /// Typed user ID.
    #[must_use]
    pub const fn user(&self) -> UserId {
        UserId::from_uuid(self.user_id)
    }

    /// Typed plan ID.
    #[must_use]
    pub const fn plan(&self) -> PlanId {
        PlanId::from_uuid(self.plan_id)
    }

    /// Day the current plan was subscribed.
    #[must_use]
    pub fn subscribed_on(&self) -> NaiveDate {
        self.subscribed_at.date_naive()
    }
}

/// A row of the limit ledger.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult, Serialize)]
pub struct FeatureLimit {
    /// Row ID.
    pub id: Uuid,
    /// Owning subscription.
    pub subscription_id: Uuid,
    /// Limited feature.
    pub feature_id: Uuid,
    /// Effective limit (None = unlimited).
    pub limit: Option<i64>,
    /// Stored status code.
    pub status: String,
}

impl FeatureLimit {
    /// Decoded status.
    pub fn status(&self) -> Result<LedgerStatus, ParseValueError> {
        self.status.parse()
    }
}

/// A row of the usage ledger.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult, Serialize)]
pub struct FeatureUsage {
    /// Row ID.
    pub id: Uuid,
    /// Owning subscription.
    pub subscription_id: Uuid,
    /// Metered feature.
    pub feature_id: Uuid,
    /// Quantity used on `date`.
    pub used_quantity: i64,
    /// Day of the usage.
    pub date: NaiveDate,
    /// Stored status code.
    pub status: String,
}

impl FeatureUsage {
    /// Decoded status.
    pub fn status(&self) -> Result<LedgerStatus, ParseValueError> {
        self.status.parse()
    }
}

/// Usage row joined with its feature's aggregator.
#[derive(Debug, Clone, FromQueryResult)]
pub(crate) struct UsageAggregateRow {
    pub feature_id: Uuid,
    pub aggregator: String,
    pub date: NaiveDate,
    pub used_quantity: i64,
}

/// A recorded billing period of a subscription.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult, Serialize)]
pub struct SubscriptionPeriod {
    /// Row ID.
    pub id: Uuid,
    /// Owning subscription.
    pub subscription_id: Uuid,
    /// First day of the period.
    pub starts_on: NaiveDate,
    /// Last day of the period.
    pub ends_on: NaiveDate,
    /// Whether the period is still open.
    pub is_active: bool,
}

/// Period total of one feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureUsageTotal {
    /// Feature ID.
    pub feature_id: FeatureId,
    /// Feature identifier.
    pub identifier: String,
    /// Aggregator used to collapse the days.
    pub aggregator: Aggregator,
    /// Collapsed quantity.
    pub used_quantity: i64,
}

/// Row holding a single user ID column.
#[derive(Debug, Clone, FromQueryResult)]
pub(crate) struct UserIdRow {
    pub user_id: Uuid,
}
