//! Usage recording, usage queries and entitlement checks.

use chrono::NaiveDate;
use sea_orm::{ConnectionTrait, TransactionTrait};
use throttle_core::period::today;
use throttle_core::{CalendarMonthPeriod, Entitlement, Period};
use throttle_shared::types::{SubscriptionId, UserId};
use tracing::{debug, info};

use super::Throttle;
use crate::error::{ThrottleError, ThrottleResult};
use crate::models::{Feature, FeatureLimit, FeatureUsageTotal};

impl Throttle {
    /// Adds `count` to today's usage of a feature.
    ///
    /// A zero count never creates a row.
    pub async fn increment(
        &self,
        subscription: SubscriptionId,
        feature_identifier: &str,
        count: i64,
    ) -> ThrottleResult<()> {
        let feature = self.resolve_feature(&self.db, feature_identifier).await?;
        self.usage
            .increment(&self.db, subscription, feature.feature_id(), count, today())
            .await?;
        Ok(())
    }

    /// Raises the usage of a feature on `date` (default today) to `count`.
    ///
    /// A lower `count` than the stored one is ignored.
    pub async fn refresh_usage(
        &self,
        subscription: SubscriptionId,
        feature_identifier: &str,
        count: i64,
        date: Option<NaiveDate>,
    ) -> ThrottleResult<()> {
        let feature = self.resolve_feature(&self.db, feature_identifier).await?;
        self.usage
            .refresh_usage(
                &self.db,
                subscription,
                feature.feature_id(),
                count,
                date.unwrap_or_else(today),
            )
            .await?;
        Ok(())
    }

    /// Usage of every feature of the subscription's current plan within
    /// `[start, end]`; `end` defaults to today.
    pub async fn get_usage(
        &self,
        subscription: SubscriptionId,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> ThrottleResult<Vec<FeatureUsageTotal>> {
        let record = self
            .subscriptions
            .find_by_id(&self.db, subscription)
            .await?
            .ok_or(ThrottleError::SubscriptionNotFound(subscription))?;

        self.usage
            .aggregate(&self.db, subscription, record.plan(), start, end)
            .await
    }

    /// Usage of the active subscription of `user` within `period`.
    pub async fn usage_of_user<P>(
        &self,
        user: UserId,
        period: &P,
    ) -> ThrottleResult<Vec<FeatureUsageTotal>>
    where
        P: Period + ?Sized,
    {
        let subscription = self
            .subscriptions
            .subscription(&self.db, user)
            .await?
            .ok_or(ThrottleError::NotSubscribed(user))?;

        self.usage
            .aggregate(
                &self.db,
                subscription.subscription_id(),
                subscription.plan(),
                period.start(),
                Some(period.end()),
            )
            .await
    }

    /// Whether `count` more of a feature fits under its limit this calendar
    /// month.
    pub async fn can(
        &self,
        subscription: SubscriptionId,
        feature_identifier: &str,
        count: i64,
    ) -> ThrottleResult<bool> {
        self.can_within(
            subscription,
            feature_identifier,
            count,
            &CalendarMonthPeriod::current(),
        )
        .await
    }

    /// Whether `count` more of a feature fits under its limit, measuring the
    /// usage over `period`.
    ///
    /// A subscription without a limit row for the feature is not entitled.
    pub async fn can_within<P>(
        &self,
        subscription: SubscriptionId,
        feature_identifier: &str,
        count: i64,
        period: &P,
    ) -> ThrottleResult<bool>
    where
        P: Period + ?Sized,
    {
        let entitlement = self
            .entitlement(subscription, feature_identifier, period)
            .await?;
        Ok(entitlement.is_some_and(|entitlement| entitlement.allows(count)))
    }

    /// Limit and usage of a feature over `period`, or `None` if the
    /// subscription holds no limit for it.
    pub async fn entitlement<P>(
        &self,
        subscription: SubscriptionId,
        feature_identifier: &str,
        period: &P,
    ) -> ThrottleResult<Option<Entitlement>>
    where
        P: Period + ?Sized,
    {
        let feature = self.resolve_feature(&self.db, feature_identifier).await?;
        let Some(limit) = self
            .limits
            .limit_of(&self.db, subscription, feature.feature_id())
            .await?
        else {
            return Ok(None);
        };

        let used = self.used_within(&self.db, subscription, &feature, period).await?;
        Ok(Some(Entitlement::new(limit.limit, used)))
    }

    /// Checks and records `count` more of a feature as one step.
    ///
    /// The limit row stays locked until the increment commits, so concurrent
    /// callers cannot overshoot the limit. Returns `false`, recording
    /// nothing, when the increment does not fit this calendar month.
    pub async fn try_increment(
        &self,
        subscription: SubscriptionId,
        feature_identifier: &str,
        count: i64,
    ) -> ThrottleResult<bool> {
        let txn = self.db.begin().await?;

        let feature = self.resolve_feature(&txn, feature_identifier).await?;
        let Some(limit) = self
            .limits
            .lock_limit(&txn, subscription, feature.feature_id())
            .await?
        else {
            debug!(
                subscription_id = %subscription,
                feature = feature_identifier,
                "No limit for feature"
            );
            return Ok(false);
        };

        let period = CalendarMonthPeriod::current();
        let used = self.used_within(&txn, subscription, &feature, &period).await?;
        let entitlement = Entitlement::new(limit.limit, used);
        if !entitlement.allows(count) {
            info!(
                subscription_id = %subscription,
                feature = feature_identifier,
                used,
                requested = count,
                "Increment denied"
            );
            return Ok(false);
        }

        self.usage
            .increment(&txn, subscription, feature.feature_id(), count, period.today())
            .await?;
        txn.commit().await?;

        Ok(true)
    }

    /// Adds `delta` to the active limit of a feature, outside the plan tiers.
    ///
    /// An unlimited limit stays unlimited. Returns `false` if the
    /// subscription holds no limit for the feature.
    pub async fn increment_limit(
        &self,
        subscription: SubscriptionId,
        feature_identifier: &str,
        delta: i64,
    ) -> ThrottleResult<bool> {
        let feature = self.resolve_feature(&self.db, feature_identifier).await?;
        let updated = self
            .limits
            .increment_limit(&self.db, subscription, feature.feature_id(), delta)
            .await?;

        if updated > 0 {
            info!(
                subscription_id = %subscription,
                feature = feature_identifier,
                delta,
                "Limit incremented"
            );
        }

        Ok(updated > 0)
    }

    /// Active limit row of a feature.
    pub async fn limit_of(
        &self,
        subscription: SubscriptionId,
        feature_identifier: &str,
    ) -> ThrottleResult<Option<FeatureLimit>> {
        let feature = self.resolve_feature(&self.db, feature_identifier).await?;
        Ok(self
            .limits
            .limit_of(&self.db, subscription, feature.feature_id())
            .await?)
    }

    async fn used_within<C, P>(
        &self,
        conn: &C,
        subscription: SubscriptionId,
        feature: &Feature,
        period: &P,
    ) -> ThrottleResult<i64>
    where
        C: ConnectionTrait,
        P: Period + ?Sized,
    {
        Ok(self
            .usage
            .feature_total(
                conn,
                subscription,
                feature.feature_id(),
                feature.aggregator()?,
                period.start(),
                period.end(),
            )
            .await?)
    }
}
