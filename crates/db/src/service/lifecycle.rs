//! Subscription lifecycle: subscribe, unsubscribe, switch plan, and the
//! propagation of plan updates to existing subscribers.

use chrono::Utc;
use sea_orm::{DatabaseTransaction, TransactionTrait};
use throttle_core::SupersedeReason;
use throttle_core::period::period_end;
use throttle_shared::types::{FeatureId, PlanId, SubscriptionId, UserId};
use tracing::{debug, info};

use super::Throttle;
use crate::error::{ThrottleError, ThrottleResult};
use crate::models::{Feature, Subscription};

impl Throttle {
    /// Subscribes `user` to the plan named `plan_identifier`.
    ///
    /// Any active subscription of the user is deactivated and its period
    /// closed. The new subscription gets its limits, a zero usage row per
    /// feature and an open period starting today.
    pub async fn subscribe(
        &self,
        user: UserId,
        plan_identifier: &str,
    ) -> ThrottleResult<Subscription> {
        let txn = self.db.begin().await?;

        let replaced = self.subscriptions.deactivate_user(&txn, user).await?;
        self.periods.close_periods_of_user(&txn, user).await?;

        let plan = self.resolve_plan(&txn, plan_identifier).await?;
        let now = Utc::now();
        let subscription = self
            .subscriptions
            .insert(&txn, user, plan.plan_id(), now)
            .await?;
        let subscription_id = subscription.subscription_id();

        self.limits
            .seed_limits(&txn, subscription_id, plan.plan_id())
            .await?;

        let today = now.date_naive();
        let features = self.catalog.plan_features(&txn, plan.plan_id()).await?;
        self.usage
            .seed_base(
                &txn,
                subscription_id,
                features.iter().map(Feature::feature_id),
                today,
            )
            .await?;
        self.periods
            .store(&txn, subscription_id, today, period_end(today))
            .await?;

        txn.commit().await?;

        info!(
            user_id = %user,
            subscription_id = %subscription_id,
            plan = %plan.identifier,
            replaced,
            "User subscribed"
        );

        Ok(subscription)
    }

    /// Deactivates the active subscription of `user` and closes its period.
    ///
    /// Returns `false` if the user had no active subscription.
    pub async fn unsubscribe(&self, user: UserId) -> ThrottleResult<bool> {
        let txn = self.db.begin().await?;

        let deactivated = self.subscriptions.deactivate_user(&txn, user).await?;
        self.periods.close_periods_of_user(&txn, user).await?;

        txn.commit().await?;

        if deactivated > 0 {
            info!(user_id = %user, "User unsubscribed");
        } else {
            debug!(user_id = %user, "Unsubscribe without active subscription");
        }

        Ok(deactivated > 0)
    }

    /// Moves `subscription` from `old_plan` to the plan named
    /// `plan_identifier`.
    ///
    /// Switching to the current plan changes nothing and returns `false`.
    /// A deactivated or unknown subscription yields `SubscriptionNotFound`.
    /// Otherwise the active limits are superseded as a plan switch and
    /// reseeded from the new plan, and the subscription date and period
    /// restart today. Usage rows are left untouched.
    pub async fn switch_plan(
        &self,
        subscription: SubscriptionId,
        old_plan: PlanId,
        plan_identifier: &str,
    ) -> ThrottleResult<bool> {
        let txn = self.db.begin().await?;

        let plan = self.resolve_plan(&txn, plan_identifier).await?;
        if plan.plan_id() == old_plan {
            debug!(
                subscription_id = %subscription,
                plan = %plan.identifier,
                "Switch to the current plan ignored"
            );
            return Ok(false);
        }

        let now = Utc::now();
        let updated = self
            .subscriptions
            .set_plan(&txn, subscription, plan.plan_id(), now)
            .await?;
        if updated == 0 {
            return Err(ThrottleError::SubscriptionNotFound(subscription));
        }

        let superseded = self
            .limits
            .supersede_limits(&txn, subscription, SupersedeReason::PlanSwitch)
            .await?;
        self.limits
            .seed_limits(&txn, subscription, plan.plan_id())
            .await?;

        let today = now.date_naive();
        self.periods.close_periods(&txn, subscription).await?;
        self.periods
            .store(&txn, subscription, today, period_end(today))
            .await?;

        txn.commit().await?;

        info!(
            subscription_id = %subscription,
            plan = %plan.identifier,
            superseded,
            "Subscription switched plan"
        );

        Ok(true)
    }

    /// Seeds the limit of a feature newly attached to a plan on every active
    /// subscriber of that plan.
    ///
    /// Returns the number of subscriptions that received a limit.
    pub async fn add_feature_to_subscribers(
        &self,
        plan_identifier: &str,
        feature_identifier: &str,
    ) -> ThrottleResult<u64> {
        let txn = self.db.begin().await?;
        let (plan, feature, subscribers) = self
            .plan_update_targets(&txn, plan_identifier, feature_identifier)
            .await?;

        let today = Utc::now().date_naive();
        let mut seeded = 0;
        for subscriber in &subscribers {
            let subscription = subscriber.subscription_id();
            if self
                .limits
                .add_limit_for_feature(&txn, subscription, plan, feature)
                .await?
            {
                self.usage
                    .seed_base(&txn, subscription, [feature], today)
                    .await?;
                seeded += 1;
            }
        }

        txn.commit().await?;

        info!(
            plan = plan_identifier,
            feature = feature_identifier,
            seeded,
            "Feature added to subscribers"
        );

        Ok(seeded)
    }

    /// Supersedes the limit and usage rows of a feature removed from a plan
    /// on every active subscriber of that plan.
    ///
    /// Returns the number of subscriptions that held an active limit for it.
    pub async fn remove_feature_from_subscribers(
        &self,
        plan_identifier: &str,
        feature_identifier: &str,
    ) -> ThrottleResult<u64> {
        let txn = self.db.begin().await?;
        let (_, feature, subscribers) = self
            .plan_update_targets(&txn, plan_identifier, feature_identifier)
            .await?;

        let mut superseded = 0;
        for subscriber in &subscribers {
            let subscription = subscriber.subscription_id();
            superseded += self
                .limits
                .supersede_feature_limit(&txn, subscription, feature, SupersedeReason::PlanUpdate)
                .await?;
            self.usage
                .supersede_usage(&txn, subscription, feature, SupersedeReason::PlanUpdate)
                .await?;
        }

        txn.commit().await?;

        info!(
            plan = plan_identifier,
            feature = feature_identifier,
            superseded,
            "Feature removed from subscribers"
        );

        Ok(superseded)
    }

    /// Recomputes the limits of every active subscriber of a plan from its
    /// current tiers.
    ///
    /// Returns the number of subscriptions refreshed.
    pub async fn refresh_plan_limits(&self, plan_identifier: &str) -> ThrottleResult<usize> {
        let txn = self.db.begin().await?;
        let plan = self.resolve_plan(&txn, plan_identifier).await?;
        let subscribers = self
            .subscriptions
            .subscribers_of_plan(&txn, plan.plan_id())
            .await?;

        for subscriber in &subscribers {
            self.limits
                .reseed_limits(&txn, subscriber.subscription_id(), plan.plan_id())
                .await?;
        }

        txn.commit().await?;

        info!(
            plan = plan_identifier,
            subscribers = subscribers.len(),
            "Plan limits refreshed"
        );

        Ok(subscribers.len())
    }

    async fn plan_update_targets(
        &self,
        txn: &DatabaseTransaction,
        plan_identifier: &str,
        feature_identifier: &str,
    ) -> ThrottleResult<(PlanId, FeatureId, Vec<Subscription>)> {
        let plan = self.resolve_plan(txn, plan_identifier).await?;
        let feature = self.resolve_feature(txn, feature_identifier).await?;
        let subscribers = self
            .subscriptions
            .subscribers_of_plan(txn, plan.plan_id())
            .await?;

        Ok((plan.plan_id(), feature.feature_id(), subscribers))
    }
}
