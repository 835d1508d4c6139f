//! The `Throttle` facade.
//!
//! Composes the catalog, the subscription repository, both ledgers and the
//! period store into the operations exposed to callers. Multi-statement
//! operations run inside one transaction; a transaction dropped before
//! `commit()` is rolled back, so an error never leaves partial state behind.

mod lifecycle;
mod metering;

use std::sync::Arc;

use sea_orm::{ConnectionTrait, DatabaseConnection};
use throttle_shared::TableNames;
use throttle_shared::types::UserId;

use crate::error::{ThrottleError, ThrottleResult};
use crate::models::{Feature, Plan, Subscription};
use crate::repositories::{
    LimitLedger, PeriodRepository, PlanCatalog, SubscriptionRepository, UsageLedger,
};

/// Entry point to the subscription, limit and usage operations.
#[derive(Debug, Clone)]
pub struct Throttle {
    db: DatabaseConnection,
    tables: Arc<TableNames>,
    catalog: PlanCatalog,
    subscriptions: SubscriptionRepository,
    limits: LimitLedger,
    usage: UsageLedger,
    periods: PeriodRepository,
}

impl Throttle {
    /// Creates the facade over `db` using the configured table names.
    #[must_use]
    pub fn new(db: DatabaseConnection, tables: Arc<TableNames>) -> Self {
        Self {
            catalog: PlanCatalog::new(Arc::clone(&tables)),
            subscriptions: SubscriptionRepository::new(Arc::clone(&tables)),
            limits: LimitLedger::new(Arc::clone(&tables)),
            usage: UsageLedger::new(Arc::clone(&tables)),
            periods: PeriodRepository::new(Arc::clone(&tables)),
            tables,
            db,
        }
    }

    /// Underlying connection.
    #[must_use]
    pub const fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Configured table names.
    #[must_use]
    pub fn tables(&self) -> &TableNames {
        &self.tables
    }

    /// Plan/feature catalog.
    #[must_use]
    pub const fn catalog(&self) -> &PlanCatalog {
        &self.catalog
    }

    /// Subscription repository.
    #[must_use]
    pub const fn subscriptions(&self) -> &SubscriptionRepository {
        &self.subscriptions
    }

    /// Limit ledger.
    #[must_use]
    pub const fn limits(&self) -> &LimitLedger {
        &self.limits
    }

    /// Usage ledger.
    #[must_use]
    pub const fn usage(&self) -> &UsageLedger {
        &self.usage
    }

    /// Period store.
    #[must_use]
    pub const fn periods(&self) -> &PeriodRepository {
        &self.periods
    }

    /// Active subscription of `user`.
    pub async fn subscription(&self, user: UserId) -> ThrottleResult<Option<Subscription>> {
        Ok(self.subscriptions.subscription(&self.db, user).await?)
    }

    /// Every active subscription.
    pub async fn all_subscriptions(&self) -> ThrottleResult<Vec<Subscription>> {
        Ok(self.subscriptions.all(&self.db).await?)
    }

    /// Users holding an active subscription.
    pub async fn all_user_ids(&self) -> ThrottleResult<Vec<UserId>> {
        Ok(self.subscriptions.all_user_ids(&self.db).await?)
    }

    /// Active subscriptions on the plan named `plan_identifier`.
    pub async fn subscribers_of_plan(&self, plan_identifier: &str) -> ThrottleResult<Vec<Subscription>> {
        let plan = self.resolve_plan(&self.db, plan_identifier).await?;
        Ok(self
            .subscriptions
            .subscribers_of_plan(&self.db, plan.plan_id())
            .await?)
    }

    async fn resolve_plan<C>(&self, conn: &C, identifier: &str) -> ThrottleResult<Plan>
    where
        C: ConnectionTrait,
    {
        self.catalog
            .plan_by_identifier(conn, identifier)
            .await?
            .ok_or_else(|| ThrottleError::PlanNotFound(identifier.to_string()))
    }

    async fn resolve_feature<C>(&self, conn: &C, identifier: &str) -> ThrottleResult<Feature>
    where
        C: ConnectionTrait,
    {
        self.catalog
            .feature_by_identifier(conn, identifier)
            .await?
            .ok_or_else(|| ThrottleError::FeatureNotFound(identifier.to_string()))
    }
}
