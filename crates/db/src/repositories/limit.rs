//! Limit ledger.
//!
//! One active row per (subscription, feature) holds the effective limit.
//! Rows are never deleted: a plan change supersedes them with a status code
//! and seeds fresh rows next to them.

use std::collections::BTreeMap;
use std::sync::Arc;

use sea_orm::sea_query::{Expr, LockType, Order, Query, SelectStatement};
use sea_orm::{ConnectionTrait, DbErr, FromQueryResult};
use throttle_core::{LedgerStatus, SupersedeReason, effective_limits};
use throttle_shared::TableNames;
use throttle_shared::types::{FeatureId, PlanId, SubscriptionId};
use uuid::Uuid;

use super::{PlanCatalog, execute};
use crate::models::FeatureLimit;
use crate::schema::{SubscriptionFeatureLimit, table};

/// Repository for the limit ledger.
#[derive(Debug, Clone)]
pub struct LimitLedger {
    tables: Arc<TableNames>,
    catalog: PlanCatalog,
}

impl LimitLedger {
    const COLUMNS: [SubscriptionFeatureLimit; 5] = [
        SubscriptionFeatureLimit::Id,
        SubscriptionFeatureLimit::SubscriptionId,
        SubscriptionFeatureLimit::FeatureId,
        SubscriptionFeatureLimit::Limit,
        SubscriptionFeatureLimit::Status,
    ];

    /// Creates a ledger over the configured tables.
    #[must_use]
    pub fn new(tables: Arc<TableNames>) -> Self {
        let catalog = PlanCatalog::new(Arc::clone(&tables));
        Self { tables, catalog }
    }

    /// Effective limit of every feature of `plan`.
    pub async fn compute_effective_limits<C>(
        &self,
        conn: &C,
        plan: PlanId,
    ) -> Result<BTreeMap<FeatureId, Option<i64>>, DbErr>
    where
        C: ConnectionTrait,
    {
        let tiers = self.catalog.features_of_plan(conn, plan).await?;
        Ok(effective_limits(&tiers))
    }

    /// Inserts one active row per feature of `plan`.
    ///
    /// Returns the number of rows inserted.
    pub async fn seed_limits<C>(
        &self,
        conn: &C,
        subscription: SubscriptionId,
        plan: PlanId,
    ) -> Result<u64, DbErr>
    where
        C: ConnectionTrait,
    {
        let limits = self.compute_effective_limits(conn, plan).await?;
        let mut inserted = 0;
        for (feature, limit) in limits {
            inserted += self.insert_limit(conn, subscription, feature, limit).await?;
        }
        Ok(inserted)
    }

    /// Recomputes the limits of `plan` into the active rows of `subscription`.
    ///
    /// Rows are updated in place; features without an active row get one.
    pub async fn reseed_limits<C>(
        &self,
        conn: &C,
        subscription: SubscriptionId,
        plan: PlanId,
    ) -> Result<(), DbErr>
    where
        C: ConnectionTrait,
    {
        let limits = self.compute_effective_limits(conn, plan).await?;
        for (feature, limit) in limits {
            let update = Query::update()
                .table(table(&self.tables.subscription_feature_limit))
                .value(SubscriptionFeatureLimit::Limit, limit)
                .and_where(
                    Expr::col(SubscriptionFeatureLimit::SubscriptionId)
                        .eq(subscription.into_inner()),
                )
                .and_where(Expr::col(SubscriptionFeatureLimit::FeatureId).eq(feature.into_inner()))
                .and_where(
                    Expr::col(SubscriptionFeatureLimit::Status).eq(LedgerStatus::Active.as_str()),
                )
                .to_owned();

            if execute(conn, &update).await? == 0 {
                self.insert_limit(conn, subscription, feature, limit).await?;
            }
        }
        Ok(())
    }

    /// Seeds the limit of one newly attached feature.
    ///
    /// Does nothing if the subscription already holds an active row for it or
    /// the feature is not part of `plan`. Returns whether a row was inserted.
    pub async fn add_limit_for_feature<C>(
        &self,
        conn: &C,
        subscription: SubscriptionId,
        plan: PlanId,
        feature: FeatureId,
    ) -> Result<bool, DbErr>
    where
        C: ConnectionTrait,
    {
        let limits = self.compute_effective_limits(conn, plan).await?;
        let Some(&limit) = limits.get(&feature) else {
            return Ok(false);
        };

        if self.limit_of(conn, subscription, feature).await?.is_some() {
            return Ok(false);
        }

        Ok(self.insert_limit(conn, subscription, feature, limit).await? > 0)
    }

    /// Marks every active row of `subscription` inactive.
    pub async fn supersede_limits<C>(
        &self,
        conn: &C,
        subscription: SubscriptionId,
        reason: SupersedeReason,
    ) -> Result<u64, DbErr>
    where
        C: ConnectionTrait,
    {
        let update = Query::update()
            .table(table(&self.tables.subscription_feature_limit))
            .value(SubscriptionFeatureLimit::Status, reason.status().as_str())
            .and_where(
                Expr::col(SubscriptionFeatureLimit::SubscriptionId).eq(subscription.into_inner()),
            )
            .and_where(
                Expr::col(SubscriptionFeatureLimit::Status).eq(LedgerStatus::Active.as_str()),
            )
            .to_owned();
        execute(conn, &update).await
    }

    /// Marks the active row of one feature inactive.
    pub async fn supersede_feature_limit<C>(
        &self,
        conn: &C,
        subscription: SubscriptionId,
        feature: FeatureId,
        reason: SupersedeReason,
    ) -> Result<u64, DbErr>
    where
        C: ConnectionTrait,
    {
        let update = Query::update()
            .table(table(&self.tables.subscription_feature_limit))
            .value(SubscriptionFeatureLimit::Status, reason.status().as_str())
            .and_where(
                Expr::col(SubscriptionFeatureLimit::SubscriptionId).eq(subscription.into_inner()),
            )
            .and_where(Expr::col(SubscriptionFeatureLimit::FeatureId).eq(feature.into_inner()))
            .and_where(
                Expr::col(SubscriptionFeatureLimit::Status).eq(LedgerStatus::Active.as_str()),
            )
            .to_owned();
        execute(conn, &update).await
    }

    /// Adds `delta` to the active limit of a feature.
    ///
    /// An unlimited (NULL) limit stays unlimited. Returns the number of rows
    /// changed, zero when the subscription holds no active row for it.
    pub async fn increment_limit<C>(
        &self,
        conn: &C,
        subscription: SubscriptionId,
        feature: FeatureId,
        delta: i64,
    ) -> Result<u64, DbErr>
    where
        C: ConnectionTrait,
    {
        let update = Query::update()
            .table(table(&self.tables.subscription_feature_limit))
            .value(
                SubscriptionFeatureLimit::Limit,
                Expr::col(SubscriptionFeatureLimit::Limit).add(delta),
            )
            .and_where(
                Expr::col(SubscriptionFeatureLimit::SubscriptionId).eq(subscription.into_inner()),
            )
            .and_where(Expr::col(SubscriptionFeatureLimit::FeatureId).eq(feature.into_inner()))
            .and_where(
                Expr::col(SubscriptionFeatureLimit::Status).eq(LedgerStatus::Active.as_str()),
            )
            .to_owned();
        execute(conn, &update).await
    }

    /// Active row of one feature.
    pub async fn limit_of<C>(
        &self,
        conn: &C,
        subscription: SubscriptionId,
        feature: FeatureId,
    ) -> Result<Option<FeatureLimit>, DbErr>
    where
        C: ConnectionTrait,
    {
        let select = self.select_active(subscription, Some(feature));
        FeatureLimit::find_by_statement(conn.get_database_backend().build(&select))
            .one(conn)
            .await
    }

    /// Active row of one feature, locked until the surrounding transaction
    /// ends.
    ///
    /// Backends without row locks (SQLite) read it unlocked.
    pub async fn lock_limit<C>(
        &self,
        conn: &C,
        subscription: SubscriptionId,
        feature: FeatureId,
    ) -> Result<Option<FeatureLimit>, DbErr>
    where
        C: ConnectionTrait,
    {
        let select = self
            .select_active(subscription, Some(feature))
            .lock(LockType::Update)
            .to_owned();
        FeatureLimit::find_by_statement(conn.get_database_backend().build(&select))
            .one(conn)
            .await
    }

    /// Every active row of `subscription`.
    pub async fn active_limits<C>(
        &self,
        conn: &C,
        subscription: SubscriptionId,
    ) -> Result<Vec<FeatureLimit>, DbErr>
    where
        C: ConnectionTrait,
    {
        let select = self.select_active(subscription, None);
        FeatureLimit::find_by_statement(conn.get_database_backend().build(&select))
            .all(conn)
            .await
    }

    /// Every row of `subscription`, superseded ones included.
    pub async fn history<C>(
        &self,
        conn: &C,
        subscription: SubscriptionId,
    ) -> Result<Vec<FeatureLimit>, DbErr>
    where
        C: ConnectionTrait,
    {
        let select = Query::select()
            .columns(Self::COLUMNS)
            .from(table(&self.tables.subscription_feature_limit))
            .and_where(
                Expr::col(SubscriptionFeatureLimit::SubscriptionId).eq(subscription.into_inner()),
            )
            .order_by(SubscriptionFeatureLimit::Id, Order::Asc)
            .to_owned();
        FeatureLimit::find_by_statement(conn.get_database_backend().build(&select))
            .all(conn)
            .await
    }

    fn select_active(
        &self,
        subscription: SubscriptionId,
        feature: Option<FeatureId>,
    ) -> SelectStatement {
        let mut select = Query::select()
            .columns(Self::COLUMNS)
            .from(table(&self.tables.subscription_feature_limit))
            .and_where(
                Expr::col(SubscriptionFeatureLimit::SubscriptionId).eq(subscription.into_inner()),
            )
            .and_where(
                Expr::col(SubscriptionFeatureLimit::Status).eq(LedgerStatus::Active.as_str()),
            )
            .order_by(SubscriptionFeatureLimit::FeatureId, Order::Asc)
            .to_owned();

        if let Some(feature) = feature {
            select.and_where(Expr::col(SubscriptionFeatureLimit::FeatureId).eq(feature.into_inner()));
        }

        select
    }

    async fn insert_limit<C>(
        &self,
        conn: &C,
        subscription: SubscriptionId,
        feature: FeatureId,
        limit: Option<i64>,
    ) -> Result<u64, DbErr>
    where
        C: ConnectionTrait,
    {
        let insert = Query::insert()
            .into_table(table(&self.tables.subscription_feature_limit))
            .columns(Self::COLUMNS)
            .values_panic([
                Uuid::now_v7().into(),
                subscription.into_inner().into(),
                feature.into_inner().into(),
                limit.into(),
                LedgerStatus::Active.as_str().into(),
            ])
            .to_owned();
        execute(conn, &insert).await
    }
}
